use thiserror::Error;

/// Errors surfaced by the splash engine and its hosts.
#[derive(Debug, Error)]
pub enum SplashError {
    /// The drawing surface cannot provide a writable pixel buffer. Fatal at construction.
    #[error("drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// Handing a finished frame to the surface failed. The frame is dropped.
    #[error("present failed: {0}")]
    Present(String),

    /// The host supplied a timestamp that is not a finite number.
    #[error("invalid frame timestamp: {0}")]
    InvalidTimestamp(f64),

    /// The host refused to schedule another frame callback.
    #[error("frame scheduling failed: {0}")]
    Schedule(String),

    /// A JSON configuration override could not be parsed.
    #[error("invalid configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl SplashError {
    /// Fatal errors stop the animation loop; everything else skips one frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SplashError::SurfaceUnavailable(_) | SplashError::Schedule(_))
    }
}

pub type Result<T> = std::result::Result<T, SplashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(SplashError::SurfaceUnavailable("no 2d context".into()).is_fatal());
        assert!(SplashError::Schedule("closed".into()).is_fatal());
        assert!(!SplashError::Present("lost".into()).is_fatal());
        assert!(!SplashError::InvalidTimestamp(f64::NAN).is_fatal());
    }

    #[test]
    fn parse_errors_convert() {
        let err: SplashError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, SplashError::ConfigParse(_)));
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
