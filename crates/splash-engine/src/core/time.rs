/// Converts host frame timestamps (milliseconds) into simulation steps (seconds).
///
/// Large gaps (a throttled background tab, a debugger pause) are capped so a
/// single frame never integrates more than `max_dt`.
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// Step used for the first frame after start/resume, when no previous timestamp exists.
    nominal_dt: f32,
    /// Upper bound on a single step.
    max_dt: f32,
    last_ms: Option<f64>,
}

impl FrameClock {
    pub const DEFAULT_NOMINAL_DT: f32 = 1.0 / 60.0;
    pub const DEFAULT_MAX_DT: f32 = 0.1;

    pub fn new(nominal_dt: f32, max_dt: f32) -> Self {
        Self {
            nominal_dt,
            max_dt: max_dt.max(nominal_dt),
            last_ms: None,
        }
    }

    /// Advance to `now_ms`. Returns the step in seconds.
    /// Timestamps that go backwards yield a zero step.
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) => (((now_ms - last) / 1000.0) as f32).clamp(0.0, self.max_dt),
            None => self.nominal_dt,
        };
        if self.last_ms.map_or(true, |last| now_ms >= last) {
            self.last_ms = Some(now_ms);
        }
        dt
    }

    /// Forget the previous timestamp; the next tick uses the nominal step.
    pub fn reset(&mut self) {
        self.last_ms = None;
    }

    pub fn max_dt(&self) -> f32 {
        self.max_dt
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NOMINAL_DT, Self::DEFAULT_MAX_DT)
    }
}
