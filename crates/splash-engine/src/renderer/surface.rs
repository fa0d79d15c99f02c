//! Drawing-surface abstraction.
//!
//! The engine renders into a `RasterBuffer`; a `DrawSurface` is whatever
//! displays it (a browser canvas, an offscreen buffer in tests).

use crate::api::error::{Result, SplashError};
use crate::systems::dirty::RedrawPlan;

use super::raster::RasterBuffer;

/// What a surface can do. Decides between full and degraded rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCaps {
    /// The surface accepts raw pixel buffers. Required.
    pub writable_pixels: bool,
    /// Sub-rectangles can be presented without touching the rest.
    pub partial_present: bool,
    /// Soft compositing is affordable (blur, glow, full color blending).
    pub compositing: bool,
}

impl SurfaceCaps {
    pub const FULL: SurfaceCaps = SurfaceCaps {
        writable_pixels: true,
        partial_present: true,
        compositing: true,
    };

    /// Pixels only: no partial present, no compositing.
    pub const BASIC: SurfaceCaps = SurfaceCaps {
        writable_pixels: true,
        partial_present: false,
        compositing: false,
    };

    pub const NONE: SurfaceCaps = SurfaceCaps {
        writable_pixels: false,
        partial_present: false,
        compositing: false,
    };

    pub fn is_degraded(&self) -> bool {
        !self.compositing
    }
}

/// A target the finished raster is presented to.
pub trait DrawSurface {
    /// Current size in pixels.
    fn size(&self) -> (u32, u32);

    fn capabilities(&self) -> SurfaceCaps;

    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Copy the parts of `raster` named by `plan` onto the surface.
    fn present(&mut self, raster: &RasterBuffer, plan: &RedrawPlan) -> Result<()>;
}

/// Offscreen surface holding a copy of every presented pixel.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    width: u32,
    height: u32,
    caps: SurfaceCaps,
    frame: Vec<u8>,
    presents: u64,
    fail_next: Option<String>,
}

impl MemorySurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_caps(width, height, SurfaceCaps::FULL)
    }

    pub fn with_caps(width: u32, height: u32, caps: SurfaceCaps) -> Self {
        Self {
            width,
            height,
            caps,
            frame: vec![0; width as usize * height as usize * 4],
            presents: 0,
            fail_next: None,
        }
    }

    /// Presented RGBA bytes.
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    pub fn presents(&self) -> u64 {
        self.presents
    }

    /// Make the next `present` fail with `reason`.
    pub fn fail_next_present(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }

    fn copy_rows(&mut self, raster: &RasterBuffer, x0: u32, y0: u32, x1: u32, y1: u32) {
        let src = raster.as_bytes();
        let stride = self.width as usize * 4;
        for y in y0..y1 {
            let start = y as usize * stride + x0 as usize * 4;
            let end = y as usize * stride + x1 as usize * 4;
            self.frame[start..end].copy_from_slice(&src[start..end]);
        }
    }
}

impl DrawSurface for MemorySurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn capabilities(&self) -> SurfaceCaps {
        self.caps
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.width = width;
        self.height = height;
        self.frame = vec![0; width as usize * height as usize * 4];
        Ok(())
    }

    fn present(&mut self, raster: &RasterBuffer, plan: &RedrawPlan) -> Result<()> {
        if let Some(reason) = self.fail_next.take() {
            return Err(SplashError::Present(reason));
        }
        if (raster.width(), raster.height()) != (self.width, self.height) {
            return Err(SplashError::Present(format!(
                "raster is {}x{}, surface is {}x{}",
                raster.width(),
                raster.height(),
                self.width,
                self.height
            )));
        }
        match plan {
            RedrawPlan::Idle => return Ok(()),
            RedrawPlan::Regions(rects) if self.caps.partial_present => {
                for rect in rects {
                    if let Some(span) = raster.pixel_span(rect) {
                        self.copy_rows(raster, span.x0, span.y0, span.x1, span.y1);
                    }
                }
            }
            _ => self.frame.copy_from_slice(raster.as_bytes()),
        }
        self.presents += 1;
        Ok(())
    }
}
