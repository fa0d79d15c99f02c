use serde::Serialize;

use crate::renderer::field::RenderStats;
use crate::systems::dirty::RedrawPlan;
use crate::systems::quality::{QualityChange, QualityLevel};

/// Read-only counters for host UIs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Telemetry {
    pub active_particles: usize,
    pub capacity: usize,
    pub fps: f32,
    pub quality: QualityLevel,
    /// Frames processed since construction or the last reset.
    pub frame: u64,
}

/// What one call to `SplashEngine::frame` did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Clamped step in seconds.
    pub dt: f32,
    pub emitted: usize,
    pub released: usize,
    pub plan: RedrawPlan,
    pub render: RenderStats,
    pub quality_change: Option<QualityChange>,
    /// False when rendering was throttled this frame; dirty areas carry over.
    pub rendered: bool,
}

impl FrameReport {
    /// True when the raster changed and should be presented.
    pub fn needs_present(&self) -> bool {
        self.rendered && !self.plan.is_idle()
    }
}
