pub mod api;
pub mod core;
pub mod components;
pub mod systems;
pub mod renderer;
pub mod input;

// Re-export key types at crate root for convenience
pub use api::config::{merge, validate, ClampedField, PartialConfig, SplashConfig, Validated};
pub use api::engine::SplashEngine;
pub use api::error::{Result, SplashError};
pub use api::types::{FrameReport, Telemetry};
pub use components::emitter::{ColorMode, EmitterConfig};
pub use components::particle::{Particle, ParticleSnapshot, ParticleSpawn};
pub use core::easing::Easing;
pub use core::lifecycle::{AnimationLoop, FrameScheduler, FrameTicket, LoopState, Visibility};
pub use core::math::{Hsla, Rect};
pub use core::physics::{MotionConfig, MotionIntegrator};
pub use core::time::FrameClock;
pub use input::queue::{InputEvent, InputQueue};
pub use input::tracker::{PointerSample, PointerState, TrackerConfig, VelocityTracker};
pub use renderer::{DrawSurface, FieldRenderer, MemorySurface, RasterBuffer, RenderConfig, Rgba8, SurfaceCaps};
pub use systems::dirty::{DirtyRegionConfig, DirtyRegionTracker, RedrawPlan};
pub use systems::perf::{FrameStats, PerformanceMonitor};
pub use systems::pool::{ParticleHandle, ParticlePool};
pub use systems::quality::{QualityChange, QualityConfig, QualityController, QualityLevel, QualitySettings};
pub use systems::spatial::SpatialGrid;
