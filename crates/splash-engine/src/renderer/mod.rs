pub mod blend;
pub mod field;
pub mod post;
pub mod raster;
pub mod surface;

// Re-export key types for convenient access
pub use field::{FieldParams, FieldRenderer, RenderConfig, RenderStats};
pub use raster::{PixelSpan, RasterBuffer, Rgba8};
pub use surface::{DrawSurface, MemorySurface, SurfaceCaps};
