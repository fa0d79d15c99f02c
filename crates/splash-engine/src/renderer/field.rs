//! Metaball field renderer.
//!
//! Every particle adds `r² / (d² + 1) · alpha` to a scalar field. The field
//! is sampled on a lattice (one node every `stride` pixels), using the
//! spatial grid to visit only particles that can reach each node. Pixels
//! interpolate the lattice bilinearly; samples at or above the threshold are
//! inside a blob, samples just below it form an optional glow.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::error::{Result, SplashError};
use crate::components::particle::ParticleSnapshot;
use crate::systems::dirty::RedrawPlan;
use crate::systems::quality::QualitySettings;
use crate::systems::spatial::SpatialGrid;

use super::blend::{coverage, BlendQuality, SampleAccumulator};
use super::post::BoxBlur;
use super::raster::{PixelSpan, RasterBuffer, Rgba8};
use super::surface::SurfaceCaps;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Hard cap on any particle's influence distance, px.
    pub max_influence: f32,
    /// Multiplies the tier threshold.
    pub threshold_scale: f32,
    /// Width of the edge ramp as a fraction of the threshold.
    pub edge_softness: f32,
    pub glow: bool,
    /// The glow band starts at `threshold * glow_floor`.
    pub glow_floor: f32,
    pub blur: bool,
    /// Spatial grid cell size, px.
    pub cell_size: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_influence: 64.0,
            threshold_scale: 1.0,
            edge_softness: 0.6,
            glow: true,
            glow_floor: 0.6,
            blur: true,
            cell_size: 32.0,
        }
    }
}

/// Effective renderer parameters after tier and surface capabilities are applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldParams {
    pub threshold: f32,
    pub stride: u32,
    pub blur: u32,
    pub max_influence: f32,
    pub edge_softness: f32,
    pub glow_floor: Option<f32>,
    pub blend: BlendQuality,
}

impl FieldParams {
    pub fn resolve(config: &RenderConfig, tier: &QualitySettings, caps: SurfaceCaps) -> Self {
        let degraded = caps.is_degraded();
        Self {
            threshold: (tier.threshold * config.threshold_scale).max(1e-3),
            stride: tier.stride.max(1),
            blur: if config.blur && !degraded { tier.blur } else { 0 },
            max_influence: config.max_influence.max(1.0),
            edge_softness: config.edge_softness,
            glow_floor: (config.glow && !degraded).then_some(config.glow_floor.clamp(0.05, 0.95)),
            blend: if degraded {
                BlendQuality::Basic
            } else {
                BlendQuality::Full
            },
        }
    }

    /// Pixels around a changed area whose appearance can depend on it.
    pub fn padding(&self) -> f32 {
        (self.stride + self.blur + 1) as f32
    }
}

impl Default for FieldParams {
    fn default() -> Self {
        Self::resolve(
            &RenderConfig::default(),
            &crate::systems::quality::QualityLevel::default().settings(),
            SurfaceCaps::FULL,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Lattice nodes evaluated.
    pub samples: u64,
    /// Pixels written.
    pub pixels: u64,
    pub spans: u32,
    pub full: bool,
}

pub struct FieldRenderer {
    params: FieldParams,
    width: u32,
    height: u32,
    cols: u32,
    rows: u32,
    field: Vec<f32>,
    color: Vec<[f32; 4]>,
    candidates: Vec<u32>,
    blur: BoxBlur,
}

impl FieldRenderer {
    /// Fails when the surface cannot take pixel buffers.
    pub fn new(caps: SurfaceCaps, width: u32, height: u32, params: FieldParams) -> Result<Self> {
        if !caps.writable_pixels {
            return Err(SplashError::SurfaceUnavailable(
                "surface does not accept pixel buffers".into(),
            ));
        }
        let mut renderer = Self {
            params,
            width,
            height,
            cols: 0,
            rows: 0,
            field: Vec::new(),
            color: Vec::new(),
            candidates: Vec::with_capacity(64),
            blur: BoxBlur::new(),
        };
        renderer.allocate();
        Ok(renderer)
    }

    fn allocate(&mut self) {
        let s = self.params.stride.max(1);
        // One extra node past the last pixel so interpolation never runs off the lattice.
        self.cols = self.width.saturating_sub(1) / s + 2;
        self.rows = self.height.saturating_sub(1) / s + 2;
        let n = (self.cols * self.rows) as usize;
        self.field.clear();
        self.field.resize(n, 0.0);
        self.color.clear();
        self.color.resize(n, [0.0; 4]);
    }

    pub fn params(&self) -> &FieldParams {
        &self.params
    }

    pub fn set_params(&mut self, params: FieldParams) {
        let restride = params.stride != self.params.stride;
        self.params = params;
        if restride {
            self.allocate();
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.allocate();
    }

    /// Draw the areas named by `plan` into `raster`. `grid` must index `snapshots`.
    pub fn render(
        &mut self,
        snapshots: &[ParticleSnapshot],
        grid: &SpatialGrid,
        plan: &RedrawPlan,
        raster: &mut RasterBuffer,
    ) -> RenderStats {
        if (raster.width(), raster.height()) != (self.width, self.height) {
            self.resize(raster.width(), raster.height());
        }
        let mut stats = RenderStats::default();
        let spans: Vec<PixelSpan> = match plan {
            RedrawPlan::Idle => return stats,
            RedrawPlan::Full => {
                stats.full = true;
                raster.full_span().into_iter().collect()
            }
            RedrawPlan::Regions(rects) => rects.iter().filter_map(|r| raster.pixel_span(r)).collect(),
        };

        for span in &spans {
            stats.samples += self.sample_span(snapshots, grid, *span);
            self.write_span(*span, raster);
            stats.pixels += span.area();
        }
        if self.params.blur > 0 {
            for span in &spans {
                self.blur.apply(raster, *span, self.params.blur);
            }
        }
        stats.spans = spans.len() as u32;
        stats
    }

    /// Lattice nodes needed to interpolate every pixel of `span`.
    fn node_range(&self, span: PixelSpan) -> (u32, u32, u32, u32) {
        let s = self.params.stride.max(1);
        (
            span.x0 / s,
            span.y0 / s,
            ((span.x1 - 1) / s + 1).min(self.cols - 1),
            ((span.y1 - 1) / s + 1).min(self.rows - 1),
        )
    }

    fn sample_span(&mut self, snapshots: &[ParticleSnapshot], grid: &SpatialGrid, span: PixelSpan) -> u64 {
        let s = self.params.stride.max(1);
        let reach = grid.reach_for(self.params.max_influence);
        let (nx0, ny0, nx1, ny1) = self.node_range(span);
        let mut cached = None;
        let mut count = 0;

        for ny in ny0..=ny1 {
            for nx in nx0..=nx1 {
                let p = Vec2::new((nx * s) as f32 + 0.5, (ny * s) as f32 + 0.5);
                let cell = grid.cell_of(p);
                if cached != Some(cell) {
                    grid.neighborhood_into(cell, reach, &mut self.candidates);
                    cached = Some(cell);
                }
                let mut acc = SampleAccumulator::default();
                for &i in &self.candidates {
                    if let Some(snap) = snapshots.get(i as usize) {
                        let influence = snap.influence(snap.position().distance_squared(p));
                        if influence > 0.0 {
                            acc.add(influence, snap);
                        }
                    }
                }
                let idx = (ny * self.cols + nx) as usize;
                self.field[idx] = acc.field();
                self.color[idx] = acc.resolve(self.params.blend);
                count += 1;
            }
        }
        count
    }

    fn write_span(&self, span: PixelSpan, raster: &mut RasterBuffer) {
        let p = &self.params;
        let s = p.stride.max(1);
        let inv = 1.0 / s as f32;
        let cols = self.cols as usize;

        for y in span.y0..span.y1 {
            let ny = y / s;
            let ty = (y % s) as f32 * inv;
            let ny1 = (ny + 1).min(self.rows - 1);
            let row = raster.row_mut(y);
            for x in span.x0..span.x1 {
                let nx = x / s;
                let tx = (x % s) as f32 * inv;
                let nx1 = (nx + 1).min(self.cols - 1);

                let corners = [
                    (ny as usize * cols + nx as usize, (1.0 - tx) * (1.0 - ty)),
                    (ny as usize * cols + nx1 as usize, tx * (1.0 - ty)),
                    (ny1 as usize * cols + nx as usize, (1.0 - tx) * ty),
                    (ny1 as usize * cols + nx1 as usize, tx * ty),
                ];
                let mut field = 0.0;
                let mut color = [0.0f32; 4];
                let mut color_weight = 0.0;
                for (idx, w) in corners {
                    if w <= 0.0 {
                        continue;
                    }
                    let f = self.field[idx];
                    field += f * w;
                    // Weight colors by field so empty nodes do not pull toward black.
                    let cw = f * w;
                    if cw > 0.0 {
                        let c = self.color[idx];
                        for k in 0..4 {
                            color[k] += c[k] * cw;
                        }
                        color_weight += cw;
                    }
                }

                let cov = coverage(field, p.threshold, p.edge_softness, p.glow_floor);
                row[x as usize] = if cov <= 0.0 || color_weight <= 0.0 {
                    Rgba8::TRANSPARENT
                } else {
                    let c = color.map(|v| v / color_weight);
                    Rgba8::from_unit([c[0], c[1], c[2], c[3] * cov])
                };
            }
        }
    }
}
