//! The splash engine: owns every subsystem and runs one frame at a time.
//!
//! Frame pipeline: drain input → emit → integrate and age → release finished
//! particles → snapshot → rebuild spatial grid → plan redraw → render →
//! observe frame timing. The host presents `raster()` according to the
//! returned plan.

use glam::Vec2;

use crate::api::config::{merge, validate, ClampedField, PartialConfig, SplashConfig, Validated};
use crate::api::error::{Result, SplashError};
use crate::api::types::{FrameReport, Telemetry};
use crate::components::particle::{Particle, ParticleSnapshot};
use crate::core::math::Rect;
use crate::core::physics::MotionIntegrator;
use crate::core::time::FrameClock;
use crate::input::queue::{InputEvent, InputQueue};
use crate::input::tracker::VelocityTracker;
use crate::renderer::field::{FieldParams, FieldRenderer};
use crate::renderer::raster::RasterBuffer;
use crate::renderer::surface::SurfaceCaps;
use crate::systems::dirty::{DirtyRegionTracker, RedrawPlan};
use crate::systems::emitter::Emitter;
use crate::systems::perf::PerformanceMonitor;
use crate::systems::pool::ParticlePool;
use crate::systems::quality::{QualityController, QualityLevel};
use crate::systems::spatial::SpatialGrid;

/// Separates the bounce-jitter stream from the emission stream.
const MOTION_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Rendering is skipped when the previous render is more recent than this
/// share of the tier's target frame interval.
const RENDER_PACING: f64 = 0.9;

pub struct SplashEngine {
    config: SplashConfig,
    caps: SurfaceCaps,
    clock: FrameClock,
    perf: PerformanceMonitor,
    input: InputQueue,
    tracker: VelocityTracker,
    emitter: Emitter,
    pool: ParticlePool,
    motion: MotionIntegrator,
    grid: SpatialGrid,
    dirty: DirtyRegionTracker,
    quality: QualityController,
    renderer: FieldRenderer,
    raster: RasterBuffer,
    snapshots: Vec<ParticleSnapshot>,
    last_render_ms: Option<f64>,
    now_ms: f64,
    frame: u64,
}

impl SplashEngine {
    /// Build an engine drawing into a `width` x `height` raster.
    /// Fails when the surface cannot take pixel buffers.
    pub fn new(config: SplashConfig, caps: SurfaceCaps, width: u32, height: u32) -> Result<Self> {
        let Validated { config, clamped } = validate(config);
        if !clamped.is_empty() {
            log::debug!("{} config field(s) clamped at startup", clamped.len());
        }

        let quality = QualityController::new(config.quality.clone());
        let settings = quality.settings();
        let params = FieldParams::resolve(&config.render, &settings, caps);
        let renderer = FieldRenderer::new(caps, width, height, params).map_err(|e| {
            log::error!("splash engine unavailable: {}", e);
            e
        })?;
        let bounds = Rect::from_size(width as f32, height as f32);
        let capacity = settings.max_particles.min(config.max_particles).max(1);

        log::info!(
            "splash engine: {}x{}, quality {}, {} particles{}",
            width,
            height,
            quality.level().name(),
            capacity,
            if caps.is_degraded() { " (degraded)" } else { "" }
        );

        Ok(Self {
            clock: FrameClock::default(),
            perf: PerformanceMonitor::new(PerformanceMonitor::DEFAULT_WINDOW, config.quality.target_fps),
            input: InputQueue::new(),
            tracker: VelocityTracker::new(config.input.clone()),
            emitter: Emitter::new(config.emitter.clone(), config.seed),
            pool: ParticlePool::with_capacity(capacity),
            motion: MotionIntegrator::new(config.motion.clone(), bounds, config.seed ^ MOTION_SEED_SALT),
            grid: SpatialGrid::new(width, height, config.render.cell_size),
            dirty: DirtyRegionTracker::new(config.regions.clone(), width, height),
            quality,
            renderer,
            raster: RasterBuffer::new(width, height),
            snapshots: Vec::with_capacity(capacity),
            last_render_ms: None,
            now_ms: 0.0,
            frame: 0,
            caps,
            config,
        })
    }

    pub fn config(&self) -> &SplashConfig {
        &self.config
    }

    pub fn capabilities(&self) -> SurfaceCaps {
        self.caps
    }

    /// Queue a host input event for the next frame.
    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    /// Advance one frame to host time `now_ms`.
    pub fn frame(&mut self, now_ms: f64) -> Result<FrameReport> {
        if !now_ms.is_finite() {
            return Err(SplashError::InvalidTimestamp(now_ms));
        }
        let dt = self.clock.tick(now_ms);
        self.perf.record_frame(now_ms);
        self.dirty.set_time(now_ms);
        self.now_ms = now_ms;
        self.frame += 1;

        let mut report = FrameReport {
            dt,
            ..FrameReport::default()
        };

        for event in self.input.drain() {
            self.tracker.handle(&event);
        }
        self.tracker.end_frame(dt);

        if self.tracker.take_press() {
            let origin = self.tracker.state().position;
            let burst = self.config.emitter.burst_count as usize;
            let intensity = self.config.emitter.burst_intensity;
            report.emitted += self
                .emitter
                .force_emit(&mut self.pool, origin, burst, intensity, now_ms);
        }
        report.emitted += self
            .emitter
            .tick(&mut self.pool, self.tracker.state(), dt, now_ms);

        self.step_particles(dt);
        report.released = self.release_finished();
        self.capture_snapshots();

        if self.render_due(now_ms) {
            let plan = self.plan_redraw();
            report.render = self
                .renderer
                .render(&self.snapshots, &self.grid, &plan, &mut self.raster);
            report.plan = plan;
            report.rendered = true;
            self.dirty.clear();
            self.last_render_ms = Some(now_ms);
        }

        let stats = self.perf.stats();
        if let Some(change) = self.quality.observe(now_ms, &stats) {
            self.apply_quality();
            report.quality_change = Some(change);
        }
        Ok(report)
    }

    /// Integrate, age, and mark the area each particle covered before and after.
    fn step_particles(&mut self, dt: f32) {
        let max_influence = self.renderer.params().max_influence;
        let padding = self.renderer.params().padding();
        let motion = &mut self.motion;
        let dirty = &mut self.dirty;
        self.pool.for_each_active_mut(|_, p| {
            let previous = p.position;
            let reach_before = p.influence_radius(max_influence);
            motion.integrate(p, dt);
            p.advance_age(dt);
            let reach = reach_before.max(p.influence_radius(max_influence)) + padding;
            dirty.mark_moving_particle_dirty(previous, p.position, reach, p.color.a * p.radius);
        });
    }

    /// Release expired, non-finite, and (when not bouncing) off-surface particles.
    fn release_finished(&mut self) -> usize {
        let bounds = self.raster.bounds();
        let bounce = self.config.motion.bounce;
        let released = self.pool.retain(|p| {
            let broken = !p.position.is_finite() || !p.velocity.is_finite();
            let offscreen = !bounce && p.is_outside(&bounds, 0.0);
            !(p.is_expired() || broken || offscreen)
        });
        if released > 0 {
            log::trace!("released {} particles", released);
        }
        released
    }

    fn capture_snapshots(&mut self) {
        let max_influence = self.renderer.params().max_influence;
        self.snapshots.clear();
        self.snapshots.extend(
            self.pool
                .iter_active()
                .map(|(_, p)| ParticleSnapshot::from_particle(p, max_influence)),
        );
        self.grid.rebuild(&self.snapshots);
    }

    fn render_due(&self, now_ms: f64) -> bool {
        let interval = self.quality.settings().target_frame_ms as f64 * RENDER_PACING;
        match self.last_render_ms {
            None => true,
            Some(last) => now_ms < last || now_ms - last >= interval,
        }
    }

    fn plan_redraw(&mut self) -> RedrawPlan {
        if self.config.regions.enabled {
            self.dirty.optimized_regions()
        } else if self.dirty.is_empty() {
            RedrawPlan::Idle
        } else {
            RedrawPlan::Full
        }
    }

    /// Push the active tier into pool capacity and renderer parameters.
    fn apply_quality(&mut self) {
        let settings = self.quality.settings();
        let capacity = settings.max_particles.min(self.config.max_particles).max(1);
        if capacity != self.pool.capacity() {
            self.pool.resize(capacity);
        }
        self.renderer
            .set_params(FieldParams::resolve(&self.config.render, &settings, self.caps));
        self.dirty.mark_full();
    }

    /// Redraw everything next frame, e.g. after the host lost a presented frame.
    pub fn invalidate(&mut self) {
        self.dirty.mark_full();
    }

    /// Merge `overrides` into the running config. Returns the fields that had to be clamped.
    pub fn update_config(&mut self, overrides: &PartialConfig) -> Vec<ClampedField> {
        let Validated { config, clamped } = validate(merge(&self.config, overrides));
        self.emitter.set_config(config.emitter.clone());
        self.motion.set_config(config.motion.clone());
        self.tracker.set_config(config.input.clone());
        self.grid.set_cell_size(config.render.cell_size);
        self.dirty.set_config(config.regions.clone());
        self.perf.set_target_fps(config.quality.target_fps);
        self.quality.set_config(config.quality.clone());
        self.config = config;
        self.apply_quality();
        log::info!(
            "config updated: quality {}, capacity {}",
            self.quality.level().name(),
            self.pool.capacity()
        );
        clamped
    }

    pub fn update_config_json(&mut self, json: &str) -> Result<Vec<ClampedField>> {
        let overrides = PartialConfig::from_json(json)?;
        Ok(self.update_config(&overrides))
    }

    /// Drop every particle and all timing history. The next frame redraws everything.
    pub fn reset(&mut self) {
        self.pool.release_all();
        self.input.clear();
        self.tracker.reset();
        self.emitter.reset(self.config.seed);
        self.motion = MotionIntegrator::new(
            self.config.motion.clone(),
            self.raster.bounds(),
            self.config.seed ^ MOTION_SEED_SALT,
        );
        self.clock.reset();
        self.perf.reset();
        self.quality.reset();
        self.raster.clear();
        self.dirty.clear();
        self.apply_quality();
        self.last_render_ms = None;
        self.frame = 0;
        log::info!("splash engine reset");
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == self.size() {
            return;
        }
        self.raster.resize(width, height);
        self.renderer.resize(width, height);
        self.grid.resize(width, height);
        self.dirty.resize(width, height);
        self.motion.set_boundary(Rect::from_size(width as f32, height as f32));
        log::info!("splash engine resized to {}x{}", width, height);
    }

    /// Emit up to `count` particles at `position` now. Returns how many were spawned.
    pub fn force_emit(&mut self, position: Vec2, count: usize) -> usize {
        let intensity = self.config.emitter.burst_intensity;
        self.emitter
            .force_emit(&mut self.pool, position, count, intensity, self.now_ms)
    }

    /// The page was hidden. Pending input is dropped and the pointer released.
    pub fn suspend(&mut self) {
        self.input.clear();
        self.tracker.leave();
        log::debug!("splash engine suspended");
    }

    /// The page is visible again. Timing restarts; particles are kept.
    pub fn resume(&mut self) {
        self.clock.reset();
        self.perf.reset();
        self.quality.reset_timers();
        self.last_render_ms = None;
        log::debug!("splash engine resumed");
    }

    pub fn raster(&self) -> &RasterBuffer {
        &self.raster
    }

    pub fn size(&self) -> (u32, u32) {
        (self.raster.width(), self.raster.height())
    }

    pub fn particles(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.pool.iter_active().map(|(_, p)| p)
    }

    pub fn active_particle_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Pool slots free for new particles.
    pub fn available_capacity(&self) -> usize {
        self.pool.available_count()
    }

    pub fn current_fps(&self) -> f32 {
        self.perf.fps()
    }

    pub fn current_quality_level(&self) -> QualityLevel {
        self.quality.level()
    }

    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            active_particles: self.pool.active_count(),
            capacity: self.pool.capacity(),
            fps: self.perf.fps(),
            quality: self.quality.level(),
            frame: self.frame,
        }
    }
}
