use glam::Vec2;

use crate::components::emitter::{ColorMode, EmitterConfig};
use crate::components::particle::ParticleSpawn;
use crate::core::math::Hsla;
use crate::core::rng::Rng;
use crate::input::tracker::PointerState;
use crate::systems::pool::ParticlePool;

/// Turns pointer motion into particle spawns.
///
/// Continuous emission accumulates fractional particles so low rates still
/// emit at the right average; the accumulator is cleared whenever intensity
/// drops below the threshold so no backlog is released later in one burst.
#[derive(Debug, Clone)]
pub struct Emitter {
    config: EmitterConfig,
    accumulator: f32,
    /// Seconds of emitter time, drives hue cycling.
    clock: f32,
    rng: Rng,
}

impl Emitter {
    pub fn new(config: EmitterConfig, seed: u64) -> Self {
        Self {
            config,
            accumulator: 0.0,
            clock: 0.0,
            rng: Rng::new(seed),
        }
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EmitterConfig) {
        self.config = config;
    }

    /// Drop any pending fractional emission and restart hue cycling and
    /// the random stream from `seed`.
    pub fn reset(&mut self, seed: u64) {
        self.accumulator = 0.0;
        self.clock = 0.0;
        self.rng = Rng::new(seed);
    }

    /// Pointer speed normalized to [0, 1].
    pub fn intensity(&self, velocity: Vec2) -> f32 {
        if self.config.max_input_speed <= 0.0 {
            return 0.0;
        }
        (velocity.length() / self.config.max_input_speed).clamp(0.0, 1.0)
    }

    /// Spawn particles for one frame of pointer motion. Returns the number spawned.
    pub fn tick(&mut self, pool: &mut ParticlePool, pointer: &PointerState, dt: f32, now_ms: f64) -> usize {
        self.clock += dt.max(0.0);
        if !pointer.present {
            self.accumulator = 0.0;
            return 0;
        }
        let intensity = self.intensity(pointer.velocity);
        if intensity < self.config.min_intensity || intensity <= 0.0 {
            self.accumulator = 0.0;
            return 0;
        }

        self.accumulator += self.config.rate.max(0.0) * intensity * dt.max(0.0);
        let mut spawned = 0;
        while self.accumulator >= 1.0 && !pool.is_full() {
            self.accumulator -= 1.0;
            let spawn = self.spawn_params(pointer.position, pointer.velocity, intensity, now_ms);
            if pool.acquire(&spawn).is_some() {
                spawned += 1;
            }
        }
        // Keep at most one pending particle while the pool is exhausted.
        self.accumulator = self.accumulator.min(1.0);
        spawned
    }

    /// Emit up to `count` particles at `position` immediately, clipped to free capacity.
    pub fn force_emit(
        &mut self,
        pool: &mut ParticlePool,
        position: Vec2,
        count: usize,
        intensity: f32,
        now_ms: f64,
    ) -> usize {
        let n = count.min(pool.available_count());
        let intensity = intensity.clamp(0.0, 1.0);
        for _ in 0..n {
            let spawn = self.spawn_params(position, Vec2::ZERO, intensity, now_ms);
            pool.acquire(&spawn);
        }
        if n > 0 {
            log::debug!("burst of {} at ({:.0}, {:.0})", n, position.x, position.y);
        }
        n
    }

    fn spawn_params(&mut self, origin: Vec2, pointer_velocity: Vec2, intensity: f32, now_ms: f64) -> ParticleSpawn {
        let c = &self.config;
        let (spread_speed, inherit, scatter) = (c.spread_speed, c.inherit_velocity, c.scatter);
        let (lifetime, lifetime_jitter) = (c.lifetime, c.lifetime_jitter.clamp(0.0, 0.95));
        let (radius, radius_jitter) = (c.radius, c.radius_jitter.clamp(0.0, 0.95));
        let (end_scale, fade) = (c.end_scale, c.fade);

        let kick = spread_speed * (0.3 + 0.7 * self.rng.next_f32()) * (0.5 + 0.5 * intensity);
        let velocity = pointer_velocity * inherit + self.rng.direction() * kick;
        let position = origin + self.rng.direction() * (scatter * self.rng.next_f32());
        let lifetime = lifetime * (1.0 + lifetime_jitter * self.rng.signed());
        let radius = radius * (1.0 + radius_jitter * self.rng.signed()) * (0.6 + 0.4 * intensity);
        let color = self.pick_color();
        let color = color.with_alpha(color.a * (0.55 + 0.45 * intensity));

        ParticleSpawn::new(position, velocity, lifetime, radius, color)
            .with_end_scale(end_scale)
            .with_fade(fade)
            .at(now_ms)
    }

    fn pick_color(&mut self) -> Hsla {
        match &self.config.color {
            ColorMode::Fixed { color } => *color,
            ColorMode::Cycle { base, speed, spread } => {
                let offset = self.clock * speed + spread * self.rng.signed();
                base.shifted(offset)
            }
            ColorMode::Palette { colors } => {
                if colors.is_empty() {
                    Hsla::default()
                } else {
                    colors[self.rng.next_int(colors.len() as u32) as usize]
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer(velocity: Vec2) -> PointerState {
        PointerState {
            position: Vec2::new(100.0, 100.0),
            last_position: Vec2::new(100.0, 100.0),
            velocity,
            pressed: false,
            present: true,
        }
    }

    fn emitter(rate: f32) -> Emitter {
        Emitter::new(
            EmitterConfig::default()
                .with_rate(rate)
                .with_max_input_speed(1000.0)
                .with_min_intensity(0.1),
            42,
        )
    }

    #[test]
    fn intensity_is_normalized() {
        let e = emitter(60.0);
        assert_eq!(e.intensity(Vec2::ZERO), 0.0);
        assert!((e.intensity(Vec2::new(500.0, 0.0)) - 0.5).abs() < 1e-6);
        assert_eq!(e.intensity(Vec2::new(5000.0, 0.0)), 1.0);
    }

    #[test]
    fn continuous_accumulator() {
        let mut e = emitter(60.0);
        let mut pool = ParticlePool::with_capacity(100);
        // Full intensity at 60/s: one particle per 1/60 s frame.
        let n = e.tick(&mut pool, &pointer(Vec2::new(1000.0, 0.0)), 1.0 / 60.0 + 1e-6, 0.0);
        assert_eq!(n, 1);
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn fractional_rates_average_out() {
        let mut e = emitter(30.0);
        let mut pool = ParticlePool::with_capacity(100);
        let p = pointer(Vec2::new(1000.0, 0.0));
        let total: usize = (0..60).map(|_| e.tick(&mut pool, &p, 1.0 / 60.0, 0.0)).sum();
        assert!((29..=30).contains(&total), "got {total}");
    }

    #[test]
    fn slow_pointer_emits_nothing_and_clears_backlog() {
        let mut e = emitter(600.0);
        let mut pool = ParticlePool::with_capacity(100);
        let fast = pointer(Vec2::new(1000.0, 0.0));
        e.tick(&mut pool, &fast, 0.001, 0.0);
        let slow = pointer(Vec2::new(50.0, 0.0));
        assert_eq!(e.tick(&mut pool, &slow, 0.5, 0.0), 0);
        assert_eq!(e.accumulator, 0.0);
    }

    #[test]
    fn absent_pointer_emits_nothing() {
        let mut e = emitter(600.0);
        let mut pool = ParticlePool::with_capacity(100);
        let mut p = pointer(Vec2::new(1000.0, 0.0));
        p.present = false;
        assert_eq!(e.tick(&mut pool, &p, 0.1, 0.0), 0);
    }

    #[test]
    fn emission_stops_at_capacity() {
        let mut e = emitter(10_000.0);
        let mut pool = ParticlePool::with_capacity(5);
        let n = e.tick(&mut pool, &pointer(Vec2::new(1000.0, 0.0)), 0.1, 0.0);
        assert_eq!(n, 5);
        assert!(pool.is_full());
        assert!(e.accumulator <= 1.0);
    }

    #[test]
    fn force_emit_clipped_to_free_slots() {
        let mut e = emitter(0.0);
        let mut pool = ParticlePool::with_capacity(8);
        assert_eq!(e.force_emit(&mut pool, Vec2::new(5.0, 5.0), 3, 1.0, 0.0), 3);
        assert_eq!(e.force_emit(&mut pool, Vec2::new(5.0, 5.0), 20, 1.0, 0.0), 5);
        assert_eq!(e.force_emit(&mut pool, Vec2::new(5.0, 5.0), 1, 1.0, 0.0), 0);
    }

    #[test]
    fn spawned_particles_are_valid() {
        let mut e = emitter(0.0);
        let mut pool = ParticlePool::with_capacity(64);
        e.force_emit(&mut pool, Vec2::new(50.0, 50.0), 64, 0.7, 12.0);
        for (_, p) in pool.iter_active() {
            assert!(p.radius > 0.0);
            assert!(p.max_lifetime > 0.0);
            assert!((0.0..=1.0).contains(&p.color.a));
            assert!(p.position.distance(Vec2::new(50.0, 50.0)) <= e.config().scatter + 1e-3);
            assert_eq!(p.created_at, 12.0);
        }
    }

    #[test]
    fn reset_clears_backlog_and_replays_seed() {
        let mut e = emitter(30.0);
        let mut pool = ParticlePool::with_capacity(100);
        e.tick(&mut pool, &pointer(Vec2::new(1000.0, 0.0)), 0.01, 0.0);
        assert!(e.accumulator > 0.0);
        e.reset(42);
        assert_eq!(e.accumulator, 0.0);
        assert_eq!(e.clock, 0.0);

        let mut a = ParticlePool::with_capacity(4);
        let mut b = ParticlePool::with_capacity(4);
        e.force_emit(&mut a, Vec2::ZERO, 4, 1.0, 0.0);
        emitter(30.0).force_emit(&mut b, Vec2::ZERO, 4, 1.0, 0.0);
        let positions = |p: &ParticlePool| p.iter_active().map(|(_, p)| p.position).collect::<Vec<_>>();
        assert_eq!(positions(&a), positions(&b));
    }

    #[test]
    fn palette_colors_are_used() {
        let red = Hsla::new(0.0, 1.0, 0.5, 1.0);
        let mut e = Emitter::new(
            EmitterConfig::default().with_color(ColorMode::Palette { colors: vec![red] }),
            1,
        );
        let mut pool = ParticlePool::with_capacity(4);
        e.force_emit(&mut pool, Vec2::ZERO, 4, 1.0, 0.0);
        assert!(pool.iter_active().all(|(_, p)| p.color.h == 0.0));
    }
}
