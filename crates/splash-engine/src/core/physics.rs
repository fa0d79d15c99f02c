//! Particle motion: gravity, drag, and wall bounces.
//!
//! Velocity follows `dv/dt = g - k·v` and is integrated in closed form, so
//! the trajectory after N small steps matches one step of the same total
//! duration up to float rounding. `drag` is the fraction of velocity kept per
//! reference frame (1/60 s by default), which fixes `k = -ln(drag) · rate`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::components::particle::Particle;
use crate::core::math::Rect;
use crate::core::rng::Rng;

/// Below this decay rate the linear-drag solution is replaced by its Taylor limit.
const TINY_DECAY: f32 = 1e-4;

/// Jitter is capped so a bounce never flips the perpendicular direction.
pub const MAX_JITTER: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Acceleration in px/s².
    pub gravity: Vec2,
    /// Velocity retained per reference frame, in [0, 1]. 0 pins particles in place.
    pub drag: f32,
    /// Reference frame rate `drag` is expressed against.
    pub reference_rate: f32,
    /// Bounce off the surface edges; when false particles leave the surface.
    pub bounce: bool,
    /// Perpendicular speed kept after an impact.
    pub bounce_damping: f32,
    /// Parallel speed lost on an impact.
    pub wall_friction: f32,
    /// Base-radius multiplier applied on each impact.
    pub bounce_shrink: f32,
    /// Relative perturbation of post-impact velocity, in [0, MAX_JITTER].
    pub jitter: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, 260.0),
            drag: 0.97,
            reference_rate: 60.0,
            bounce: true,
            bounce_damping: 0.55,
            wall_friction: 0.12,
            bounce_shrink: 0.9,
            jitter: 0.08,
        }
    }
}

impl MotionConfig {
    /// Continuous decay rate `k`. `None` means infinite drag.
    pub fn decay_rate(&self) -> Option<f32> {
        if self.drag <= 0.0 {
            return None;
        }
        Some(-self.drag.min(1.0).ln() * self.reference_rate.max(1.0))
    }
}

/// Edges a particle touched during one resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeHits {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl EdgeHits {
    pub fn any(&self) -> bool {
        self.left || self.right || self.top || self.bottom
    }

    fn horizontal(&self) -> bool {
        self.left || self.right
    }

    fn vertical(&self) -> bool {
        self.top || self.bottom
    }
}

/// Advance position and velocity by `dt` under constant acceleration and linear drag.
pub fn advance(
    position: Vec2,
    velocity: Vec2,
    gravity: Vec2,
    decay: Option<f32>,
    dt: f32,
) -> (Vec2, Vec2) {
    match decay {
        None => (position, Vec2::ZERO),
        Some(k) if k < TINY_DECAY => (
            position + velocity * dt + gravity * (0.5 * dt * dt),
            velocity + gravity * dt,
        ),
        Some(k) => {
            let retained = (-k * dt).exp();
            // 1 - e^(-k·dt), accurate for small k·dt.
            let lost = -(-k * dt).exp_m1();
            let terminal = gravity / k;
            let excess = velocity - terminal;
            (
                position + terminal * dt + excess * (lost / k),
                terminal + excess * retained,
            )
        }
    }
}

/// Moves particles and resolves collisions against the surface boundary.
#[derive(Debug, Clone)]
pub struct MotionIntegrator {
    config: MotionConfig,
    decay: Option<f32>,
    boundary: Rect,
    rng: Rng,
}

impl MotionIntegrator {
    pub fn new(config: MotionConfig, boundary: Rect, seed: u64) -> Self {
        let decay = config.decay_rate();
        Self {
            config,
            decay,
            boundary,
            rng: Rng::new(seed),
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: MotionConfig) {
        self.decay = config.decay_rate();
        self.config = config;
    }

    pub fn boundary(&self) -> Rect {
        self.boundary
    }

    pub fn set_boundary(&mut self, boundary: Rect) {
        self.boundary = boundary;
    }

    /// Step one particle. Returns the edges it bounced off (none when bouncing is disabled).
    pub fn integrate(&mut self, p: &mut Particle, dt: f32) -> EdgeHits {
        if dt > 0.0 {
            let (position, velocity) =
                advance(p.position, p.velocity, self.config.gravity, self.decay, dt);
            p.position = position;
            p.velocity = velocity;
        }
        if self.config.bounce {
            self.resolve_boundary(p)
        } else {
            EdgeHits::default()
        }
    }

    /// Keep the particle disk inside the boundary, reflecting velocity on each touched edge.
    pub fn resolve_boundary(&mut self, p: &mut Particle) -> EdgeHits {
        let b = self.boundary;
        let r = p.radius;
        let damping = self.config.bounce_damping.clamp(0.0, 1.0);
        let keep_parallel = 1.0 - self.config.wall_friction.clamp(0.0, 1.0);
        let mut hits = EdgeHits::default();

        if p.position.x - r < b.min.x {
            p.position.x = b.min.x + r;
            p.velocity.x = p.velocity.x.abs() * damping;
            hits.left = true;
        }
        if p.position.x + r > b.max.x {
            p.position.x = b.max.x - r;
            p.velocity.x = -p.velocity.x.abs() * damping;
            hits.right = true;
        }
        if hits.left && hits.right {
            p.position.x = b.center().x;
        }

        if p.position.y - r < b.min.y {
            p.position.y = b.min.y + r;
            p.velocity.y = p.velocity.y.abs() * damping;
            hits.top = true;
        }
        if p.position.y + r > b.max.y {
            p.position.y = b.max.y - r;
            p.velocity.y = -p.velocity.y.abs() * damping;
            hits.bottom = true;
        }
        if hits.top && hits.bottom {
            p.position.y = b.center().y;
        }

        if !hits.any() {
            return hits;
        }
        if hits.horizontal() {
            p.velocity.y *= keep_parallel;
        }
        if hits.vertical() {
            p.velocity.x *= keep_parallel;
        }
        p.shrink(self.config.bounce_shrink);
        self.perturb(p, hits);
        hits
    }

    fn perturb(&mut self, p: &mut Particle, hits: EdgeHits) {
        let j = self.config.jitter.clamp(0.0, MAX_JITTER);
        if j == 0.0 {
            return;
        }
        if hits.horizontal() {
            let push = p.velocity.x.abs();
            p.velocity.x *= 1.0 + j * self.rng.signed();
            p.velocity.y += j * push * self.rng.signed();
        }
        if hits.vertical() {
            let push = p.velocity.y.abs();
            p.velocity.y *= 1.0 + j * self.rng.signed();
            p.velocity.x += j * push * self.rng.signed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::particle::ParticleSpawn;
    use crate::core::math::Hsla;

    fn particle(position: Vec2, velocity: Vec2, radius: f32) -> Particle {
        Particle::spawn(&ParticleSpawn::new(position, velocity, 5.0, radius, Hsla::default()))
    }

    fn integrator(config: MotionConfig) -> MotionIntegrator {
        MotionIntegrator::new(config, Rect::from_size(800.0, 600.0), 11)
    }

    #[test]
    fn drag_without_gravity_matches_retention() {
        let config = MotionConfig {
            gravity: Vec2::ZERO,
            drag: 0.9,
            bounce: false,
            ..MotionConfig::default()
        };
        let mut m = integrator(config);
        let mut p = particle(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0), 4.0);
        m.integrate(&mut p, 1.0 / 60.0);
        assert!((p.velocity.x - 90.0).abs() < 1e-3);
    }

    #[test]
    fn zero_drag_pins_particle() {
        let config = MotionConfig {
            drag: 0.0,
            ..MotionConfig::default()
        };
        let mut m = integrator(config);
        let mut p = particle(Vec2::new(400.0, 300.0), Vec2::new(50.0, -20.0), 4.0);
        m.integrate(&mut p, 0.016);
        assert_eq!(p.velocity, Vec2::ZERO);
        assert_eq!(p.position, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn no_drag_is_ballistic() {
        let config = MotionConfig {
            gravity: Vec2::new(0.0, 100.0),
            drag: 1.0,
            bounce: false,
            ..MotionConfig::default()
        };
        let mut m = integrator(config);
        let mut p = particle(Vec2::ZERO, Vec2::new(10.0, 0.0), 1.0);
        m.integrate(&mut p, 1.0);
        assert!((p.position.x - 10.0).abs() < 1e-4);
        assert!((p.position.y - 50.0).abs() < 1e-3);
        assert!((p.velocity.y - 100.0).abs() < 1e-3);
    }

    #[test]
    fn left_wall_bounce() {
        let mut m = integrator(MotionConfig {
            gravity: Vec2::ZERO,
            ..MotionConfig::default()
        });
        // Center already past the left edge.
        let mut p = particle(Vec2::new(-0.01, 300.0), Vec2::new(-200.0, 0.0), 3.0);
        let hits = m.resolve_boundary(&mut p);
        assert!(hits.left && !hits.right);
        assert!(p.position.x >= 3.0 - 1e-4);
        assert!(p.position.x - p.radius >= -1e-4);
        assert!(p.velocity.x > 0.0, "velocity must point back into the surface");
        assert!(p.velocity.x <= 200.0 * 0.55 * (1.0 + MAX_JITTER));
    }

    #[test]
    fn corner_bounce_reflects_both_axes() {
        let mut m = integrator(MotionConfig::default());
        let mut p = particle(Vec2::new(1.0, 1.0), Vec2::new(-50.0, -80.0), 4.0);
        let hits = m.resolve_boundary(&mut p);
        assert!(hits.left && hits.top);
        assert!(p.velocity.x > 0.0 && p.velocity.y > 0.0);
        assert!(p.position.x - p.radius >= -1e-4 && p.position.y - p.radius >= -1e-4);
    }

    #[test]
    fn bounce_shrinks_radius() {
        let mut m = integrator(MotionConfig::default());
        let mut p = particle(Vec2::new(799.0, 300.0), Vec2::new(10.0, 0.0), 10.0);
        let before = p.base_radius;
        m.resolve_boundary(&mut p);
        assert!(p.base_radius < before);
    }

    #[test]
    fn narrow_boundary_centers() {
        let mut m = MotionIntegrator::new(MotionConfig::default(), Rect::from_size(4.0, 600.0), 1);
        let mut p = particle(Vec2::new(1.0, 300.0), Vec2::ZERO, 10.0);
        let hits = m.resolve_boundary(&mut p);
        assert!(hits.left && hits.right);
        assert_eq!(p.position.x, 2.0);
    }

    #[test]
    fn bounce_disabled_lets_particles_leave() {
        let mut m = integrator(MotionConfig {
            bounce: false,
            gravity: Vec2::ZERO,
            drag: 1.0,
            ..MotionConfig::default()
        });
        let mut p = particle(Vec2::new(2.0, 300.0), Vec2::new(-600.0, 0.0), 3.0);
        let hits = m.integrate(&mut p, 0.1);
        assert!(!hits.any());
        assert!(p.is_outside(&m.boundary(), 0.0));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn step_size_independent(
                drag in 0.8f32..1.0,
                gx in -500.0f32..500.0,
                gy in -500.0f32..500.0,
                vx in -800.0f32..800.0,
                vy in -800.0f32..800.0,
            ) {
                let gravity = Vec2::new(gx, gy);
                let decay = MotionConfig { drag, ..MotionConfig::default() }.decay_rate();
                let (mut p1, mut v1) = (Vec2::ZERO, Vec2::new(vx, vy));
                for _ in 0..60 {
                    (p1, v1) = advance(p1, v1, gravity, decay, 1.0 / 120.0);
                }
                let (mut p2, mut v2) = (Vec2::ZERO, Vec2::new(vx, vy));
                for _ in 0..30 {
                    (p2, v2) = advance(p2, v2, gravity, decay, 1.0 / 60.0);
                }
                prop_assert!((p1 - p2).length() <= 1e-3 * (1.0 + p1.length()), "{p1} vs {p2}");
                prop_assert!((v1 - v2).length() <= 1e-3 * (1.0 + v1.length()), "{v1} vs {v2}");
            }

            #[test]
            fn bounced_particles_stay_inside(
                x in -50.0f32..850.0,
                y in -50.0f32..650.0,
                vx in -2000.0f32..2000.0,
                vy in -2000.0f32..2000.0,
                radius in 0.5f32..30.0,
            ) {
                let mut m = integrator(MotionConfig::default());
                let mut p = particle(Vec2::new(x, y), Vec2::new(vx, vy), radius);
                m.integrate(&mut p, 1.0 / 60.0);
                let b = m.boundary();
                prop_assert!(p.position.x - p.radius >= b.min.x - 1e-3);
                prop_assert!(p.position.x + p.radius <= b.max.x + 1e-3);
                prop_assert!(p.position.y - p.radius >= b.min.y - 1e-3);
                prop_assert!(p.position.y + p.radius <= b.max.y + 1e-3);
            }
        }
    }
}
