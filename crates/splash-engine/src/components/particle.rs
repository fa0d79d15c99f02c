//! Particle record stored in the pool arena, and the flat snapshot the renderer reads.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::core::easing::Easing;
use crate::core::math::{lerp, Hsla, Rect};

/// Smallest radius a live particle can have, in pixels.
pub const RADIUS_FLOOR: f32 = 0.5;

/// Shortest lifetime a particle is spawned with, in seconds.
pub const MIN_LIFETIME: f32 = 1e-3;

/// Influence never reaches further than this many radii.
pub const INFLUENCE_RADII: f32 = 3.0;

/// A single splash particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    /// Pixels per second.
    pub velocity: Vec2,
    /// Seconds since spawn, never above `max_lifetime`.
    pub age: f32,
    pub max_lifetime: f32,
    /// Current radius, derived from `base_radius` and the fade curve.
    pub radius: f32,
    /// Spawn radius, reduced by wall impacts.
    pub base_radius: f32,
    /// Radius multiplier reached at end of life, in [0, 1].
    pub end_scale: f32,
    /// Color; `color.a` is the current alpha.
    pub color: Hsla,
    pub base_alpha: f32,
    pub fade: Easing,
    /// Host timestamp (ms) of the frame that spawned the particle.
    pub created_at: f64,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            age: 0.0,
            max_lifetime: 0.0,
            radius: 0.0,
            base_radius: 0.0,
            end_scale: 1.0,
            color: Hsla::new(0.0, 0.0, 0.0, 0.0),
            base_alpha: 0.0,
            fade: Easing::Linear,
            created_at: 0.0,
        }
    }
}

/// Everything needed to bring a pooled particle to life.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSpawn {
    pub position: Vec2,
    pub velocity: Vec2,
    pub lifetime: f32,
    pub radius: f32,
    pub color: Hsla,
    pub end_scale: f32,
    pub fade: Easing,
    pub created_at: f64,
}

impl ParticleSpawn {
    pub fn new(position: Vec2, velocity: Vec2, lifetime: f32, radius: f32, color: Hsla) -> Self {
        Self {
            position,
            velocity,
            lifetime,
            radius,
            color,
            end_scale: 0.35,
            fade: Easing::QuadOut,
            created_at: 0.0,
        }
    }

    pub fn with_fade(mut self, fade: Easing) -> Self {
        self.fade = fade;
        self
    }

    pub fn with_end_scale(mut self, end_scale: f32) -> Self {
        self.end_scale = end_scale;
        self
    }

    pub fn at(mut self, created_at: f64) -> Self {
        self.created_at = created_at;
        self
    }
}

impl Particle {
    pub fn spawn(spawn: &ParticleSpawn) -> Self {
        let mut p = Self {
            position: spawn.position,
            velocity: spawn.velocity,
            age: 0.0,
            max_lifetime: spawn.lifetime.max(MIN_LIFETIME),
            radius: 0.0,
            base_radius: spawn.radius.max(RADIUS_FLOOR),
            end_scale: spawn.end_scale.clamp(0.0, 1.0),
            color: spawn.color,
            base_alpha: spawn.color.a.clamp(0.0, 1.0),
            fade: spawn.fade,
            created_at: spawn.created_at,
        };
        p.refresh_visuals();
        p
    }

    /// Age as a fraction of lifetime, in [0, 1].
    pub fn life_fraction(&self) -> f32 {
        if self.max_lifetime <= 0.0 {
            return 1.0;
        }
        (self.age / self.max_lifetime).clamp(0.0, 1.0)
    }

    /// Add `dt` seconds of age and recompute radius and alpha.
    pub fn advance_age(&mut self, dt: f32) {
        self.age = (self.age + dt.max(0.0)).min(self.max_lifetime);
        self.refresh_visuals();
    }

    pub fn is_expired(&self) -> bool {
        self.age >= self.max_lifetime
    }

    /// Scale the base radius down (wall impacts). Never grows, never below the floor.
    pub fn shrink(&mut self, factor: f32) {
        self.base_radius = (self.base_radius * factor.clamp(0.0, 1.0)).max(RADIUS_FLOOR);
        self.refresh_visuals();
    }

    /// Distance beyond which this particle contributes nothing to the field.
    pub fn influence_radius(&self, max_influence: f32) -> f32 {
        (INFLUENCE_RADII * self.radius).min(max_influence)
    }

    /// Bounding square of the particle disk.
    pub fn footprint(&self) -> Rect {
        Rect::around(self.position, self.radius)
    }

    /// True when the disk lies entirely outside `bounds` grown by `margin`.
    pub fn is_outside(&self, bounds: &Rect, margin: f32) -> bool {
        !self.footprint().intersects(&bounds.expand(margin))
    }

    fn refresh_visuals(&mut self) {
        let t = self.fade.apply(self.life_fraction());
        self.radius = (self.base_radius * lerp(1.0, self.end_scale, t)).max(RADIUS_FLOOR);
        self.color.a = (self.base_alpha * (1.0 - t)).clamp(0.0, 1.0);
    }
}

/// Immutable per-frame view of one live particle, laid out for tight loops.
///
/// Layout: 8 floats = 32 bytes per particle.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleSnapshot {
    pub x: f32,
    pub y: f32,
    pub radius_sq: f32,
    /// Influence cutoff distance.
    pub cutoff: f32,
    pub alpha: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl ParticleSnapshot {
    pub const FLOATS: usize = 8;

    pub fn from_particle(p: &Particle, max_influence: f32) -> Self {
        let [r, g, b] = p.color.to_rgb();
        Self {
            x: p.position.x,
            y: p.position.y,
            radius_sq: p.radius * p.radius,
            cutoff: p.influence_radius(max_influence),
            alpha: p.color.a,
            r,
            g,
            b,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Field contribution at squared distance `d2`: r²/(d²+1) scaled by alpha, zero past the cutoff.
    #[inline]
    pub fn influence(&self, d2: f32) -> f32 {
        if d2 > self.cutoff * self.cutoff {
            return 0.0;
        }
        self.radius_sq / (d2 + 1.0) * self.alpha
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(lifetime: f32, radius: f32) -> Particle {
        Particle::spawn(&ParticleSpawn::new(
            Vec2::new(10.0, 10.0),
            Vec2::ZERO,
            lifetime,
            radius,
            Hsla::new(180.0, 1.0, 0.5, 0.8),
        ))
    }

    #[test]
    fn spawn_starts_at_full_look() {
        let p = spawn(1.0, 12.0);
        assert_eq!(p.age, 0.0);
        assert_eq!(p.radius, 12.0);
        assert!((p.color.a - 0.8).abs() < 1e-6);
    }

    #[test]
    fn radius_and_alpha_never_increase() {
        let mut p = spawn(1.0, 12.0);
        let (mut r, mut a) = (p.radius, p.color.a);
        for _ in 0..70 {
            p.advance_age(1.0 / 60.0);
            assert!(p.radius <= r + 1e-6);
            assert!(p.color.a <= a + 1e-6);
            assert!(p.radius >= RADIUS_FLOOR);
            r = p.radius;
            a = p.color.a;
        }
        assert!(p.is_expired());
        assert_eq!(p.age, p.max_lifetime);
        assert_eq!(p.color.a, 0.0);
    }

    #[test]
    fn zero_lifetime_is_clamped() {
        let p = spawn(0.0, 5.0);
        assert!(p.max_lifetime > 0.0);
    }

    #[test]
    fn shrink_respects_floor() {
        let mut p = spawn(1.0, 1.0);
        for _ in 0..20 {
            p.shrink(0.5);
        }
        assert_eq!(p.base_radius, RADIUS_FLOOR);
        assert!(p.radius >= RADIUS_FLOOR);
    }

    #[test]
    fn outside_detection() {
        let bounds = Rect::from_size(100.0, 100.0);
        let mut p = spawn(1.0, 5.0);
        assert!(!p.is_outside(&bounds, 0.0));
        p.position = Vec2::new(-6.0, 50.0);
        assert!(p.is_outside(&bounds, 0.0));
        assert!(!p.is_outside(&bounds, 2.0));
    }

    #[test]
    fn snapshot_influence_cuts_off() {
        let p = spawn(1.0, 10.0);
        let s = ParticleSnapshot::from_particle(&p, 1000.0);
        assert_eq!(s.cutoff, 30.0);
        assert!(s.influence(0.0) > 0.0);
        assert!(s.influence(29.0 * 29.0) > 0.0);
        assert_eq!(s.influence(31.0 * 31.0), 0.0);
        assert_eq!(std::mem::size_of::<ParticleSnapshot>(), ParticleSnapshot::FLOATS * 4);
    }
}
