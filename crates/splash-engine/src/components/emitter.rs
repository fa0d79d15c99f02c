use serde::{Deserialize, Serialize};

use crate::core::easing::Easing;
use crate::core::math::Hsla;

/// How particle colors are chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ColorMode {
    /// All particles use the same color.
    Fixed { color: Hsla },
    /// Hue rotates over time; each particle is offset by up to `spread` degrees.
    Cycle { base: Hsla, speed: f32, spread: f32 },
    /// Pick randomly from a palette of colors. An empty palette falls back to the default color.
    Palette { colors: Vec<Hsla> },
}

impl Default for ColorMode {
    fn default() -> Self {
        ColorMode::Cycle {
            base: Hsla::default(),
            speed: 40.0,
            spread: 24.0,
        }
    }
}

/// Parameters for spawning particles from pointer motion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitterConfig {
    /// Particles per second at full intensity.
    pub rate: f32,
    /// Intensity below which continuous emission stops.
    pub min_intensity: f32,
    /// Pointer speed (px/s) that maps to full intensity.
    pub max_input_speed: f32,
    /// Particles per press burst.
    pub burst_count: u32,
    /// Intensity of press bursts.
    pub burst_intensity: f32,
    /// Seconds.
    pub lifetime: f32,
    /// Relative lifetime variation, in [0, 1).
    pub lifetime_jitter: f32,
    /// Pixels.
    pub radius: f32,
    /// Relative radius variation, in [0, 1).
    pub radius_jitter: f32,
    /// Radius multiplier at end of life.
    pub end_scale: f32,
    pub fade: Easing,
    /// Fraction of pointer velocity handed to new particles.
    pub inherit_velocity: f32,
    /// Speed (px/s) of the random outward kick.
    pub spread_speed: f32,
    /// Spawn position scatter radius in pixels.
    pub scatter: f32,
    pub color: ColorMode,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            rate: 90.0,
            min_intensity: 0.05,
            max_input_speed: 1800.0,
            burst_count: 14,
            burst_intensity: 0.8,
            lifetime: 1.1,
            lifetime_jitter: 0.3,
            radius: 14.0,
            radius_jitter: 0.35,
            end_scale: 0.35,
            fade: Easing::QuadOut,
            inherit_velocity: 0.35,
            spread_speed: 120.0,
            scatter: 6.0,
            color: ColorMode::default(),
        }
    }
}

impl EmitterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Builder pattern --

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_min_intensity(mut self, min_intensity: f32) -> Self {
        self.min_intensity = min_intensity;
        self
    }

    pub fn with_max_input_speed(mut self, speed: f32) -> Self {
        self.max_input_speed = speed;
        self
    }

    pub fn with_burst(mut self, count: u32, intensity: f32) -> Self {
        self.burst_count = count;
        self.burst_intensity = intensity;
        self
    }

    pub fn with_lifetime(mut self, lifetime: f32, jitter: f32) -> Self {
        self.lifetime = lifetime;
        self.lifetime_jitter = jitter;
        self
    }

    pub fn with_radius(mut self, radius: f32, jitter: f32) -> Self {
        self.radius = radius;
        self.radius_jitter = jitter;
        self
    }

    pub fn with_fade(mut self, fade: Easing, end_scale: f32) -> Self {
        self.fade = fade;
        self.end_scale = end_scale;
        self
    }

    pub fn with_spread(mut self, spread_speed: f32, inherit_velocity: f32) -> Self {
        self.spread_speed = spread_speed;
        self.inherit_velocity = inherit_velocity;
        self
    }

    pub fn with_scatter(mut self, scatter: f32) -> Self {
        self.scatter = scatter;
        self
    }

    pub fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_emitter() {
        let e = EmitterConfig::default();
        assert_eq!(e.rate, 90.0);
        assert!(e.min_intensity > 0.0);
        assert!(matches!(e.color, ColorMode::Cycle { .. }));
    }

    #[test]
    fn builder_pattern() {
        let e = EmitterConfig::new()
            .with_rate(50.0)
            .with_burst(16, 0.5)
            .with_lifetime(2.0, 0.0)
            .with_color(ColorMode::Fixed { color: Hsla::new(10.0, 1.0, 0.5, 1.0) });
        assert_eq!(e.rate, 50.0);
        assert_eq!(e.burst_count, 16);
        assert_eq!(e.burst_intensity, 0.5);
        assert_eq!(e.lifetime, 2.0);
        assert!(matches!(e.color, ColorMode::Fixed { .. }));
    }

    #[test]
    fn color_mode_json_shape() {
        let json = r#"{"mode":"palette","colors":[{"h":0.0,"s":1.0,"l":0.5,"a":1.0}]}"#;
        let mode: ColorMode = serde_json::from_str(json).unwrap();
        match mode {
            ColorMode::Palette { colors } => assert_eq!(colors.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }
}
