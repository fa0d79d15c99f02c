//! Engine configuration.
//!
//! `SplashConfig` is the complete, typed configuration. Hosts send partial
//! overrides (`PartialConfig`, usually JSON) which are merged field by field
//! onto the current config and then validated: out-of-range values are
//! clamped and every clamp is reported back.

use serde::{Deserialize, Serialize};

use crate::api::error::Result;
use crate::components::emitter::{ColorMode, EmitterConfig};
use crate::core::easing::Easing;
use crate::core::physics::{MotionConfig, MAX_JITTER};
use crate::input::tracker::TrackerConfig;
use crate::renderer::field::RenderConfig;
use crate::systems::dirty::DirtyRegionConfig;
use crate::systems::quality::{QualityConfig, QualityLevel};

/// Complete engine configuration. Deserializing it requires every field;
/// sparse documents go through [`PartialConfig`] and [`merge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplashConfig {
    /// Seed for every random stream in the engine.
    pub seed: u64,
    /// Hard particle budget. Quality tiers never exceed it.
    pub max_particles: usize,
    pub emitter: EmitterConfig,
    pub motion: MotionConfig,
    pub input: TrackerConfig,
    pub render: RenderConfig,
    pub regions: DirtyRegionConfig,
    pub quality: QualityConfig,
}

impl Default for SplashConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_0F_5A1A54,
            max_particles: 500,
            emitter: EmitterConfig::default(),
            motion: MotionConfig::default(),
            input: TrackerConfig::default(),
            render: RenderConfig::default(),
            regions: DirtyRegionConfig::default(),
            quality: QualityConfig::default(),
        }
    }
}

impl SplashConfig {
    /// Defaults overlaid with a JSON override document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(merge(&Self::default(), &PartialConfig::from_json(json)?))
    }
}

/// Declares a struct of optional fields mirroring a config section,
/// plus the overlay that copies present fields onto the full section.
macro_rules! partial_config {
    ($(#[$meta:meta])* $name:ident => $full:ty { $($field:ident: $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default, deny_unknown_fields)]
        pub struct $name {
            $(pub $field: Option<$ty>,)*
        }

        impl $name {
            /// Overlay every present field onto `base`.
            pub fn apply_to(&self, base: &mut $full) {
                $(
                    if let Some(value) = &self.$field {
                        base.$field = value.clone();
                    }
                )*
            }

            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())*
            }
        }
    };
}

partial_config!(PartialEmitterConfig => EmitterConfig {
    rate: f32,
    min_intensity: f32,
    max_input_speed: f32,
    burst_count: u32,
    burst_intensity: f32,
    lifetime: f32,
    lifetime_jitter: f32,
    radius: f32,
    radius_jitter: f32,
    end_scale: f32,
    fade: Easing,
    inherit_velocity: f32,
    spread_speed: f32,
    scatter: f32,
    color: ColorMode,
});

partial_config!(PartialMotionConfig => MotionConfig {
    gravity: glam::Vec2,
    drag: f32,
    reference_rate: f32,
    bounce: bool,
    bounce_damping: f32,
    wall_friction: f32,
    bounce_shrink: f32,
    jitter: f32,
});

partial_config!(PartialTrackerConfig => TrackerConfig {
    smoothing: f32,
    max_speed: f32,
});

partial_config!(PartialRenderConfig => RenderConfig {
    max_influence: f32,
    threshold_scale: f32,
    edge_softness: f32,
    glow: bool,
    glow_floor: f32,
    blur: bool,
    cell_size: f32,
});

partial_config!(PartialDirtyRegionConfig => DirtyRegionConfig {
    enabled: bool,
    max_regions: usize,
    merge_threshold: f32,
    min_size: f32,
    merge_distance: f32,
    full_redraw_ratio: f32,
    max_path_steps: u32,
});

partial_config!(PartialQualityConfig => QualityConfig {
    adaptive: bool,
    initial: QualityLevel,
    target_fps: f32,
    check_interval_ms: f64,
    cooldown_ms: f64,
    downgrade_ratio: f32,
    upgrade_ratio: f32,
    upgrade_checks: u32,
    max_dropped_ratio: f32,
    min_samples: usize,
});

/// Override document; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialConfig {
    pub seed: Option<u64>,
    pub max_particles: Option<usize>,
    pub emitter: PartialEmitterConfig,
    pub motion: PartialMotionConfig,
    pub input: PartialTrackerConfig,
    pub render: PartialRenderConfig,
    pub regions: PartialDirtyRegionConfig,
    pub quality: PartialQualityConfig,
}

impl PartialConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_empty(&self) -> bool {
        self.seed.is_none()
            && self.max_particles.is_none()
            && self.emitter.is_empty()
            && self.motion.is_empty()
            && self.input.is_empty()
            && self.render.is_empty()
            && self.regions.is_empty()
            && self.quality.is_empty()
    }
}

/// `base` with every field present in `overrides` replaced.
pub fn merge(base: &SplashConfig, overrides: &PartialConfig) -> SplashConfig {
    let mut out = base.clone();
    if let Some(seed) = overrides.seed {
        out.seed = seed;
    }
    if let Some(max) = overrides.max_particles {
        out.max_particles = max;
    }
    overrides.emitter.apply_to(&mut out.emitter);
    overrides.motion.apply_to(&mut out.motion);
    overrides.input.apply_to(&mut out.input);
    overrides.render.apply_to(&mut out.render);
    overrides.regions.apply_to(&mut out.regions);
    overrides.quality.apply_to(&mut out.quality);
    out
}

/// A value that was out of range and replaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClampedField {
    pub field: &'static str,
    pub requested: f64,
    pub applied: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub config: SplashConfig,
    pub clamped: Vec<ClampedField>,
}

#[derive(Default)]
struct Clamps(Vec<ClampedField>);

impl Clamps {
    fn record(&mut self, field: &'static str, requested: f64, applied: f64) {
        log::debug!("config: {} = {} out of range, using {}", field, requested, applied);
        self.0.push(ClampedField {
            field,
            requested,
            applied,
        });
    }

    fn f32(&mut self, field: &'static str, value: &mut f32, lo: f32, hi: f32) {
        let requested = *value;
        let applied = if requested.is_nan() { lo } else { requested.clamp(lo, hi) };
        if requested.is_nan() || applied != requested {
            *value = applied;
            self.record(field, requested as f64, applied as f64);
        }
    }

    fn f64(&mut self, field: &'static str, value: &mut f64, lo: f64, hi: f64) {
        let requested = *value;
        let applied = if requested.is_nan() { lo } else { requested.clamp(lo, hi) };
        if requested.is_nan() || applied != requested {
            *value = applied;
            self.record(field, requested, applied);
        }
    }

    fn u32(&mut self, field: &'static str, value: &mut u32, lo: u32, hi: u32) {
        let requested = *value;
        let applied = requested.clamp(lo, hi);
        if applied != requested {
            *value = applied;
            self.record(field, requested as f64, applied as f64);
        }
    }

    fn usize(&mut self, field: &'static str, value: &mut usize, lo: usize, hi: usize) {
        let requested = *value;
        let applied = requested.clamp(lo, hi);
        if applied != requested {
            *value = applied;
            self.record(field, requested as f64, applied as f64);
        }
    }
}

/// Clamp every numeric field into its supported range.
pub fn validate(mut config: SplashConfig) -> Validated {
    let mut c = Clamps::default();

    c.usize("max_particles", &mut config.max_particles, 1, 10_000);

    let e = &mut config.emitter;
    c.f32("emitter.rate", &mut e.rate, 0.0, 5_000.0);
    c.f32("emitter.min_intensity", &mut e.min_intensity, 0.0, 1.0);
    c.f32("emitter.max_input_speed", &mut e.max_input_speed, 1.0, 100_000.0);
    c.u32("emitter.burst_count", &mut e.burst_count, 0, 1_000);
    c.f32("emitter.burst_intensity", &mut e.burst_intensity, 0.0, 1.0);
    c.f32("emitter.lifetime", &mut e.lifetime, 0.05, 30.0);
    c.f32("emitter.lifetime_jitter", &mut e.lifetime_jitter, 0.0, 0.95);
    c.f32("emitter.radius", &mut e.radius, 1.0, 200.0);
    c.f32("emitter.radius_jitter", &mut e.radius_jitter, 0.0, 0.95);
    c.f32("emitter.end_scale", &mut e.end_scale, 0.0, 1.0);
    c.f32("emitter.inherit_velocity", &mut e.inherit_velocity, 0.0, 2.0);
    c.f32("emitter.spread_speed", &mut e.spread_speed, 0.0, 5_000.0);
    c.f32("emitter.scatter", &mut e.scatter, 0.0, 500.0);

    let m = &mut config.motion;
    c.f32("motion.gravity.x", &mut m.gravity.x, -10_000.0, 10_000.0);
    c.f32("motion.gravity.y", &mut m.gravity.y, -10_000.0, 10_000.0);
    c.f32("motion.drag", &mut m.drag, 0.0, 1.0);
    c.f32("motion.reference_rate", &mut m.reference_rate, 1.0, 1_000.0);
    c.f32("motion.bounce_damping", &mut m.bounce_damping, 0.0, 1.0);
    c.f32("motion.wall_friction", &mut m.wall_friction, 0.0, 1.0);
    c.f32("motion.bounce_shrink", &mut m.bounce_shrink, 0.0, 1.0);
    c.f32("motion.jitter", &mut m.jitter, 0.0, MAX_JITTER);

    let i = &mut config.input;
    c.f32("input.smoothing", &mut i.smoothing, 0.0, 0.99);
    c.f32("input.max_speed", &mut i.max_speed, 0.0, 100_000.0);

    let r = &mut config.render;
    c.f32("render.max_influence", &mut r.max_influence, 1.0, 1_024.0);
    c.f32("render.threshold_scale", &mut r.threshold_scale, 0.05, 20.0);
    c.f32("render.edge_softness", &mut r.edge_softness, 0.01, 10.0);
    c.f32("render.glow_floor", &mut r.glow_floor, 0.05, 0.95);
    c.f32("render.cell_size", &mut r.cell_size, 4.0, 512.0);

    let d = &mut config.regions;
    c.usize("regions.max_regions", &mut d.max_regions, 1, 256);
    c.f32("regions.merge_threshold", &mut d.merge_threshold, 1.0, 4.0);
    c.f32("regions.min_size", &mut d.min_size, 1.0, 512.0);
    c.f32("regions.merge_distance", &mut d.merge_distance, 0.0, 512.0);
    c.f32("regions.full_redraw_ratio", &mut d.full_redraw_ratio, 0.0, 1.0);
    c.u32("regions.max_path_steps", &mut d.max_path_steps, 1, 64);

    let q = &mut config.quality;
    c.f32("quality.target_fps", &mut q.target_fps, 1.0, 240.0);
    c.f64("quality.check_interval_ms", &mut q.check_interval_ms, 100.0, 60_000.0);
    c.f64("quality.cooldown_ms", &mut q.cooldown_ms, 0.0, 600_000.0);
    c.f32("quality.downgrade_ratio", &mut q.downgrade_ratio, 0.0, 1.0);
    let floor = q.downgrade_ratio;
    c.f32("quality.upgrade_ratio", &mut q.upgrade_ratio, floor, 1.0);
    c.u32("quality.upgrade_checks", &mut q.upgrade_checks, 1, 100);
    c.f32("quality.max_dropped_ratio", &mut q.max_dropped_ratio, 0.0, 1.0);
    c.usize("quality.min_samples", &mut q.min_samples, 1, 10_000);

    Validated {
        config,
        clamped: c.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn defaults_are_valid() {
        let v = validate(SplashConfig::default());
        assert!(v.clamped.is_empty(), "{:?}", v.clamped);
        assert_eq!(v.config, SplashConfig::default());
    }

    #[test]
    fn merge_overrides_only_present_fields() {
        let partial = PartialConfig::from_json(
            r#"{"max_particles": 200, "emitter": {"rate": 10.0}, "motion": {"gravity": [0.0, -50.0]}, "quality": {"initial": "low"}}"#,
        )
        .unwrap();
        let base = SplashConfig::default();
        let merged = merge(&base, &partial);
        assert_eq!(merged.max_particles, 200);
        assert_eq!(merged.emitter.rate, 10.0);
        assert_eq!(merged.emitter.lifetime, base.emitter.lifetime);
        assert_eq!(merged.motion.gravity, Vec2::new(0.0, -50.0));
        assert_eq!(merged.motion.drag, base.motion.drag);
        assert_eq!(merged.quality.initial, QualityLevel::Low);
    }

    #[test]
    fn empty_override_is_identity() {
        let partial = PartialConfig::from_json("{}").unwrap();
        assert!(partial.is_empty());
        let base = SplashConfig::default();
        assert_eq!(merge(&base, &partial), base);
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = PartialConfig::from_json(r#"{"emitter": {"rat": 5}}"#).unwrap_err();
        assert!(matches!(err, crate::api::error::SplashError::ConfigParse(_)));
    }

    #[test]
    fn out_of_range_values_are_clamped_and_reported() {
        let mut config = SplashConfig::default();
        config.emitter.rate = -5.0;
        config.motion.drag = 1.5;
        config.motion.jitter = f32::NAN;
        config.regions.max_regions = 0;
        let v = validate(config);
        assert_eq!(v.config.emitter.rate, 0.0);
        assert_eq!(v.config.motion.drag, 1.0);
        assert_eq!(v.config.motion.jitter, 0.0);
        assert_eq!(v.config.regions.max_regions, 1);
        let fields: Vec<_> = v.clamped.iter().map(|c| c.field).collect();
        assert_eq!(
            fields,
            vec!["emitter.rate", "motion.drag", "motion.jitter", "regions.max_regions"]
        );
        assert_eq!(v.clamped[0].requested, -5.0);
    }

    #[test]
    fn upgrade_ratio_not_below_downgrade() {
        let mut config = SplashConfig::default();
        config.quality.downgrade_ratio = 0.8;
        config.quality.upgrade_ratio = 0.5;
        let v = validate(config);
        assert_eq!(v.config.quality.upgrade_ratio, 0.8);
    }

    #[test]
    fn full_config_round_trips_through_json() {
        let json = serde_json::to_string(&SplashConfig::default()).unwrap();
        assert_eq!(SplashConfig::from_json(&json).unwrap(), SplashConfig::default());
        let direct: SplashConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(direct, SplashConfig::default());
    }

    #[test]
    fn full_config_requires_every_field() {
        assert!(serde_json::from_str::<SplashConfig>(r#"{"seed": 1}"#).is_err());

        let mut doc = serde_json::to_value(SplashConfig::default()).unwrap();
        doc["motion"].as_object_mut().unwrap().remove("drag");
        assert!(serde_json::from_value::<SplashConfig>(doc).is_err());

        // The same sparse document is a valid override.
        let merged = SplashConfig::from_json(r#"{"seed": 1}"#).unwrap();
        assert_eq!(merged.seed, 1);
        assert_eq!(merged.motion, SplashConfig::default().motion);
    }
}
