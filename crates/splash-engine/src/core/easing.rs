// core/easing.rs
//
// Fade curves for particle alpha and radius.
// Only curves that are monotonic on [0, 1] live here: a particle's look must
// never "un-fade" as it ages.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Easing function applied to a particle's life fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// Constant rate.
    Linear,
    /// Slow start.
    QuadIn,
    /// Slow end.
    #[default]
    QuadOut,
    /// Slow start and end.
    QuadInOut,
    /// Stronger slow start: particles stay bright, then vanish.
    CubicIn,
    /// Stronger slow end.
    CubicOut,
    SineInOut,
    ExpoOut,
}

impl Easing {
    /// Apply the curve to `t`, clamped to [0, 1]. Output is in [0, 1] and
    /// non-decreasing in `t`.
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadIn => t * t,
            Easing::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
            Easing::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            Easing::ExpoOut => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2.0_f32.powf(-10.0 * t)
                }
            }
        }
    }
}
