//! Per-sample color blending and edge coverage.

use crate::components::particle::ParticleSnapshot;
use crate::core::math::smoothstep;

/// Share of the additive term mixed into the weighted average.
const ADDITIVE_MIX: f32 = 0.25;
const SATURATION: f32 = 1.12;
const CONTRAST: f32 = 1.06;

/// Opacity right at the threshold crossing.
const EDGE_ALPHA: f32 = 0.6;
/// Peak opacity of the glow band; stays below `EDGE_ALPHA`.
const GLOW_ALPHA: f32 = 0.35;

/// How colors of overlapping particles are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendQuality {
    /// Influence-weighted blend with an additive term and touch-up.
    #[default]
    Full,
    /// The single most influential particle's color.
    Basic,
}

/// Running totals for one field sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleAccumulator {
    field: f32,
    count: u32,
    weight_sum: f32,
    /// RGB and alpha weighted by influence squared.
    weighted: [f32; 4],
    additive: [f32; 3],
    dominant: f32,
    dominant_rgba: [f32; 4],
}

impl SampleAccumulator {
    #[inline]
    pub fn add(&mut self, influence: f32, s: &ParticleSnapshot) {
        self.field += influence;
        self.count += 1;

        let w = influence * influence;
        self.weight_sum += w;
        self.weighted[0] += s.r * w;
        self.weighted[1] += s.g * w;
        self.weighted[2] += s.b * w;
        self.weighted[3] += s.alpha * w;

        let k = influence.min(1.0);
        self.additive[0] += s.r * k;
        self.additive[1] += s.g * k;
        self.additive[2] += s.b * k;

        if influence > self.dominant {
            self.dominant = influence;
            self.dominant_rgba = [s.r, s.g, s.b, s.alpha];
        }
    }

    #[inline]
    pub fn field(&self) -> f32 {
        self.field
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Straight-alpha RGBA in [0, 1]. Transparent black when nothing contributed.
    pub fn resolve(&self, quality: BlendQuality) -> [f32; 4] {
        if self.count == 0 {
            return [0.0; 4];
        }
        if self.count == 1 || quality == BlendQuality::Basic || self.weight_sum <= f32::MIN_POSITIVE {
            return self.dominant_rgba;
        }
        let inv = 1.0 / self.weight_sum;
        let mut rgb = [0.0; 3];
        for c in 0..3 {
            let avg = self.weighted[c] * inv;
            let add = self.additive[c].min(1.0);
            rgb[c] = avg * (1.0 - ADDITIVE_MIX) + add * ADDITIVE_MIX;
        }
        let [r, g, b] = touch_up(rgb);
        [r, g, b, (self.weighted[3] * inv).clamp(0.0, 1.0)]
    }
}

/// Slight saturation and contrast lift, clamped to [0, 1].
fn touch_up(rgb: [f32; 3]) -> [f32; 3] {
    let luma = 0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2];
    rgb.map(|c| {
        let saturated = luma + (c - luma) * SATURATION;
        ((saturated - 0.5) * CONTRAST + 0.5).clamp(0.0, 1.0)
    })
}

/// Opacity of a sample with the given field value.
///
/// At or above `threshold` the sample is inside a blob and ramps from
/// `EDGE_ALPHA` to opaque over `softness * threshold`. With a glow floor,
/// values between `floor * threshold` and `threshold` get a faint halo.
pub fn coverage(field: f32, threshold: f32, softness: f32, glow_floor: Option<f32>) -> f32 {
    if !(threshold > 0.0) || !(field > 0.0) {
        return 0.0;
    }
    if field >= threshold {
        let ramp = threshold * softness.max(1e-3);
        let t = ((field - threshold) / ramp).min(1.0);
        return EDGE_ALPHA + (1.0 - EDGE_ALPHA) * smoothstep(0.0, 1.0, t);
    }
    match glow_floor {
        Some(floor) => {
            let start = threshold * floor;
            if field > start {
                GLOW_ALPHA * smoothstep(start, threshold, field)
            } else {
                0.0
            }
        }
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(rgb: [f32; 3], alpha: f32) -> ParticleSnapshot {
        ParticleSnapshot {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            alpha,
            radius_sq: 100.0,
            cutoff: 30.0,
            ..ParticleSnapshot::default()
        }
    }

    #[test]
    fn empty_is_transparent() {
        assert_eq!(SampleAccumulator::default().resolve(BlendQuality::Full), [0.0; 4]);
    }

    #[test]
    fn single_particle_keeps_its_color() {
        let mut acc = SampleAccumulator::default();
        acc.add(2.0, &snap([0.2, 0.4, 0.6], 0.8));
        assert_eq!(acc.resolve(BlendQuality::Full), [0.2, 0.4, 0.6, 0.8]);
    }

    #[test]
    fn stronger_particle_dominates_blend() {
        let mut acc = SampleAccumulator::default();
        acc.add(3.0, &snap([1.0, 0.0, 0.0], 1.0));
        acc.add(1.0, &snap([0.0, 0.0, 1.0], 1.0));
        let [r, _, b, _] = acc.resolve(BlendQuality::Full);
        assert!(r > b);
        assert!(b > 0.0, "weaker color still shows");
    }

    #[test]
    fn basic_uses_dominant() {
        let mut acc = SampleAccumulator::default();
        acc.add(1.0, &snap([0.0, 0.0, 1.0], 0.5));
        acc.add(3.0, &snap([1.0, 0.0, 0.0], 0.9));
        assert_eq!(acc.resolve(BlendQuality::Basic), [1.0, 0.0, 0.0, 0.9]);
    }

    #[test]
    fn blend_stays_in_range() {
        let mut acc = SampleAccumulator::default();
        for _ in 0..20 {
            acc.add(5.0, &snap([1.0, 1.0, 1.0], 1.0));
        }
        assert!(acc.resolve(BlendQuality::Full).iter().all(|c| (0.0..=1.0).contains(c)));
    }

    #[test]
    fn coverage_bands() {
        assert_eq!(coverage(0.0, 1.0, 0.5, Some(0.5)), 0.0);
        assert_eq!(coverage(0.4, 1.0, 0.5, Some(0.5)), 0.0);
        let glow = coverage(0.8, 1.0, 0.5, Some(0.5));
        assert!(glow > 0.0 && glow < EDGE_ALPHA);
        assert_eq!(coverage(0.8, 1.0, 0.5, None), 0.0);
        assert_eq!(coverage(1.0, 1.0, 0.5, None), EDGE_ALPHA);
        assert_eq!(coverage(10.0, 1.0, 0.5, None), 1.0);
    }

    #[test]
    fn coverage_is_monotonic() {
        let mut prev = 0.0;
        for i in 0..400 {
            let c = coverage(i as f32 * 0.01, 1.0, 0.6, Some(0.6));
            assert!(c + 1e-6 >= prev);
            prev = c;
        }
    }
}
