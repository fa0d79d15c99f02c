//! Geometry and color primitives shared by every system.
//!
//! Vectors are `glam::Vec2`; this module adds the axis-aligned `Rect` used by
//! the dirty-region tracker and the renderer, and the HSLA color particles carry.

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Hermite smoothstep between `edge0` and `edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x >= edge1 { 1.0 } else { 0.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Axis-aligned rectangle in surface pixels.
/// `min` is inclusive, `max` exclusive. A rect with `max <= min` on either axis is empty.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            min: Vec2::new(x0, y0),
            max: Vec2::new(x1, y1),
        }
    }

    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Square of half-extent `radius` centered on `center`.
    pub fn around(center: Vec2, radius: f32) -> Self {
        let r = Vec2::splat(radius);
        Self {
            min: center - r,
            max: center + r,
        }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    /// True when the interiors overlap (shared edges do not count).
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let r = Rect {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        };
        if r.is_empty() {
            None
        } else {
            Some(r)
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn expand(&self, amount: f32) -> Rect {
        let a = Vec2::splat(amount);
        Rect {
            min: self.min - a,
            max: self.max + a,
        }
    }

    /// Grow around the center until both sides are at least `min_size`.
    pub fn with_min_size(&self, min_size: f32) -> Rect {
        let size = Vec2::new(self.width(), self.height()).max(Vec2::splat(min_size));
        let half = size * 0.5;
        let c = self.center();
        Rect {
            min: c - half,
            max: c + half,
        }
    }

    /// Squared distance from `p` to the closest point of the rect (0 inside).
    pub fn distance_sq_to(&self, p: Vec2) -> f32 {
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dy = (self.min.y - p.y).max(0.0).max(p.y - self.max.y);
        dx * dx + dy * dy
    }

    /// Largest axis gap between two rects (0 when they touch or overlap).
    pub fn gap_to(&self, other: &Rect) -> f32 {
        let gx = (other.min.x - self.max.x).max(self.min.x - other.max.x).max(0.0);
        let gy = (other.min.y - self.max.y).max(self.min.y - other.max.y).max(0.0);
        gx.max(gy)
    }

    /// Snap outward to whole pixels.
    pub fn snapped(&self) -> Rect {
        Rect {
            min: self.min.floor(),
            max: self.max.ceil(),
        }
    }
}

/// Hue in degrees, saturation/lightness/alpha in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsla {
    pub h: f32,
    pub s: f32,
    pub l: f32,
    pub a: f32,
}

impl Hsla {
    pub const fn new(h: f32, s: f32, l: f32, a: f32) -> Self {
        Self { h, s, l, a }
    }

    pub fn with_alpha(mut self, a: f32) -> Self {
        self.a = a;
        self
    }

    pub fn shifted(mut self, degrees: f32) -> Self {
        self.h = (self.h + degrees).rem_euclid(360.0);
        self
    }

    /// RGB channels in [0, 1]; alpha is not applied.
    pub fn to_rgb(&self) -> [f32; 3] {
        let s = self.s.clamp(0.0, 1.0);
        let l = self.l.clamp(0.0, 1.0);
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let h = self.h.rem_euclid(360.0) / 60.0;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c * 0.5;
        [r + m, g + m, b + m]
    }
}

impl Default for Hsla {
    fn default() -> Self {
        Self::new(200.0, 0.85, 0.6, 1.0)
    }
}
