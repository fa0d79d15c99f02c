use super::raster::{PixelSpan, RasterBuffer, Rgba8};

/// Separable box blur applied in place to pixel spans.
/// Works on premultiplied color so transparent pixels do not darken edges.
#[derive(Debug, Clone, Default)]
pub struct BoxBlur {
    horizontal: Vec<[f32; 4]>,
}

fn premultiplied(p: Rgba8) -> [f32; 4] {
    let [r, g, b, a] = p.to_unit();
    [r * a, g * a, b * a, a]
}

fn straight(c: [f32; 4]) -> Rgba8 {
    let a = c[3];
    if a <= 1.0 / 512.0 {
        return Rgba8::TRANSPARENT;
    }
    Rgba8::from_unit([c[0] / a, c[1] / a, c[2] / a, a])
}

impl BoxBlur {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blur `span` with a `(2 * radius + 1)` box. Pixels outside the span are read, never written.
    pub fn apply(&mut self, raster: &mut RasterBuffer, span: PixelSpan, radius: u32) {
        if radius == 0 || raster.is_empty() {
            return;
        }
        let (w, h) = (raster.width(), raster.height());
        let ry0 = span.y0.saturating_sub(radius);
        let ry1 = (span.y1 + radius).min(h);
        let cols = span.width() as usize;

        self.horizontal.clear();
        self.horizontal.resize(cols * (ry1 - ry0) as usize, [0.0; 4]);
        for (ri, y) in (ry0..ry1).enumerate() {
            let row = raster.row(y);
            for (ci, x) in (span.x0..span.x1).enumerate() {
                let lo = x.saturating_sub(radius);
                let hi = (x + radius).min(w - 1);
                let mut acc = [0.0f32; 4];
                for p in &row[lo as usize..=hi as usize] {
                    let c = premultiplied(*p);
                    for k in 0..4 {
                        acc[k] += c[k];
                    }
                }
                let n = (hi - lo + 1) as f32;
                self.horizontal[ri * cols + ci] = acc.map(|v| v / n);
            }
        }

        for y in span.y0..span.y1 {
            let lo = y.saturating_sub(radius).max(ry0);
            let hi = (y + radius).min(ry1 - 1);
            let n = (hi - lo + 1) as f32;
            let row = raster.row_mut(y);
            for ci in 0..cols {
                let mut acc = [0.0f32; 4];
                for ri in (lo - ry0)..=(hi - ry0) {
                    let c = self.horizontal[ri as usize * cols + ci];
                    for k in 0..4 {
                        acc[k] += c[k];
                    }
                }
                row[span.x0 as usize + ci] = straight(acc.map(|v| v / n));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(x0: u32, y0: u32, x1: u32, y1: u32) -> PixelSpan {
        PixelSpan { x0, y0, x1, y1 }
    }

    #[test]
    fn zero_radius_is_noop() {
        let mut raster = RasterBuffer::new(4, 4);
        raster.set_pixel(1, 1, Rgba8::new(255, 0, 0, 255));
        let before = raster.clone();
        BoxBlur::new().apply(&mut raster, span(0, 0, 4, 4), 0);
        assert_eq!(raster.as_bytes(), before.as_bytes());
    }

    #[test]
    fn spreads_alpha_without_darkening() {
        let mut raster = RasterBuffer::new(5, 5);
        raster.set_pixel(2, 2, Rgba8::new(255, 0, 0, 255));
        BoxBlur::new().apply(&mut raster, span(0, 0, 5, 5), 1);
        let center = raster.pixel(2, 2).unwrap();
        let side = raster.pixel(1, 2).unwrap();
        assert!(center.a < 255 && center.a > 0);
        assert!(side.a > 0);
        // Color stays pure red where any coverage exists.
        assert_eq!((side.r, side.g, side.b), (255, 0, 0));
        assert_eq!(raster.pixel(0, 0), Some(Rgba8::new(0, 0, 0, 0)));
    }

    #[test]
    fn writes_only_inside_span() {
        let mut raster = RasterBuffer::new(6, 6);
        for y in 0..6 {
            for x in 0..6 {
                raster.set_pixel(x, y, Rgba8::new(0, 0, 255, if x == 3 { 255 } else { 0 }));
            }
        }
        let before = raster.clone();
        BoxBlur::new().apply(&mut raster, span(0, 0, 2, 6), 1);
        for y in 0..6 {
            for x in 2..6 {
                assert_eq!(raster.pixel(x, y), before.pixel(x, y));
            }
        }
    }
}
