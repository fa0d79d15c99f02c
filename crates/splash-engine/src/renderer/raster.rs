use bytemuck::{Pod, Zeroable};

use crate::core::math::Rect;

/// One straight-alpha RGBA8 pixel, laid out as the 2D canvas expects.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Rgba8 = Rgba8 { r: 0, g: 0, b: 0, a: 0 };

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Quantize unit-range channels.
    pub fn from_unit(rgba: [f32; 4]) -> Self {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        Self::new(q(rgba[0]), q(rgba[1]), q(rgba[2]), q(rgba[3]))
    }

    pub fn to_unit(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

/// Integer pixel range `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSpan {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelSpan {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

/// CPU pixel buffer the field renderer writes into.
#[derive(Debug, Clone)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba8>,
}

impl RasterBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba8::TRANSPARENT; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width as f32, self.height as f32)
    }

    /// Reallocate for a new size; contents become transparent.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels
            .resize(width as usize * height as usize, Rgba8::TRANSPARENT);
    }

    pub fn clear(&mut self) {
        self.pixels.fill(Rgba8::TRANSPARENT);
    }

    /// Pixels covered by `rect`, clamped to the buffer. `None` when nothing is covered.
    pub fn pixel_span(&self, rect: &Rect) -> Option<PixelSpan> {
        if !rect.is_finite() {
            return None;
        }
        let r = rect.snapped().intersection(&self.bounds())?;
        let span = PixelSpan {
            x0: r.min.x as u32,
            y0: r.min.y as u32,
            x1: (r.max.x as u32).min(self.width),
            y1: (r.max.y as u32).min(self.height),
        };
        if span.x1 > span.x0 && span.y1 > span.y0 {
            Some(span)
        } else {
            None
        }
    }

    pub fn full_span(&self) -> Option<PixelSpan> {
        self.pixel_span(&self.bounds())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y * self.width + x) as usize])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, value: Rgba8) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = value;
        }
    }

    pub fn row(&self, y: u32) -> &[Rgba8] {
        let start = (y * self.width) as usize;
        &self.pixels[start..start + self.width as usize]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [Rgba8] {
        let start = (y * self.width) as usize;
        &mut self.pixels[start..start + self.width as usize]
    }

    pub fn pixels(&self) -> &[Rgba8] {
        &self.pixels
    }

    /// Raw RGBA bytes, row-major, ready for a canvas `ImageData`.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_transparent() {
        let buf = RasterBuffer::new(4, 3);
        assert_eq!(buf.as_bytes().len(), 4 * 3 * 4);
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn set_and_get() {
        let mut buf = RasterBuffer::new(4, 4);
        buf.set_pixel(2, 1, Rgba8::new(1, 2, 3, 4));
        assert_eq!(buf.pixel(2, 1), Some(Rgba8::new(1, 2, 3, 4)));
        assert_eq!(buf.as_bytes()[(4 + 2) * 4..(4 + 2) * 4 + 4], [1, 2, 3, 4]);
        assert_eq!(buf.pixel(9, 9), None);
        buf.set_pixel(9, 9, Rgba8::new(1, 1, 1, 1));
    }

    #[test]
    fn pixel_span_clamps_and_snaps() {
        let buf = RasterBuffer::new(100, 50);
        let span = buf.pixel_span(&Rect::new(-5.0, 10.2, 20.5, 80.0)).unwrap();
        assert_eq!(span, PixelSpan { x0: 0, y0: 10, x1: 21, y1: 50 });
        assert!(buf.pixel_span(&Rect::new(200.0, 0.0, 300.0, 10.0)).is_none());
        assert!(RasterBuffer::new(0, 0).full_span().is_none());
    }

    #[test]
    fn unit_quantization_round_trips_extremes() {
        assert_eq!(Rgba8::from_unit([0.0, 1.0, 2.0, -1.0]), Rgba8::new(0, 255, 255, 0));
        assert_eq!(Rgba8::new(255, 0, 0, 255).to_unit(), [1.0, 0.0, 0.0, 1.0]);
    }
}
