//! RGBA frame buffer with simple line / point rasterization.
//!
//! The viewer uploads this buffer as a texture and the recorder copies it,
//! so both always see the same pixels.

use rayon::prelude::*;

use crate::layout::Rgba;

#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            pixels: vec![0u8; width * height * 4],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        let (width, height) = (width.max(1), height.max(1));
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.pixels = vec![0u8; width * height * 4];
        }
    }

    /// Fill every row with `row_color(py)`, rows in parallel.
    pub fn clear_rows(&mut self, row_color: impl Fn(usize) -> Rgba + Sync) {
        let row_size = self.width * 4;
        self.pixels
            .par_chunks_exact_mut(row_size)
            .enumerate()
            .for_each(|(py, row_buf)| {
                let c = row_color(py);
                for px in row_buf.chunks_exact_mut(4) {
                    px.copy_from_slice(&[c.r, c.g, c.b, c.a]);
                }
            });
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some(Rgba {
            r: self.pixels[i],
            g: self.pixels[i + 1],
            b: self.pixels[i + 2],
            a: self.pixels[i + 3],
        })
    }

    #[inline]
    pub fn put(&mut self, x: i64, y: i64, c: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = (y as usize * self.width + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&[c.r, c.g, c.b, c.a]);
    }

    /// Bresenham line, clipped per pixel.
    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), c: Rgba) {
        if !(from.0.is_finite() && from.1.is_finite() && to.0.is_finite() && to.1.is_finite()) {
            return;
        }
        // skip lines that are absurdly far off screen
        let limit = 4.0 * (self.width + self.height) as f32;
        if from.0.abs().max(from.1.abs()).max(to.0.abs()).max(to.1.abs()) > limit {
            return;
        }
        let (mut x0, mut y0) = (from.0.round() as i64, from.1.round() as i64);
        let (x1, y1) = (to.0.round() as i64, to.1.round() as i64);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put(x0, y0, c);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    pub fn thick_line(&mut self, from: (f32, f32), to: (f32, f32), c: Rgba) {
        for (ox, oy) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)] {
            self.line((from.0 + ox, from.1 + oy), (to.0 + ox, to.1 + oy), c);
        }
    }

    /// Filled disc.
    pub fn disc(&mut self, center: (f32, f32), radius: f32, c: Rgba) {
        if !(center.0.is_finite() && center.1.is_finite()) {
            return;
        }
        let r = radius.max(0.5);
        let r2 = r * r;
        let (cx, cy) = (center.0.round() as i64, center.1.round() as i64);
        let ri = r.ceil() as i64;
        for dy in -ri..=ri {
            for dx in -ri..=ri {
                if (dx * dx + dy * dy) as f32 <= r2 {
                    self.put(cx + dx, cy + dy, c);
                }
            }
        }
    }

    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width as u32, self.height as u32, self.pixels.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_fills_each_row() {
        let mut fb = FrameBuffer::new(4, 3);
        fb.clear_rows(|py| Rgba::rgb(py as u8, 0, 0));
        assert_eq!(fb.get(3, 2), Some(Rgba::rgb(2, 0, 0)));
        assert_eq!(fb.get(0, 0), Some(Rgba::rgb(0, 0, 0)));
    }

    #[test]
    fn line_hits_both_ends_and_clips() {
        let mut fb = FrameBuffer::new(10, 10);
        fb.line((1.0, 1.0), (8.0, 5.0), Rgba::WHITE);
        assert_eq!(fb.get(1, 1), Some(Rgba::WHITE));
        assert_eq!(fb.get(8, 5), Some(Rgba::WHITE));
        // partly off screen must not panic
        fb.line((-5.0, -5.0), (15.0, 15.0), Rgba::WHITE);
        assert_eq!(fb.get(9, 9), Some(Rgba::WHITE));
    }

    #[test]
    fn image_export_keeps_size() {
        let fb = FrameBuffer::new(7, 5);
        let img = fb.to_rgba_image().unwrap();
        assert_eq!(img.dimensions(), (7, 5));
    }
}
