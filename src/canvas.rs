// ============================================================================
// SURFACE — scaled offscreen bitmap that all compositing draws into
// ============================================================================
//
// Callers speak logical units (the 1x layout); the surface multiplies every
// coordinate by its scale, so a 2x export needs no changes to layout code.

use std::fmt;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Largest edge we are willing to allocate, in device pixels.
pub const MAX_SURFACE_EDGE: u32 = 16_384;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
}

impl BlendMode {
    /// Source-over composite of `top` onto `base` using this mode.
    pub fn blend_pixel(self, base: Rgba<u8>, top: Rgba<u8>, opacity: f32) -> Rgba<u8> {
        // Fast path: fully transparent top pixel
        if top[3] == 0 {
            return base;
        }

        // Fast path: Normal blend, full opacity, fully opaque top pixel
        if matches!(self, BlendMode::Normal) && opacity >= 1.0 && top[3] == 255 {
            return top;
        }

        let opacity = opacity.clamp(0.0, 1.0);

        let base_r = base[0] as f32 / 255.0;
        let base_g = base[1] as f32 / 255.0;
        let base_b = base[2] as f32 / 255.0;
        let base_a = base[3] as f32 / 255.0;

        let top_r = top[0] as f32 / 255.0;
        let top_g = top[1] as f32 / 255.0;
        let top_b = top[2] as f32 / 255.0;
        let top_a = (top[3] as f32 / 255.0) * opacity;

        let (r, g, b) = match self {
            BlendMode::Normal => (top_r, top_g, top_b),
            BlendMode::Multiply => (base_r * top_r, base_g * top_g, base_b * top_b),
        };

        let out_a = top_a + base_a * (1.0 - top_a);
        if out_a == 0.0 {
            return Rgba([0, 0, 0, 0]);
        }

        let out_r = (r * top_a + base_r * base_a * (1.0 - top_a)) / out_a;
        let out_g = (g * top_a + base_g * base_a * (1.0 - top_a)) / out_a;
        let out_b = (b * top_a + base_b * base_a * (1.0 - top_a)) / out_a;

        Rgba([
            (out_r * 255.0).round().clamp(0.0, 255.0) as u8,
            (out_g * 255.0).round().clamp(0.0, 255.0) as u8,
            (out_b * 255.0).round().clamp(0.0, 255.0) as u8,
            (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
        ])
    }
}

/// Axis-aligned rectangle in logical units.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Shrink by `d` on every side.
    pub fn inset(&self, d: f32) -> Self {
        Self::new(self.x + d, self.y + d, (self.w - 2.0 * d).max(0.0), (self.h - 2.0 * d).max(0.0))
    }
}

/// Allocation failure for a [`Surface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    InvalidSize { width: u32, height: u32 },
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::InvalidSize { width, height } => write!(
                f,
                "cannot allocate a {}x{} bitmap (limit {} per edge)",
                width, height, MAX_SURFACE_EDGE
            ),
        }
    }
}

impl std::error::Error for SurfaceError {}

pub struct Surface {
    image: RgbaImage,
    scale: f32,
}

impl Surface {
    /// Allocate a transparent surface for a `logical_w` × `logical_h` layout.
    pub fn new(logical_w: f32, logical_h: f32, scale: f32) -> Result<Self, SurfaceError> {
        let width = (logical_w * scale).ceil().max(0.0) as u32;
        let height = (logical_h * scale).ceil().max(0.0) as u32;
        if width == 0 || height == 0 || width > MAX_SURFACE_EDGE || height > MAX_SURFACE_EDGE || !scale.is_finite() {
            return Err(SurfaceError::InvalidSize { width, height });
        }
        Ok(Self {
            image: RgbaImage::new(width, height),
            scale,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Map a logical rect to clamped device pixel bounds `(x0, y0, x1, y1)`.
    pub fn device_bounds(&self, rect: Rect) -> (u32, u32, u32, u32) {
        let s = self.scale;
        let clamp_x = |v: f32| (v * s).round().clamp(0.0, self.width() as f32) as u32;
        let clamp_y = |v: f32| (v * s).round().clamp(0.0, self.height() as f32) as u32;
        (clamp_x(rect.x), clamp_y(rect.y), clamp_x(rect.right()), clamp_y(rect.bottom()))
    }

    /// Overwrite every pixel.
    pub fn clear(&mut self, color: Rgba<u8>) {
        self.image.pixels_mut().for_each(|p| *p = color);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>) {
        let (x0, y0, x1, y1) = self.device_bounds(rect);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let row_bytes = self.width() as usize * 4;
        let raw: &mut [u8] = &mut self.image;
        raw.par_chunks_mut(row_bytes)
            .enumerate()
            .skip(y0 as usize)
            .take((y1 - y0) as usize)
            .for_each(|(_, row)| {
                for x in x0 as usize..x1 as usize {
                    let px = &mut row[x * 4..x * 4 + 4];
                    let base = Rgba([px[0], px[1], px[2], px[3]]);
                    let out = BlendMode::Normal.blend_pixel(base, color, 1.0);
                    px.copy_from_slice(&out.0);
                }
            });
    }

    /// Border drawn inside `rect`, CSS border-box style.
    pub fn stroke_rect(&mut self, rect: Rect, thickness: f32, color: Rgba<u8>) {
        let t = thickness.min(rect.w * 0.5).min(rect.h * 0.5);
        self.fill_rect(Rect::new(rect.x, rect.y, rect.w, t), color);
        self.fill_rect(Rect::new(rect.x, rect.bottom() - t, rect.w, t), color);
        self.fill_rect(Rect::new(rect.x, rect.y + t, t, rect.h - 2.0 * t), color);
        self.fill_rect(Rect::new(rect.right() - t, rect.y + t, t, rect.h - 2.0 * t), color);
    }

    /// Stretch `src` over `dest` and composite it with `mode`.
    pub fn draw_image(&mut self, src: &RgbaImage, dest: Rect, mode: BlendMode) {
        let (x0, y0, x1, y1) = self.device_bounds(dest);
        if x0 >= x1 || y0 >= y1 || src.width() == 0 || src.height() == 0 {
            return;
        }
        let (w, h) = (x1 - x0, y1 - y0);
        let resized;
        let src = if src.width() == w && src.height() == h {
            src
        } else {
            resized = imageops::resize(src, w, h, FilterType::Triangle);
            &resized
        };
        self.blend_buffer(src.as_raw(), w, h, x0 as i32, y0 as i32, mode);
    }

    /// Draw `src` into `dest` with object-fit: cover semantics (centre crop
    /// to the destination aspect ratio, then scale).
    pub fn draw_image_cover(&mut self, src: &RgbaImage, dest: Rect) {
        let crop = cover_crop(src.width(), src.height(), dest.w / dest.h);
        let (cx, cy, cw, ch) = crop;
        if cw == 0 || ch == 0 {
            return;
        }
        let cropped = imageops::crop_imm(src, cx, cy, cw, ch).to_image();
        self.draw_image(&cropped, dest, BlendMode::Normal);
    }

    /// Composite a raw RGBA buffer placed at device offset `(off_x, off_y)`.
    /// Parts outside the surface are clipped.
    pub fn blend_buffer(&mut self, buf: &[u8], buf_w: u32, buf_h: u32, off_x: i32, off_y: i32, mode: BlendMode) {
        if buf_w == 0 || buf_h == 0 || buf.len() < (buf_w * buf_h * 4) as usize {
            return;
        }
        let width = self.width() as i32;
        let height = self.height() as i32;
        let y_start = off_y.max(0);
        let y_end = (off_y + buf_h as i32).min(height);
        let x_start = off_x.max(0);
        let x_end = (off_x + buf_w as i32).min(width);
        if y_start >= y_end || x_start >= x_end {
            return;
        }
        let row_bytes = width as usize * 4;
        let raw: &mut [u8] = &mut self.image;
        raw.par_chunks_mut(row_bytes)
            .enumerate()
            .skip(y_start as usize)
            .take((y_end - y_start) as usize)
            .for_each(|(dy, row)| {
                let sy = (dy as i32 - off_y) as usize;
                for dx in x_start..x_end {
                    let sx = (dx - off_x) as usize;
                    let si = (sy * buf_w as usize + sx) * 4;
                    let top = Rgba([buf[si], buf[si + 1], buf[si + 2], buf[si + 3]]);
                    if top[3] == 0 {
                        continue;
                    }
                    let di = dx as usize * 4;
                    let px = &mut row[di..di + 4];
                    let base = Rgba([px[0], px[1], px[2], px[3]]);
                    px.copy_from_slice(&mode.blend_pixel(base, top, 1.0).0);
                }
            });
    }
}

/// Source crop `(x, y, w, h)` that fills a box of aspect `target_aspect`
/// (width / height) without letterboxing, centred like `object-fit: cover`.
pub fn cover_crop(src_w: u32, src_h: u32, target_aspect: f32) -> (u32, u32, u32, u32) {
    if src_w == 0 || src_h == 0 || !(target_aspect > 0.0) {
        return (0, 0, 0, 0);
    }
    let src_aspect = src_w as f32 / src_h as f32;
    if src_aspect > target_aspect {
        // Too wide: trim the sides
        let w = ((src_h as f32 * target_aspect).round() as u32).clamp(1, src_w);
        ((src_w - w) / 2, 0, w, src_h)
    } else {
        // Too tall: trim top and bottom
        let h = ((src_w as f32 / target_aspect).round() as u32).clamp(1, src_h);
        (0, (src_h - h) / 2, src_w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_scales_logical_size() {
        let s = Surface::new(420.0, 100.0, 2.0).unwrap();
        assert_eq!((s.width(), s.height()), (840, 200));
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        assert!(matches!(
            Surface::new(0.0, 10.0, 2.0),
            Err(SurfaceError::InvalidSize { width: 0, .. })
        ));
        assert!(Surface::new(20_000.0, 10.0, 1.0).is_err());
    }

    #[test]
    fn fill_rect_uses_logical_coordinates() {
        let mut s = Surface::new(10.0, 10.0, 2.0).unwrap();
        s.clear(Rgba([255, 255, 255, 255]));
        s.fill_rect(Rect::new(2.0, 2.0, 3.0, 3.0), Rgba([255, 0, 0, 255]));
        assert_eq!(*s.image().get_pixel(4, 4), Rgba([255, 0, 0, 255]));
        assert_eq!(*s.image().get_pixel(9, 9), Rgba([255, 0, 0, 255]));
        assert_eq!(*s.image().get_pixel(10, 10), Rgba([255, 255, 255, 255]));
        assert_eq!(*s.image().get_pixel(3, 3), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn multiply_keeps_white_transparent() {
        let base = Rgba([200, 100, 50, 255]);
        assert_eq!(BlendMode::Multiply.blend_pixel(base, Rgba([255, 255, 255, 255]), 1.0), base);
        assert_eq!(
            BlendMode::Multiply.blend_pixel(base, Rgba([0, 0, 0, 255]), 1.0),
            Rgba([0, 0, 0, 255])
        );
    }

    #[test]
    fn cover_crop_trims_the_long_axis() {
        // 16:9 into 4:3 trims the sides
        assert_eq!(cover_crop(1600, 900, 4.0 / 3.0), (200, 0, 1200, 900));
        // portrait into 4:3 trims top and bottom
        assert_eq!(cover_crop(300, 400, 4.0 / 3.0), (0, 87, 300, 225));
    }

    #[test]
    fn stroke_rect_leaves_interior() {
        let mut s = Surface::new(10.0, 10.0, 1.0).unwrap();
        s.clear(Rgba([255, 255, 255, 255]));
        s.stroke_rect(Rect::new(0.0, 0.0, 10.0, 10.0), 2.0, Rgba([0, 0, 0, 255]));
        assert_eq!(*s.image().get_pixel(0, 5), Rgba([0, 0, 0, 255]));
        assert_eq!(*s.image().get_pixel(8, 5), Rgba([0, 0, 0, 255]));
        assert_eq!(*s.image().get_pixel(5, 5), Rgba([255, 255, 255, 255]));
    }
}
