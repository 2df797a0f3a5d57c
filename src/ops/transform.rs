// ============================================================================
// TRANSFORMED BLIT — rotated / scaled sprites (sticker glyphs)
// ============================================================================

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::canvas::{BlendMode, Surface};

/// A per-draw transform: translate to `center` (logical units), rotate, then
/// scale. Every draw builds its own, so nothing carries over between sprites.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteTransform {
    pub center: (f32, f32),
    pub rotation_deg: f32,
    pub scale: f32,
}

/// Composite `sprite` (already rasterized at device resolution) onto the
/// surface with its centre at `t.center`, using inverse-mapped bilinear
/// sampling against a transparent background.
pub fn draw_sprite(surface: &mut Surface, sprite: &RgbaImage, t: SpriteTransform) {
    let (sw, sh) = sprite.dimensions();
    if sw == 0 || sh == 0 || t.scale.abs() < 1e-6 {
        return;
    }
    let cx = t.center.0 * surface.scale();
    let cy = t.center.1 * surface.scale();

    // Any rotation stays inside the circle through the sprite corners
    let radius = 0.5 * ((sw * sw + sh * sh) as f32).sqrt() * t.scale.abs() + 1.0;
    let x0 = ((cx - radius).floor() as i32).max(0);
    let y0 = ((cy - radius).floor() as i32).max(0);
    let x1 = ((cx + radius).ceil() as i32).min(surface.width() as i32);
    let y1 = ((cy + radius).ceil() as i32).min(surface.height() as i32);
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    let buf_w = (x1 - x0) as u32;
    let buf_h = (y1 - y0) as u32;

    let (sin, cos) = t.rotation_deg.to_radians().sin_cos();
    let inv_scale = 1.0 / t.scale;
    let half_w = sw as f32 * 0.5;
    let half_h = sh as f32 * 0.5;

    let mut buf = vec![0u8; buf_w as usize * buf_h as usize * 4];
    buf.par_chunks_mut(buf_w as usize * 4)
        .enumerate()
        .for_each(|(row_idx, row)| {
            let v = (y0 + row_idx as i32) as f32 + 0.5 - cy;
            for col in 0..buf_w as usize {
                let u = (x0 + col as i32) as f32 + 0.5 - cx;
                // Inverse rotation, then inverse scale, into sprite space
                let sx = (cos * u + sin * v) * inv_scale + half_w - 0.5;
                let sy = (-sin * u + cos * v) * inv_scale + half_h - 0.5;
                let px = bilinear_sample(sprite, sx, sy);
                row[col * 4..col * 4 + 4].copy_from_slice(&px.0);
            }
        });

    surface.blend_buffer(&buf, buf_w, buf_h, x0, y0, BlendMode::Normal);
}

/// Bilinear interpolation sampling from an RgbaImage.
fn bilinear_sample(img: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    if x0 < -1 || y0 < -1 || x0 >= img.width() as i32 || y0 >= img.height() as i32 {
        return Rgba([0, 0, 0, 0]);
    }
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let sample = |sx: i32, sy: i32| -> [f32; 4] {
        if sx < 0 || sy < 0 || sx >= img.width() as i32 || sy >= img.height() as i32 {
            [0.0; 4]
        } else {
            let p = img.get_pixel(sx as u32, sy as u32);
            [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
        }
    };

    let tl = sample(x0, y0);
    let tr = sample(x0 + 1, y0);
    let bl = sample(x0, y0 + 1);
    let br = sample(x0 + 1, y0 + 1);

    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = lerp(tl[c], tr[c], fx);
        let bot = lerp(bl[c], br[c], fx);
        out[c] = lerp(top, bot, fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 8x4 sprite: left half red, right half blue.
    fn two_tone() -> RgbaImage {
        RgbaImage::from_fn(8, 4, |x, _| {
            if x < 4 { Rgba([255, 0, 0, 255]) } else { Rgba([0, 0, 255, 255]) }
        })
    }

    fn blank(w: f32, h: f32) -> Surface {
        let mut s = Surface::new(w, h, 1.0).unwrap();
        s.clear(Rgba([255, 255, 255, 255]));
        s
    }

    #[test]
    fn identity_transform_centres_sprite() {
        let mut s = blank(20.0, 20.0);
        draw_sprite(&mut s, &two_tone(), SpriteTransform { center: (10.0, 10.0), rotation_deg: 0.0, scale: 1.0 });
        assert_eq!(*s.image().get_pixel(7, 9), Rgba([255, 0, 0, 255]));
        assert_eq!(*s.image().get_pixel(12, 9), Rgba([0, 0, 255, 255]));
        assert_eq!(*s.image().get_pixel(10, 2), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn half_turn_swaps_sides() {
        let mut s = blank(20.0, 20.0);
        draw_sprite(&mut s, &two_tone(), SpriteTransform { center: (10.0, 10.0), rotation_deg: 180.0, scale: 1.0 });
        assert_eq!(*s.image().get_pixel(7, 9), Rgba([0, 0, 255, 255]));
        assert_eq!(*s.image().get_pixel(12, 9), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn scale_grows_footprint() {
        let mut s = blank(40.0, 40.0);
        draw_sprite(&mut s, &two_tone(), SpriteTransform { center: (20.0, 20.0), rotation_deg: 0.0, scale: 2.0 });
        // unscaled sprite spans x 16..24; doubled spans 12..28
        assert_eq!(*s.image().get_pixel(13, 20), Rgba([255, 0, 0, 255]));
        assert_eq!(*s.image().get_pixel(26, 20), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn sprites_do_not_share_transforms() {
        let mut a = blank(40.0, 20.0);
        draw_sprite(&mut a, &two_tone(), SpriteTransform { center: (10.0, 10.0), rotation_deg: 90.0, scale: 1.5 });
        draw_sprite(&mut a, &two_tone(), SpriteTransform { center: (30.0, 10.0), rotation_deg: 0.0, scale: 1.0 });

        let mut b = blank(40.0, 20.0);
        draw_sprite(&mut b, &two_tone(), SpriteTransform { center: (30.0, 10.0), rotation_deg: 0.0, scale: 1.0 });

        for x in 24..36 {
            for y in 0..20 {
                assert_eq!(a.image().get_pixel(x, y), b.image().get_pixel(x, y));
            }
        }
    }
}
