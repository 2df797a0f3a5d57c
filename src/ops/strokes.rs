// ============================================================================
// STROKE RASTERIZER — freehand polylines with round caps and joins
// ============================================================================

use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::canvas::BlendMode;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// One finished pen stroke.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<Point>,
    /// Opaque ink colour as `[r, g, b, a]`.
    pub color: [u8; 4],
    pub width: f32,
}

impl Stroke {
    /// Single-point strokes are kept but paint nothing.
    pub fn is_paintable(&self) -> bool {
        self.points.len() >= 2 && self.width > 0.0
    }
}

/// Distance from `(px, py)` to segment `a`–`b`.
#[inline]
fn sdf_line_segment(px: f32, py: f32, a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((px - a.x) * dx + (py - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let cx = a.x + t * dx;
    let cy = a.y + t * dy;
    ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt()
}

/// Smoothstep between edge0 and edge1.
#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Rasterize strokes, in order, onto a transparent `width` × `height` layer.
/// `scale` maps stroke coordinates (and widths) to pixels.
pub fn rasterize_strokes(strokes: &[Stroke], width: u32, height: u32, scale: f32) -> RgbaImage {
    let mut layer = RgbaImage::new(width, height);
    for stroke in strokes.iter().filter(|s| s.is_paintable()) {
        paint_stroke(&mut layer, stroke, scale);
    }
    layer
}

/// Paint one stroke. Coverage is the max over its segments so overlapping
/// segments at a join do not darken the ink.
fn paint_stroke(layer: &mut RgbaImage, stroke: &Stroke, scale: f32) {
    let w = layer.width();
    let h = layer.height();
    let half = stroke.width * scale * 0.5;
    let pts: Vec<Point> = stroke
        .points
        .iter()
        .map(|p| Point::new(p.x * scale, p.y * scale))
        .collect();

    // Bounding box of the whole stroke, padded by the pen radius + AA fringe
    let pad = half + 1.0;
    let min_x = pts.iter().map(|p| p.x).fold(f32::MAX, f32::min) - pad;
    let max_x = pts.iter().map(|p| p.x).fold(f32::MIN, f32::max) + pad;
    let min_y = pts.iter().map(|p| p.y).fold(f32::MAX, f32::min) - pad;
    let max_y = pts.iter().map(|p| p.y).fold(f32::MIN, f32::max) + pad;

    let x0 = min_x.floor().max(0.0) as u32;
    let y0 = min_y.floor().max(0.0) as u32;
    let x1 = (max_x.ceil().max(0.0) as u32).min(w);
    let y1 = (max_y.ceil().max(0.0) as u32).min(h);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let color = Rgba(stroke.color);
    let row_bytes = w as usize * 4;
    let raw: &mut [u8] = &mut *layer;
    raw.par_chunks_mut(row_bytes)
        .enumerate()
        .skip(y0 as usize)
        .take((y1 - y0) as usize)
        .for_each(|(y, row)| {
            let py = y as f32 + 0.5;
            for x in x0..x1 {
                let px = x as f32 + 0.5;
                let dist = pts
                    .windows(2)
                    .map(|seg| sdf_line_segment(px, py, seg[0], seg[1]))
                    .fold(f32::MAX, f32::min);
                let coverage = 1.0 - smoothstep(half - 0.5, half + 0.5, dist);
                if coverage <= 0.001 {
                    continue;
                }
                let i = x as usize * 4;
                let dst = &mut row[i..i + 4];
                let base = Rgba([dst[0], dst[1], dst[2], dst[3]]);
                let out = BlendMode::Normal.blend_pixel(base, color, coverage);
                dst.copy_from_slice(&out.0);
            }
        });
}
