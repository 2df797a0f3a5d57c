// ============================================================================
// STRIP COMPOSER — photos, watermark, stickers and drawing on the strip
// ============================================================================

use std::collections::HashMap;

use ab_glyph::{Font, FontArc, ScaleFont};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::canvas::{BlendMode, Rect, Surface, SurfaceError};
use crate::components::colors::{StripColor, rgb};
use crate::components::stickers::Sticker;
use crate::io::{ImagePayload, decode_image};
use crate::ops::layout::*;
use crate::ops::text::{
    ApproxMetrics, FontMetrics, Fonts, GlyphPixelCache, TextAlignment, TextMeasure, TextStyle, rasterize_emoji,
    rasterize_text,
};
use crate::ops::transform::{SpriteTransform, draw_sprite};
use crate::session::{Photo, Session};
use crate::log_warn;

pub const STRIP_BORDER_COLOR: Rgba<u8> = rgb(0x111827);
pub const WHITE: Rgba<u8> = rgb(0xFFFFFF);
pub const BLACK: Rgba<u8> = rgb(0x000000);

/// Line height of the small `text-sm` labels.
const LABEL_LINE_HEIGHT: f32 = 20.0;
const LABEL_PAD_X: f32 = 12.0;
const LABEL_PAD_Y: f32 = 4.0;
/// Watermark tab distance from the strip's inner corner.
const WATERMARK_INSET: f32 = 12.0;

/// Everything the strip is drawn from, borrowed from a session.
#[derive(Clone, Copy, Debug)]
pub struct StripInputs<'a> {
    pub photos: &'a [Photo],
    pub color: StripColor,
    pub stickers: &'a [Sticker],
    pub drawing: Option<&'a ImagePayload>,
}

impl<'a> StripInputs<'a> {
    pub fn from_session(session: &'a Session) -> Self {
        Self {
            photos: session.photos(),
            color: session.strip_color(),
            stickers: session.stickers().as_slice(),
            drawing: session.drawing().raster(),
        }
    }
}

/// Decoded bitmaps for one render. `None` marks a failed decode.
pub struct DecodedAssets {
    pub photos: Vec<Option<RgbaImage>>,
    pub drawing: Option<RgbaImage>,
}

/// Decode every photo and the drawing in parallel and wait for all of them.
/// Failures are logged and leave a hole; they never abort the render.
pub fn decode_assets(inputs: &StripInputs<'_>) -> DecodedAssets {
    let (photos, drawing) = rayon::join(
        || {
            inputs
                .photos
                .par_iter()
                .enumerate()
                .map(|(i, photo)| match decode_image(&photo.payload) {
                    Ok(img) => Some(img),
                    Err(e) => {
                        log_warn!("Compose: photo {} ({}) failed to decode: {}", i + 1, photo.id, e);
                        None
                    }
                })
                .collect::<Vec<_>>()
        },
        || {
            inputs.drawing.and_then(|payload| match decode_image(payload) {
                Ok(img) => Some(img),
                Err(e) => {
                    log_warn!("Compose: drawing failed to decode: {}", e);
                    None
                }
            })
        },
    );
    DecodedAssets { photos, drawing }
}

/// What actually made it onto the strip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StripReport {
    pub photos_drawn: usize,
    pub photos_skipped: usize,
    pub stickers_drawn: usize,
    pub stickers_skipped: usize,
    pub drawing_applied: bool,
}

/// Paint the strip described by `layout` onto `surface`.
///
/// Order: background and border, photo rows, stickers in insertion order,
/// the drawing with multiply blending, then the watermark tab on top.
pub fn paint_strip(
    surface: &mut Surface,
    layout: &StripLayout,
    inputs: &StripInputs<'_>,
    assets: &DecodedAssets,
    fonts: &Fonts,
    watermark: &str,
    glyph_cache: &mut GlyphPixelCache,
) -> StripReport {
    let mut report = StripReport::default();

    surface.fill_rect(layout.strip, inputs.color.rgba());
    surface.stroke_rect(layout.strip, STRIP_BORDER, STRIP_BORDER_COLOR);

    for (row, decoded) in layout.photo_rows.iter().zip(&assets.photos) {
        match decoded {
            Some(img) => {
                surface.draw_image_cover(img, *row);
                surface.stroke_rect(*row, PHOTO_BORDER, WHITE);
                report.photos_drawn += 1;
            }
            None => report.photos_skipped += 1,
        }
    }

    let inner = layout.strip_inner();

    if let Some(font) = fonts.sticker_font() {
        let mut sprites: HashMap<(&str, u32), Option<RgbaImage>> = HashMap::new();
        let px_size = STICKER_SIZE * surface.scale();
        for sticker in inputs.stickers {
            let sprite = sprites
                .entry((sticker.emoji.as_str(), px_size.to_bits()))
                .or_insert_with(|| rasterize_emoji(font, &sticker.emoji, px_size, STRIP_BORDER_COLOR.0));
            match sprite {
                Some(sprite) => {
                    let t = SpriteTransform {
                        center: (inner.x + sticker.x, inner.y + sticker.y),
                        rotation_deg: sticker.rotation,
                        scale: sticker.scale,
                    };
                    draw_sprite(surface, sprite, t);
                    report.stickers_drawn += 1;
                }
                None => report.stickers_skipped += 1,
            }
        }
    } else {
        report.stickers_skipped = inputs.stickers.len();
    }

    if let Some(drawing) = &assets.drawing {
        surface.draw_image(drawing, inner, BlendMode::Multiply);
        report.drawing_applied = true;
    }

    // Watermark stays above everything, ink included
    let tab_w = label_width(fonts.text.as_ref(), watermark);
    let tab = Rect::new(
        inner.right() - WATERMARK_INSET - tab_w,
        inner.y + WATERMARK_INSET,
        tab_w,
        label_height(),
    );
    draw_label_tab(surface, fonts.text.as_ref(), glyph_cache, watermark, tab, BLACK, WHITE, WHITE);

    report
}

/// Render a bare strip (no margins, notes or footer) for previews.
pub fn compose_strip(
    inputs: &StripInputs<'_>,
    fonts: &Fonts,
    watermark: &str,
    scale: f32,
) -> Result<(RgbaImage, StripReport), SurfaceError> {
    let layout = StripLayout::strip_only(inputs.photos.len());
    let mut surface = Surface::new(layout.width, layout.height, scale)?;
    let assets = decode_assets(inputs);
    let mut cache = GlyphPixelCache::new();
    let report = paint_strip(&mut surface, &layout, inputs, &assets, fonts, watermark, &mut cache);
    Ok((surface.into_image(), report))
}

// ============================================================================
// TEXT HELPERS (shared with the export pipeline)
// ============================================================================

/// Exact metrics when a font is loaded, the fixed-advance estimate otherwise.
pub(crate) fn measurer(font: Option<&FontArc>, size: f32) -> Box<dyn TextMeasure + '_> {
    match font {
        Some(font) => Box::new(FontMetrics { font, size }),
        None => Box::new(ApproxMetrics { size }),
    }
}

/// Height of the glyph box (ascent to descent) at `size`.
fn content_height(font: Option<&FontArc>, size: f32) -> f32 {
    match font {
        Some(font) => font.as_scaled(size).height(),
        None => size * 1.2,
    }
}

/// Draw one line of text whose line box starts at `top`. `style.size` is in
/// logical units here. Without a font nothing is drawn.
#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_text_line(
    surface: &mut Surface,
    font: Option<&FontArc>,
    cache: &mut GlyphPixelCache,
    text: &str,
    anchor_x: f32,
    top: f32,
    line_height: f32,
    style: &TextStyle,
) {
    let Some(font) = font else {
        return;
    };
    if text.trim().is_empty() {
        return;
    }
    let s = surface.scale();
    let glyph_top = top + (line_height - content_height(Some(font), style.size)) * 0.5;
    let device = TextStyle { size: style.size * s, ..*style };
    let out = rasterize_text(
        font,
        text,
        &device,
        anchor_x * s,
        glyph_top * s,
        surface.width(),
        surface.height(),
        cache,
    );
    surface.blend_buffer(&out.buf, out.buf_w, out.buf_h, out.off_x, out.off_y, BlendMode::Normal);
}

pub(crate) fn label_width(font: Option<&FontArc>, text: &str) -> f32 {
    measurer(font, LABEL_TEXT_SIZE).measure(text) + LABEL_PAD_X * 2.0
}

pub(crate) fn label_height() -> f32 {
    LABEL_LINE_HEIGHT + LABEL_PAD_Y * 2.0
}

/// A small filled tab with a 1px border and centred label text.
#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_label_tab(
    surface: &mut Surface,
    font: Option<&FontArc>,
    cache: &mut GlyphPixelCache,
    text: &str,
    tab: Rect,
    fill: Rgba<u8>,
    border: Rgba<u8>,
    text_color: Rgba<u8>,
) {
    surface.fill_rect(tab, fill);
    surface.stroke_rect(tab, 1.0, border);
    let style = TextStyle {
        size: LABEL_TEXT_SIZE,
        color: text_color.0,
        italic: false,
        alignment: TextAlignment::Center,
    };
    let cx = tab.x + tab.w * 0.5;
    draw_text_line(surface, font, cache, text, cx, tab.y + LABEL_PAD_Y, LABEL_LINE_HEIGHT, &style);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::encode_png;

    fn photo(color: [u8; 4], w: u32, h: u32) -> Photo {
        let img = RgbaImage::from_pixel(w, h, Rgba(color));
        Photo::new(ImagePayload::new(encode_png(&img).unwrap()))
    }

    fn strip(photos: &[Photo], drawing: Option<&ImagePayload>) -> (RgbaImage, StripReport) {
        let inputs = StripInputs { photos, color: StripColor::Mint, stickers: &[], drawing };
        compose_strip(&inputs, &Fonts::none(), "@booth", 1.0).unwrap()
    }

    #[test]
    fn strip_size_follows_photo_count() {
        let photos = vec![photo([255, 0, 0, 255], 40, 30); 3];
        let (img, report) = strip(&photos, None);
        assert_eq!(img.dimensions(), (STRIP_WIDTH as u32, strip_height(3) as u32));
        assert_eq!(report.photos_drawn, 3);
    }

    #[test]
    fn photo_rows_keep_list_order() {
        let photos = vec![photo([255, 0, 0, 255], 40, 30), photo([0, 0, 255, 255], 40, 30)];
        let (img, _) = strip(&photos, None);
        let layout = StripLayout::strip_only(2);
        let centre = |r: Rect| (r.x + r.w / 2.0) as u32;
        let mid = |r: Rect| (r.y + r.h / 2.0) as u32;
        let first = layout.photo_rows[0];
        let second = layout.photo_rows[1];
        assert_eq!(*img.get_pixel(centre(first), mid(first)), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(centre(second), mid(second)), Rgba([0, 0, 255, 255]));
        // White border around each row
        assert_eq!(*img.get_pixel(first.x as u32, mid(first)), WHITE);
    }

    #[test]
    fn undecodable_photo_leaves_its_row_blank() {
        let photos = vec![Photo::new(ImagePayload::new(b"not an image".to_vec())), photo([0, 0, 255, 255], 40, 30)];
        let (img, report) = strip(&photos, None);
        assert_eq!(report.photos_drawn, 1);
        assert_eq!(report.photos_skipped, 1);
        let row = StripLayout::strip_only(2).photo_rows[0];
        let px = img.get_pixel((row.x + row.w / 2.0) as u32, (row.y + row.h / 2.0) as u32);
        assert_eq!(*px, StripColor::Mint.rgba());
    }

    #[test]
    fn drawing_multiplies_over_the_strip() {
        let layer = RgbaImage::from_fn(340, 600, |x, _| {
            if x < 170 { Rgba([128, 128, 128, 255]) } else { Rgba([0, 0, 0, 0]) }
        });
        let drawing = ImagePayload::new(encode_png(&layer).unwrap());
        let photos = vec![photo([255, 255, 255, 255], 40, 30)];
        let (img, report) = strip(&photos, Some(&drawing));
        assert!(report.drawing_applied);

        // Left half is darkened (white * grey = grey), right half untouched
        let y = (STRIP_BORDER + STRIP_PADDING + PHOTO_HEIGHT / 2.0) as u32;
        let left = img.get_pixel(100, y);
        assert!((left[0] as i32 - 128).abs() <= 2, "left {:?}", left);
        assert_eq!(*img.get_pixel(300, y), WHITE);
    }

    /// A system text font, or `None` on machines without one.
    fn system_font() -> Option<FontArc> {
        ["DejaVu Sans", "Liberation Sans", "Arial"]
            .iter()
            .find_map(|family| crate::ops::text::load_system_font(family, 400, false))
            .or_else(|| {
                crate::ops::text::load_font_file(std::path::Path::new(
                    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
                ))
            })
    }

    fn is_ink(px: &Rgba<u8>) -> bool {
        px[0] < 128 && px[1] < 128 && px[2] < 128
    }

    #[test]
    fn watermark_tab_stays_above_the_drawing() {
        let red = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let drawing = ImagePayload::new(encode_png(&red).unwrap());
        let photos = vec![photo([255, 255, 255, 255], 40, 30)];
        let (img, _) = strip(&photos, Some(&drawing));

        let layout = StripLayout::strip_only(1);
        let inner = layout.strip_inner();
        let tab_w = label_width(None, "@booth");
        let tab_x = inner.right() - WATERMARK_INSET - tab_w;
        let tab_y = inner.y + WATERMARK_INSET;
        // Top border of the tab is white, not multiplied to red
        assert_eq!(*img.get_pixel((tab_x + tab_w / 2.0) as u32, tab_y as u32), WHITE);
        // Photo row next to it is tinted
        let row = layout.photo_rows[0];
        assert_eq!(*img.get_pixel((row.x + 40.0) as u32, (row.y + row.h / 2.0) as u32), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn sticker_is_drawn_at_its_strip_local_position() {
        let Some(font) = system_font() else {
            return;
        };
        let fonts = Fonts { text: Some(font), emoji: None };
        let photos = vec![photo([255, 255, 255, 255], 40, 30)];
        let mut sticker = Sticker::new("W");
        sticker.x = 60.0;
        sticker.y = 60.0;
        let stickers = vec![sticker];
        let inputs = StripInputs { photos: &photos, color: StripColor::Mint, stickers: &stickers, drawing: None };
        let (img, report) = compose_strip(&inputs, &fonts, "@booth", 1.0).unwrap();
        assert_eq!(report.stickers_drawn, 1);

        let inner = StripLayout::strip_only(1).strip_inner();
        let (cx, cy) = ((inner.x + 60.0) as i64, (inner.y + 60.0) as i64);
        let half = (STICKER_SIZE / 2.0) as i64 + 2;
        let mut near = 0;
        let mut far = 0;
        let row = StripLayout::strip_only(1).photo_rows[0];
        for (x, y, px) in img.enumerate_pixels() {
            let inside_photo = (x as f32) > row.x + PHOTO_BORDER
                && (x as f32) < row.right() - PHOTO_BORDER
                && (y as f32) > row.y + PHOTO_BORDER
                && (y as f32) < row.bottom() - PHOTO_BORDER;
            // Right half holds the watermark tab
            if !inside_photo || (x as f32) > inner.x + 150.0 || !is_ink(px) {
                continue;
            }
            if (x as i64 - cx).abs() <= half && (y as i64 - cy).abs() <= half {
                near += 1;
            } else {
                far += 1;
            }
        }
        assert!(near > 20, "only {} glyph pixels around the sticker", near);
        assert_eq!(far, 0);
    }

    #[test]
    fn label_text_is_rasterized_with_a_font() {
        let Some(font) = system_font() else {
            return;
        };
        let mut surface = Surface::new(200.0, 40.0, 2.0).unwrap();
        surface.clear(WHITE);
        let mut cache = GlyphPixelCache::new();
        let style = TextStyle { size: 16.0, color: BLACK.0, italic: false, alignment: TextAlignment::Left };
        draw_text_line(&mut surface, Some(&font), &mut cache, "Hello", 10.0, 8.0, 24.0, &style);
        let inked = surface.image().pixels().filter(|p| is_ink(p)).count();
        assert!(inked > 50, "{} inked pixels", inked);
        // Nothing drawn left of the anchor
        assert!((0..18).all(|x| (0..80).all(|y| !is_ink(surface.image().get_pixel(x, y)))));
    }

    #[test]
    fn stickers_without_any_font_are_skipped() {
        let photos = vec![photo([255, 0, 0, 255], 40, 30)];
        let stickers = vec![Sticker::new("🎀")];
        let inputs = StripInputs { photos: &photos, color: StripColor::Pink, stickers: &stickers, drawing: None };
        let (_, report) = compose_strip(&inputs, &Fonts::none(), "@booth", 1.0).unwrap();
        assert_eq!(report.stickers_skipped, 1);
        assert_eq!(report.stickers_drawn, 0);
    }
}
