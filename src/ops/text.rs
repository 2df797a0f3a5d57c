use ab_glyph::{point, Font, FontArc, GlyphId, GlyphImageFormat, ScaleFont};
use image::RgbaImage;
use std::collections::HashMap;
use std::path::Path;

use crate::{log_info, log_warn};

/// Cache for rasterized glyph pixel data. Key: (GlyphId, font_size_bits).
/// Value: (pixels as (u32, u32, f32), bounds_min_x_at_origin_zero, bounds_min_y_at_origin_zero).
pub type GlyphPixelCache = HashMap<(GlyphId, u32), (Vec<(u32, u32, f32)>, f32, f32)>;

/// Average advance used when no font could be loaded, in ems.
const APPROX_ADVANCE_EM: f32 = 0.55;

/// Text alignment options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlignment {
    fn offset(self, width: f32) -> f32 {
        match self {
            TextAlignment::Left => 0.0,
            TextAlignment::Center => -width * 0.5,
            TextAlignment::Right => -width,
        }
    }
}

// ============================================================================
// MEASUREMENT + WORD WRAP
// ============================================================================

/// Anything that can report the rendered width of a run of text.
pub trait TextMeasure {
    fn measure(&self, text: &str) -> f32;
}

/// Exact metrics from a loaded font at a given pixel size.
pub struct FontMetrics<'a> {
    pub font: &'a FontArc,
    pub size: f32,
}

impl TextMeasure for FontMetrics<'_> {
    fn measure(&self, text: &str) -> f32 {
        layout_text(self.font, text, self.size, TextAlignment::Left).1
    }
}

/// Fixed-advance fallback used when no font is available, so layout stays
/// deterministic even on a machine without fonts.
pub struct ApproxMetrics {
    pub size: f32,
}

impl TextMeasure for ApproxMetrics {
    fn measure(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.size * APPROX_ADVANCE_EM
    }
}

/// Greedy word wrap. Explicit newlines start a new paragraph; a word wider
/// than `max_width` is placed alone on its line and never split.
pub fn wrap_text(text: &str, max_width: f32, measure: &dyn TextMeasure) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }
            let candidate = format!("{} {}", line, word);
            if measure.measure(&candidate) > max_width {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            } else {
                line = candidate;
            }
        }
        lines.push(line);
    }
    lines
}

// ============================================================================
// LAYOUT + RASTERIZATION
// ============================================================================

/// Lay out a single line of text, returning positioned glyphs and bounding rect.
/// Returns `(glyphs, total_width, ascent, descent, line_height)`.
pub fn layout_text(
    font: &FontArc,
    text: &str,
    font_size: f32,
    alignment: TextAlignment,
) -> (Vec<(GlyphId, f32, f32)>, f32, f32, f32, f32) {
    let scaled = font.as_scaled(font_size);
    let ascent = scaled.ascent();
    let descent = scaled.descent();
    let line_height = scaled.height();

    let mut glyphs = Vec::new();
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x, ascent));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }

    let total_width = cursor_x;
    let offset = alignment.offset(total_width);
    for glyph in &mut glyphs {
        glyph.1 += offset;
    }

    (glyphs, total_width, ascent, descent, line_height)
}

/// How a line of text should look. Sizes are in device pixels.
#[derive(Clone, Copy, Debug)]
pub struct TextStyle {
    pub size: f32,
    pub color: [u8; 4],
    pub italic: bool,
    pub alignment: TextAlignment,
}

/// An RGBA buffer of rendered text plus its placement on the target.
pub struct RasterizedText {
    pub buf: Vec<u8>,
    pub buf_w: u32,
    pub buf_h: u32,
    pub off_x: i32,
    pub off_y: i32,
}

impl RasterizedText {
    fn empty() -> Self {
        Self { buf: Vec::new(), buf_w: 0, buf_h: 0, off_x: 0, off_y: 0 }
    }
}

/// Rasterize one line of text into an RGBA buffer.
///
/// `(origin_x, origin_y)` is the top of the line box in target pixels; the
/// alignment anchor sits at `origin_x`. The buffer is clipped to the target.
pub fn rasterize_text(
    font: &FontArc,
    text: &str,
    style: &TextStyle,
    origin_x: f32,
    origin_y: f32,
    canvas_w: u32,
    canvas_h: u32,
    glyph_cache: &mut GlyphPixelCache,
) -> RasterizedText {
    let font_size = style.size;
    let (glyphs, _, _, _, _) = layout_text(font, text, font_size, style.alignment);
    if glyphs.is_empty() {
        return RasterizedText::empty();
    }

    // Bounding box from glyph_bounds (no outlining needed)
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for &(glyph_id, gx, gy) in &glyphs {
        let glyph = glyph_id.with_scale_and_position(font_size, point(gx, gy));
        let bounds = font.glyph_bounds(&glyph);
        min_x = min_x.min(bounds.min.x);
        min_y = min_y.min(bounds.min.y);
        max_x = max_x.max(bounds.max.x);
        max_y = max_y.max(bounds.max.y);
    }
    if min_x >= max_x || min_y >= max_y {
        return RasterizedText::empty();
    }

    // Padding, plus room for the italic shear
    let pad = 2.0;
    min_x -= pad;
    min_y -= pad;
    max_x += pad + if style.italic { font_size * 0.25 } else { 0.0 };
    max_y += pad;

    let x0 = ((origin_x + min_x).floor() as i32).max(0);
    let y0 = ((origin_y + min_y).floor() as i32).max(0);
    let x1 = ((origin_x + max_x).ceil() as i32).min(canvas_w as i32);
    let y1 = ((origin_y + max_y).ceil() as i32).min(canvas_h as i32);
    let buf_w = (x1 - x0).max(0) as u32;
    let buf_h = (y1 - y0).max(0) as u32;
    if buf_w == 0 || buf_h == 0 {
        return RasterizedText::empty();
    }

    let mut coverage = vec![0.0f32; buf_w as usize * buf_h as usize];

    // Glyphs are cached at (0,0) and replayed at their real position
    let font_size_key = font_size.to_bits();
    for &(glyph_id, gx, gy) in &glyphs {
        let draw_x = gx.round();
        let draw_y = gy.round();
        let cache_key = (glyph_id, font_size_key);

        let (pixels, base_bx, base_by) = glyph_cache.entry(cache_key).or_insert_with(|| {
            let base_glyph = glyph_id.with_scale_and_position(font_size, point(0.0, 0.0));
            let mut px_list = Vec::new();
            match font.outline_glyph(base_glyph) {
                Some(outlined) => {
                    let b = outlined.px_bounds();
                    outlined.draw(|px, py, cov| px_list.push((px, py, cov)));
                    (px_list, b.min.x, b.min.y)
                }
                None => (px_list, 0.0, 0.0),
            }
        });

        let actual_bx = *base_bx + draw_x;
        let actual_by = *base_by + draw_y;
        for &(px, py, cov) in pixels.iter() {
            let mut cx = px as f32 + origin_x + actual_bx;
            let cy = py as f32 + origin_y + actual_by;
            if style.italic {
                let baseline_y = origin_y + draw_y;
                cx += (baseline_y - cy) * 0.2;
            }
            let ix = cx.round() as i32 - x0;
            let iy = cy.round() as i32 - y0;
            if ix >= 0 && iy >= 0 && (ix as u32) < buf_w && (iy as u32) < buf_h {
                let idx = iy as usize * buf_w as usize + ix as usize;
                coverage[idx] = coverage[idx].max(cov);
            }
        }
    }

    let color = style.color;
    let mut buf = vec![0u8; buf_w as usize * buf_h as usize * 4];
    for (i, &cov) in coverage.iter().enumerate() {
        if cov > 0.001 {
            let idx = i * 4;
            buf[idx] = color[0];
            buf[idx + 1] = color[1];
            buf[idx + 2] = color[2];
            buf[idx + 3] = (color[3] as f32 * cov.min(1.0)).round() as u8;
        }
    }

    RasterizedText { buf, buf_w, buf_h, off_x: x0, off_y: y0 }
}

// ============================================================================
// EMOJI GLYPHS
// ============================================================================

/// Render the first visible codepoint of `emoji` at `px_size` pixels per em.
///
/// Colour bitmap glyphs (CBDT/sbix PNG strikes) are preferred; outline glyphs
/// are filled with `fallback_color`. Returns `None` when the font has neither.
pub fn rasterize_emoji(font: &FontArc, emoji: &str, px_size: f32, fallback_color: [u8; 4]) -> Option<RgbaImage> {
    // Skip variation selectors and joiners; the base codepoint carries the glyph
    let ch = emoji
        .chars()
        .find(|c| !matches!(*c, '\u{FE0E}' | '\u{FE0F}' | '\u{200D}'))?;
    let glyph_id = font.glyph_id(ch);
    if glyph_id.0 == 0 {
        return None;
    }

    let strike = px_size.round().clamp(1.0, u16::MAX as f32) as u16;
    if let Some(raster) = font.glyph_raster_image2(glyph_id, strike)
        && matches!(raster.format, GlyphImageFormat::Png)
        && let Ok(decoded) = image::load_from_memory(raster.data)
    {
        let decoded = decoded.into_rgba8();
        let ratio = px_size / raster.pixels_per_em.max(1) as f32;
        let w = ((decoded.width() as f32 * ratio).round() as u32).max(1);
        let h = ((decoded.height() as f32 * ratio).round() as u32).max(1);
        return Some(image::imageops::resize(&decoded, w, h, image::imageops::FilterType::Triangle));
    }

    let glyph = glyph_id.with_scale_and_position(px_size, point(0.0, 0.0));
    let outlined = font.outline_glyph(glyph)?;
    let bounds = outlined.px_bounds();
    let w = bounds.width().ceil().max(1.0) as u32;
    let h = bounds.height().ceil().max(1.0) as u32;
    let mut img = RgbaImage::new(w, h);
    outlined.draw(|x, y, cov| {
        if x < w && y < h {
            let a = (fallback_color[3] as f32 * cov.min(1.0)).round() as u8;
            img.put_pixel(x, y, image::Rgba([fallback_color[0], fallback_color[1], fallback_color[2], a]));
        }
    });
    Some(img)
}

// ============================================================================
// FONT LOADING
// ============================================================================

/// Families tried, in order, when no text font is configured.
const TEXT_FAMILIES: &[&str] = &["DejaVu Sans", "Liberation Sans", "Arial", "Helvetica", "Segoe UI"];

/// Families tried, in order, when no emoji font is configured.
const EMOJI_FAMILIES: &[&str] = &["Noto Color Emoji", "Apple Color Emoji", "Segoe UI Emoji", "Noto Emoji"];

/// The fonts an export draws with. Either may be missing.
#[derive(Clone, Default)]
pub struct Fonts {
    pub text: Option<FontArc>,
    pub emoji: Option<FontArc>,
}

impl Fonts {
    /// Fonts with nothing loaded: layout falls back to approximate metrics and
    /// no glyphs are drawn.
    pub fn none() -> Self {
        Self::default()
    }

    /// Resolve fonts from optional overrides (a file path or family name),
    /// then from the built-in family lists.
    pub fn load(text_pref: Option<&str>, emoji_pref: Option<&str>) -> Self {
        let text = resolve_font(text_pref, TEXT_FAMILIES);
        let emoji = resolve_font(emoji_pref, EMOJI_FAMILIES);
        match &text {
            Some(_) => {
                log_info!("Fonts: text font loaded");
            }
            None => {
                log_warn!("Fonts: no text font found; notes will not be rendered");
            }
        }
        if emoji.is_none() {
            log_warn!("Fonts: no emoji font found; stickers fall back to the text font");
        }
        Self { text, emoji }
    }

    /// Font used for sticker glyphs.
    pub fn sticker_font(&self) -> Option<&FontArc> {
        self.emoji.as_ref().or(self.text.as_ref())
    }
}

fn resolve_font(pref: Option<&str>, families: &[&str]) -> Option<FontArc> {
    if let Some(pref) = pref.map(str::trim).filter(|p| !p.is_empty()) {
        let path = Path::new(pref);
        let found = if path.is_file() {
            load_font_file(path)
        } else {
            load_system_font(pref, 400, false)
        };
        if found.is_some() {
            return found;
        }
        log_warn!("Fonts: '{}' could not be loaded, trying defaults", pref);
    }
    families.iter().find_map(|family| load_system_font(family, 400, false))
}

/// Load a font from a `.ttf` / `.otf` file.
pub fn load_font_file(path: &Path) -> Option<FontArc> {
    let bytes = std::fs::read(path).ok()?;
    FontArc::try_from_vec(bytes).ok()
}

/// Load a font by family name, weight, and style from the system.
/// `weight` is a CSS-style weight value (100=Thin, 400=Regular, 700=Bold, etc.)
/// Returns None if the font cannot be found.
pub fn load_system_font(family: &str, weight: u16, italic: bool) -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::{Properties, Style, Weight};
    use font_kit::source::SystemSource;

    let mut props = Properties::new();
    props.weight = Weight(weight as f32);
    if italic {
        props.style = Style::Italic;
    }

    let source = SystemSource::new();
    let handle = source
        .select_best_match(&[FamilyName::Title(family.to_string())], &props)
        .ok()?;

    let font_data = handle.load().ok()?;
    let bytes: Vec<u8> = (*font_data.copy_font_data()?).clone();
    FontArc::try_from_vec(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character is 10 units wide.
    struct Mono;

    impl TextMeasure for Mono {
        fn measure(&self, text: &str) -> f32 {
            text.chars().count() as f32 * 10.0
        }
    }

    #[test]
    fn short_text_stays_on_one_line() {
        assert_eq!(wrap_text("hello world", 200.0, &Mono), vec!["hello world"]);
    }

    #[test]
    fn long_text_wraps_within_width() {
        let text = "the quick brown fox jumps over the lazy dog";
        let lines = wrap_text(text, 100.0, &Mono);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(Mono.measure(line) <= 100.0, "line too wide: {:?}", line);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn oversized_word_gets_its_own_line_unsplit() {
        let lines = wrap_text("hi supercalifragilistic yo", 100.0, &Mono);
        assert_eq!(lines, vec!["hi", "supercalifragilistic", "yo"]);
    }

    #[test]
    fn newlines_start_new_paragraphs() {
        let lines = wrap_text("first\n\nthird", 500.0, &Mono);
        assert_eq!(lines, vec!["first", "", "third"]);
    }

    #[test]
    fn approx_metrics_scale_with_size() {
        let m = ApproxMetrics { size: 20.0 };
        assert_eq!(m.measure("abcd"), 4.0 * 20.0 * APPROX_ADVANCE_EM);
    }
}
