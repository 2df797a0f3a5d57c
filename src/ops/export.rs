// ============================================================================
// EXPORT PIPELINE — strip + notes panel + footer into one PNG
// ============================================================================
//
// The pipeline only reads the session. Asset decodes fan out on the rayon
// pool and are joined before anything is drawn, so the output depends only
// on the inputs and the decode outcomes.

use std::fmt;

use image::{ImageError, Rgba};

use crate::canvas::{Rect, Surface, SurfaceError};
use crate::components::colors::rgb;
use crate::io::encode_png;
use crate::ops::compose::{
    StripInputs, StripReport, decode_assets, draw_label_tab, draw_text_line, label_height, label_width, measurer,
    paint_strip,
};
use crate::ops::layout::*;
use crate::ops::text::{Fonts, GlyphPixelCache, TextAlignment, TextStyle, wrap_text};
use crate::session::Session;
use crate::{log_err, log_info};

pub const DEFAULT_EXPORT_SCALE: f32 = 2.0;
pub const NOTES_PLACEHOLDER: &str = "Add your notes below...";

const NOTES_FILL: Rgba<u8> = rgb(0xFEFCE8);
const NOTES_BORDER_COLOR: Rgba<u8> = rgb(0xFACC15);
const NOTES_TAB_FILL: Rgba<u8> = rgb(0xFEF08A);
const NOTES_TAB_TEXT: Rgba<u8> = rgb(0x854D0E);
const NOTE_TEXT_COLOR: Rgba<u8> = rgb(0x374151);
const MUTED_TEXT: Rgba<u8> = rgb(0x9CA3AF);
/// Notes tab offsets: above the panel's top edge, right of its left border.
const NOTES_TAB_RAISE: f32 = 12.0;
const NOTES_TAB_LEFT: f32 = 16.0;

#[derive(Debug)]
pub enum ExportError {
    NoPhotos,
    TooManyPhotos(usize),
    Surface(SurfaceError),
    Encode(ImageError),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::NoPhotos => write!(f, "Nothing to export: add at least one photo"),
            ExportError::TooManyPhotos(n) => write!(f, "A strip holds at most {} photos, got {}", MAX_PHOTOS, n),
            ExportError::Surface(e) => write!(f, "Export bitmap: {}", e),
            ExportError::Encode(e) => write!(f, "PNG encoding failed: {}", e),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<SurfaceError> for ExportError {
    fn from(e: SurfaceError) -> Self {
        ExportError::Surface(e)
    }
}

impl From<ImageError> for ExportError {
    fn from(e: ImageError) -> Self {
        ExportError::Encode(e)
    }
}

/// Output resolution and branding.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
    pub scale: f32,
    /// Text of the strip watermark and the footer, e.g. `@fondairena`.
    pub watermark: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scale: DEFAULT_EXPORT_SCALE,
            watermark: "@fondairena".to_string(),
        }
    }
}

/// Read-only view of the session data an export needs.
#[derive(Clone, Copy, Debug)]
pub struct ExportRequest<'a> {
    pub strip: StripInputs<'a>,
    pub notes: &'a str,
}

impl<'a> ExportRequest<'a> {
    pub fn from_session(session: &'a Session) -> Self {
        Self {
            strip: StripInputs::from_session(session),
            notes: session.notes(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotesState {
    Placeholder,
    /// `lines` wrapped lines, of which `drawn` fit inside the panel.
    Filled { lines: usize, drawn: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportReport {
    /// Output size in pixels.
    pub width: u32,
    pub height: u32,
    pub scale: f32,
    pub layout: StripLayout,
    pub strip: StripReport,
    pub notes: NotesState,
}

pub struct ExportedImage {
    pub png: Vec<u8>,
    pub report: ExportReport,
}

/// Render the final artifact: strip, notes panel and footer, encoded as PNG.
pub fn export_strip(
    request: &ExportRequest<'_>,
    fonts: &Fonts,
    options: &ExportOptions,
) -> Result<ExportedImage, ExportError> {
    let n = request.strip.photos.len();
    if n == 0 {
        return Err(ExportError::NoPhotos);
    }
    if n > MAX_PHOTOS {
        return Err(ExportError::TooManyPhotos(n));
    }

    let layout = StripLayout::export(n);
    let mut surface = Surface::new(layout.width, layout.height, options.scale).map_err(|e| {
        log_err!("Export: {}", e);
        ExportError::from(e)
    })?;

    let assets = decode_assets(&request.strip);
    let mut cache = GlyphPixelCache::new();

    surface.clear(rgb(0xFFFFFF));
    let strip = paint_strip(&mut surface, &layout, &request.strip, &assets, fonts, &options.watermark, &mut cache);
    let notes = paint_notes(&mut surface, layout.notes, request.notes, fonts, &mut cache);
    paint_footer(&mut surface, layout.footer, &options.watermark, fonts, &mut cache);

    let (width, height) = (surface.width(), surface.height());
    let png = encode_png(&surface.into_image()).map_err(|e| {
        log_err!("Export: {}", e);
        ExportError::from(e)
    })?;

    log_info!(
        "Export: {}x{} px, {} photo(s) drawn, {} skipped, {} sticker(s), drawing {}",
        width,
        height,
        strip.photos_drawn,
        strip.photos_skipped,
        strip.stickers_drawn,
        if strip.drawing_applied { "applied" } else { "none" }
    );

    Ok(ExportedImage {
        png,
        report: ExportReport {
            width,
            height,
            scale: options.scale,
            layout,
            strip,
            notes,
        },
    })
}

/// Notes panel: filled box, a "Notes" tab straddling its top edge, then the
/// wrapped note text or the placeholder.
fn paint_notes(
    surface: &mut Surface,
    panel: Rect,
    notes: &str,
    fonts: &Fonts,
    cache: &mut GlyphPixelCache,
) -> NotesState {
    let font = fonts.text.as_ref();
    surface.fill_rect(panel, NOTES_FILL);
    surface.stroke_rect(panel, NOTES_BORDER, NOTES_BORDER_COLOR);

    let tab = Rect::new(
        panel.x + NOTES_BORDER + NOTES_TAB_LEFT,
        panel.y - NOTES_TAB_RAISE,
        label_width(font, "Notes"),
        label_height(),
    );
    draw_label_tab(surface, font, cache, "Notes", tab, NOTES_TAB_FILL, NOTES_BORDER_COLOR, NOTES_TAB_TEXT);

    let inner = panel.inset(NOTES_BORDER + NOTES_PADDING);
    let top = inner.y + NOTES_TEXT_TOP;
    let limit = panel.bottom() - NOTES_BORDER;

    if notes.is_empty() {
        let style = TextStyle {
            size: NOTE_TEXT_SIZE,
            color: MUTED_TEXT.0,
            italic: true,
            alignment: TextAlignment::Left,
        };
        draw_text_line(surface, font, cache, NOTES_PLACEHOLDER, inner.x, top, NOTE_LINE_HEIGHT, &style);
        return NotesState::Placeholder;
    }

    let lines = wrap_text(notes, inner.w, measurer(font, NOTE_TEXT_SIZE).as_ref());
    let style = TextStyle {
        size: NOTE_TEXT_SIZE,
        color: NOTE_TEXT_COLOR.0,
        italic: false,
        alignment: TextAlignment::Left,
    };
    let mut drawn = 0;
    for (i, line) in lines.iter().enumerate() {
        let line_top = top + i as f32 * NOTE_LINE_HEIGHT;
        if line_top + NOTE_LINE_HEIGHT > limit {
            break;
        }
        draw_text_line(surface, font, cache, line, inner.x, line_top, NOTE_LINE_HEIGHT, &style);
        drawn += 1;
    }
    NotesState::Filled { lines: lines.len(), drawn }
}

fn paint_footer(surface: &mut Surface, footer: Rect, text: &str, fonts: &Fonts, cache: &mut GlyphPixelCache) {
    let style = TextStyle {
        size: LABEL_TEXT_SIZE,
        color: MUTED_TEXT.0,
        italic: false,
        alignment: TextAlignment::Center,
    };
    let cx = footer.x + footer.w * 0.5;
    draw_text_line(surface, fonts.text.as_ref(), cache, text, cx, footer.y, footer.h, &style);
}
