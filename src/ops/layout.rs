// ============================================================================
// STRIP LAYOUT — fixed logical geometry of the exported artifact
// ============================================================================
//
// All values are logical units (1x). The export surface multiplies them by
// its scale. Photo rows are 4:3 and every constant is fixed, so the whole
// layout is a pure function of the photo count.

use crate::canvas::Rect;

pub const MAX_PHOTOS: usize = 4;

pub const CANVAS_WIDTH: f32 = 420.0;
pub const OUTER_PADDING: f32 = 32.0;
pub const STRIP_WIDTH: f32 = CANVAS_WIDTH - 2.0 * OUTER_PADDING;
pub const STRIP_BORDER: f32 = 2.0;
pub const STRIP_PADDING: f32 = 24.0;
pub const PHOTO_WIDTH: f32 = STRIP_WIDTH - 2.0 * STRIP_BORDER - 2.0 * STRIP_PADDING;
pub const PHOTO_ASPECT: f32 = 4.0 / 3.0;
pub const PHOTO_HEIGHT: f32 = PHOTO_WIDTH * 3.0 / 4.0;
pub const PHOTO_SPACING: f32 = 16.0;
pub const PHOTO_BORDER: f32 = 2.0;

pub const NOTES_GAP: f32 = 24.0;
pub const NOTES_HEIGHT: f32 = 140.0;
pub const NOTES_BORDER: f32 = 2.0;
pub const NOTES_PADDING: f32 = 24.0;
pub const NOTES_TEXT_TOP: f32 = 8.0;
pub const NOTE_TEXT_SIZE: f32 = 16.0;
pub const NOTE_LINE_HEIGHT: f32 = 24.0;

pub const FOOTER_GAP: f32 = 16.0;
pub const FOOTER_HEIGHT: f32 = 20.0;

pub const LABEL_TEXT_SIZE: f32 = 14.0;
pub const STICKER_SIZE: f32 = 32.0;

/// Height of a strip holding `n` photos.
pub fn strip_height(n: usize) -> f32 {
    let n = n as f32;
    STRIP_PADDING * 2.0
        + n * PHOTO_HEIGHT
        + PHOTO_SPACING * (n - 1.0).max(0.0)
        + STRIP_BORDER * 2.0
}

/// Height of the whole exported artifact for `n` photos.
pub fn canvas_height(n: usize) -> f32 {
    OUTER_PADDING
        + strip_height(n)
        + NOTES_GAP
        + NOTES_HEIGHT
        + FOOTER_GAP
        + FOOTER_HEIGHT
        + OUTER_PADDING
}

/// Resolved rectangles for one export.
#[derive(Clone, Debug, PartialEq)]
pub struct StripLayout {
    pub width: f32,
    pub height: f32,
    /// Outer strip box, border included.
    pub strip: Rect,
    /// One rect per photo row, white border included, in list order.
    pub photo_rows: Vec<Rect>,
    pub notes: Rect,
    pub footer: Rect,
}

impl StripLayout {
    /// Layout of the full export canvas.
    pub fn export(n: usize) -> Self {
        let strip = Rect::new(OUTER_PADDING, OUTER_PADDING, STRIP_WIDTH, strip_height(n));
        let notes = Rect::new(OUTER_PADDING, strip.bottom() + NOTES_GAP, STRIP_WIDTH, NOTES_HEIGHT);
        let footer = Rect::new(OUTER_PADDING, notes.bottom() + FOOTER_GAP, STRIP_WIDTH, FOOTER_HEIGHT);
        Self {
            width: CANVAS_WIDTH,
            height: canvas_height(n),
            photo_rows: photo_rows(strip, n),
            strip,
            notes,
            footer,
        }
    }

    /// Layout of a bare strip (no margins, notes or footer).
    pub fn strip_only(n: usize) -> Self {
        let strip = Rect::new(0.0, 0.0, STRIP_WIDTH, strip_height(n));
        Self {
            width: STRIP_WIDTH,
            height: strip.h,
            photo_rows: photo_rows(strip, n),
            strip,
            notes: Rect::default(),
            footer: Rect::default(),
        }
    }

    /// Strip area inside its border: the frame stickers and drawing use.
    pub fn strip_inner(&self) -> Rect {
        self.strip.inset(STRIP_BORDER)
    }
}

fn photo_rows(strip: Rect, n: usize) -> Vec<Rect> {
    let x = strip.x + STRIP_BORDER + STRIP_PADDING;
    let top = strip.y + STRIP_BORDER + STRIP_PADDING;
    (0..n)
        .map(|i| {
            let y = top + i as f32 * (PHOTO_HEIGHT + PHOTO_SPACING);
            Rect::new(x, y, PHOTO_WIDTH, PHOTO_HEIGHT)
        })
        .collect()
}
