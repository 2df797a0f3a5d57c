// ============================================================================
// SESSION — one visit's photos, strip styling, stickers, drawing and notes
// ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::components::colors::StripColor;
use crate::components::drawing::DrawingBoard;
use crate::components::stickers::StickerSheet;
use crate::io::{ImagePayload, now_ms};
use crate::log_info;

/// Notes longer than this many characters are truncated.
pub const MAX_NOTE_CHARS: usize = 300;

/// A captured or uploaded photo. Position in the session list is its row.
#[derive(Clone, Debug, PartialEq)]
pub struct Photo {
    pub id: Uuid,
    pub payload: ImagePayload,
    pub timestamp_ms: u64,
}

impl Photo {
    pub fn new(payload: ImagePayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            timestamp_ms: now_ms(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Capture,
    Strip,
    Notes,
}

#[derive(Debug, Default)]
pub struct Session {
    step: Step,
    photos: Vec<Photo>,
    strip_color: StripColor,
    stickers: StickerSheet,
    drawing: DrawingBoard,
    notes: String,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn strip_color(&self) -> StripColor {
        self.strip_color
    }

    pub fn set_strip_color(&mut self, color: StripColor) {
        self.strip_color = color;
    }

    pub fn stickers(&self) -> &StickerSheet {
        &self.stickers
    }

    pub fn stickers_mut(&mut self) -> &mut StickerSheet {
        &mut self.stickers
    }

    pub fn drawing(&self) -> &DrawingBoard {
        &self.drawing
    }

    pub fn drawing_mut(&mut self) -> &mut DrawingBoard {
        &mut self.drawing
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Replace the note text, keeping at most [`MAX_NOTE_CHARS`] characters.
    pub fn set_notes(&mut self, text: &str) {
        self.notes = text.chars().take(MAX_NOTE_CHARS).collect();
    }

    /// Export actions exist only once at least one photo is present.
    pub fn can_export(&self) -> bool {
        !self.photos.is_empty()
    }

    // ========================================================================
    // NAVIGATION
    // ========================================================================

    /// Store the captured set and move on to decorating the strip.
    /// An empty set is refused and the step does not change.
    pub fn complete_capture(&mut self, photos: Vec<Photo>) -> bool {
        if photos.is_empty() || self.step != Step::Capture {
            return false;
        }
        log_info!("Session: capture complete with {} photo(s)", photos.len());
        self.photos = photos;
        self.step = Step::Strip;
        true
    }

    /// Strip → Notes.
    pub fn next(&mut self) -> bool {
        self.go(Step::Strip, Step::Notes)
    }

    /// Notes → Strip.
    pub fn back(&mut self) -> bool {
        self.go(Step::Notes, Step::Strip)
    }

    /// Strip → Capture. Photos stay in the session until the next capture
    /// completes.
    pub fn back_to_capture(&mut self) -> bool {
        self.go(Step::Strip, Step::Capture)
    }

    fn go(&mut self, from: Step, to: Step) -> bool {
        if self.step != from {
            return false;
        }
        self.step = to;
        true
    }

    /// Start over. The strip colour is the one thing that survives.
    pub fn reset(&mut self) {
        log_info!("Session: start over");
        self.photos.clear();
        self.stickers.clear();
        self.drawing.clear();
        self.notes.clear();
        self.step = Step::Capture;
    }
}
