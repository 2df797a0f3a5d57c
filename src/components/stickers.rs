// ============================================================================
// STICKER SHEET — placed emoji overlays with drag / rotate / scale controls
// ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a freshly added sticker lands, in strip-local pixels.
pub const STICKER_SPAWN: (f32, f32) = (150.0, 150.0);

/// Rotation applied by one press of the rotate control.
pub const ROTATE_STEP_DEG: f32 = 45.0;

/// Scale values visited by the resize control, in order.
pub const SCALE_CYCLE: [f32; 3] = [1.0, 1.5, 0.7];

/// Sticker picker catalog: (category, emoji).
pub const STICKER_CATEGORIES: &[(&str, &[&str])] = &[
    ("Hearts", &["❤️", "💕", "💖", "💗", "💓", "💝", "💞", "💘", "🩷", "🩵"]),
    ("Smileys", &["😊", "🥰", "😍", "🤩", "😘", "😚", "😙", "😗", "🙂", "😇"]),
    ("Sparkles", &["✨", "⭐", "🌟", "💫", "⚡", "🔥", "💥", "💢", "🌈", "☀️"]),
    ("Nature", &["🌸", "🌺", "🌼", "🌻", "🌷", "🌹", "💐", "🌿", "🍀", "🦋"]),
    ("Objects", &["💌", "💎", "👑", "🎀", "🎁", "🎈", "🎉", "🎊", "🪩", "🎨"]),
    ("Food", &["🍓", "🍒", "🍑", "🍋", "🍊", "🍉", "🍰", "🧁", "🍪", "🍩"]),
];

/// A placed emoji.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sticker {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub emoji: String,
    /// Centre position in strip-local pixels.
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Degrees, kept in `[0, 360)`.
    #[serde(default)]
    pub rotation: f32,
}

fn default_scale() -> f32 {
    1.0
}

impl Sticker {
    pub fn new(emoji: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            emoji: emoji.into(),
            x: STICKER_SPAWN.0,
            y: STICKER_SPAWN.1,
            scale: 1.0,
            rotation: 0.0,
        }
    }

    /// Apply a partial update; `None` fields are left untouched.
    pub fn apply(&mut self, patch: &StickerPatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(scale) = patch.scale {
            self.scale = scale;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation.rem_euclid(360.0);
        }
    }
}

/// Partial sticker attributes for [`StickerSheet::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StickerPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub scale: Option<f32>,
    pub rotation: Option<f32>,
}

impl StickerPatch {
    pub fn position(x: f32, y: f32) -> Self {
        Self { x: Some(x), y: Some(y), ..Default::default() }
    }
}

/// Next value of the resize control. Values outside the cycle snap back to 1.
pub fn next_scale(current: f32) -> f32 {
    if current == SCALE_CYCLE[0] {
        SCALE_CYCLE[1]
    } else if current == SCALE_CYCLE[1] {
        SCALE_CYCLE[2]
    } else {
        SCALE_CYCLE[0]
    }
}

/// Next value of the rotate control, wrapping at 360°.
pub fn next_rotation(current: f32) -> f32 {
    (current + ROTATE_STEP_DEG).rem_euclid(360.0)
}

/// Captured at grab time so dragging follows the pointer delta instead of
/// snapping the sticker centre to the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragGrab {
    pub id: Uuid,
    pointer_start: (f32, f32),
    sticker_start: (f32, f32),
}

/// Ordered collection of placed stickers. Later entries draw on top.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StickerSheet {
    stickers: Vec<Sticker>,
}

impl StickerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Sticker] {
        &self.stickers
    }

    pub fn len(&self) -> usize {
        self.stickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stickers.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Sticker> {
        self.stickers.iter().find(|s| s.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Option<&mut Sticker> {
        self.stickers.iter_mut().find(|s| s.id == id)
    }

    /// Place a new sticker at the spawn point and return its id.
    pub fn add(&mut self, emoji: &str) -> Uuid {
        let sticker = Sticker::new(emoji);
        let id = sticker.id;
        self.stickers.push(sticker);
        id
    }

    /// Insert a fully specified sticker (design files, tests).
    pub fn push(&mut self, sticker: Sticker) {
        self.stickers.push(sticker);
    }

    /// Returns `false` when no sticker has this id.
    pub fn update(&mut self, id: Uuid, patch: &StickerPatch) -> bool {
        match self.get_mut(id) {
            Some(sticker) => {
                sticker.apply(patch);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.stickers.len();
        self.stickers.retain(|s| s.id != id);
        self.stickers.len() != before
    }

    /// Rotate control: +45°.
    pub fn rotate(&mut self, id: Uuid) -> bool {
        let Some(rotation) = self.get(id).map(|s| next_rotation(s.rotation)) else {
            return false;
        };
        self.update(id, &StickerPatch { rotation: Some(rotation), ..Default::default() })
    }

    /// Resize control: 1 → 1.5 → 0.7 → 1.
    pub fn cycle_scale(&mut self, id: Uuid) -> bool {
        let Some(scale) = self.get(id).map(|s| next_scale(s.scale)) else {
            return false;
        };
        self.update(id, &StickerPatch { scale: Some(scale), ..Default::default() })
    }

    /// Start dragging a sticker from the given pointer position.
    pub fn grab(&self, id: Uuid, pointer: (f32, f32)) -> Option<DragGrab> {
        self.get(id).map(|s| DragGrab {
            id,
            pointer_start: pointer,
            sticker_start: (s.x, s.y),
        })
    }

    /// Move a grabbed sticker so it keeps its offset from the pointer.
    pub fn drag_to(&mut self, grab: &DragGrab, pointer: (f32, f32)) -> bool {
        let dx = pointer.0 - grab.pointer_start.0;
        let dy = pointer.1 - grab.pointer_start.1;
        self.update(
            grab.id,
            &StickerPatch::position(grab.sticker_start.0 + dx, grab.sticker_start.1 + dy),
        )
    }

    pub fn clear(&mut self) {
        self.stickers.clear();
    }
}
