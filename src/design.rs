// ============================================================================
// DESIGN FILES — stickers, strokes, colour and notes as JSON
// ============================================================================
//
// {
//   "color": "mint",
//   "stickers": [{ "emoji": "💖", "x": 60, "y": 40, "scale": 1.5, "rotation": 45 }],
//   "strokes": [{ "points": [{ "x": 10, "y": 10 }, { "x": 90, "y": 30 }], "ink": "red", "tool": "marker" }],
//   "notes": "best day ever"
// }

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::colors::{DrawingTool, InkColor, StripColor};
use crate::components::stickers::Sticker;
use crate::ops::strokes::Point;
use crate::session::Session;

#[derive(Debug)]
pub enum DesignError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for DesignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesignError::Io(e) => write!(f, "I/O error: {}", e),
            DesignError::Parse(e) => write!(f, "Invalid design JSON: {}", e),
            DesignError::Invalid(e) => write!(f, "Invalid design: {}", e),
        }
    }
}

impl std::error::Error for DesignError {}

impl From<std::io::Error> for DesignError {
    fn from(e: std::io::Error) -> Self {
        DesignError::Io(e)
    }
}

impl From<serde_json::Error> for DesignError {
    fn from(e: serde_json::Error) -> Self {
        DesignError::Parse(e)
    }
}

/// One freehand stroke, replayed through the drawing board with its tool
/// and ink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignStroke {
    pub points: Vec<Point>,
    #[serde(default)]
    pub ink: InkColor,
    #[serde(default)]
    pub tool: DrawingTool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Design {
    pub color: Option<StripColor>,
    pub stickers: Vec<Sticker>,
    pub strokes: Vec<DesignStroke>,
    pub notes: Option<String>,
}

impl Design {
    pub fn from_json(text: &str) -> Result<Self, DesignError> {
        let design: Design = serde_json::from_str(text)?;
        design.validate()?;
        Ok(design)
    }

    pub fn load(path: &Path) -> Result<Self, DesignError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<(), DesignError> {
        for (i, s) in self.stickers.iter().enumerate() {
            if s.emoji.trim().is_empty() {
                return Err(DesignError::Invalid(format!("sticker {} has no emoji", i + 1)));
            }
            if ![s.x, s.y, s.scale, s.rotation].iter().all(|v| v.is_finite()) || s.scale <= 0.0 {
                return Err(DesignError::Invalid(format!("sticker {} has a bad position, scale or rotation", i + 1)));
            }
        }
        for (i, stroke) in self.strokes.iter().enumerate() {
            if stroke.points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
                return Err(DesignError::Invalid(format!("stroke {} has a non-finite point", i + 1)));
            }
        }
        Ok(())
    }

    /// Merge into a session: stickers and strokes are appended after what is
    /// already there; colour and notes replace when present.
    pub fn apply(&self, session: &mut Session) {
        if let Some(color) = self.color {
            session.set_strip_color(color);
        }
        for sticker in &self.stickers {
            let mut sticker = sticker.clone();
            sticker.rotation = sticker.rotation.rem_euclid(360.0);
            session.stickers_mut().push(sticker);
        }
        let board = session.drawing_mut();
        let (tool, ink) = (board.tool(), board.ink());
        for stroke in &self.strokes {
            let Some((first, rest)) = stroke.points.split_first() else { continue };
            board.set_tool(stroke.tool);
            board.set_ink(stroke.ink);
            board.press(*first);
            for p in rest {
                board.move_to(*p);
            }
            board.release();
        }
        board.set_tool(tool);
        board.set_ink(ink);
        if let Some(notes) = &self.notes {
            session.set_notes(notes);
        }
    }
}
