// ============================================================================
// PALETTES — strip backgrounds and drawing ink
// ============================================================================

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Build an opaque colour from a `0xRRGGBB` literal.
pub const fn rgb(hex: u32) -> Rgba<u8> {
    Rgba([
        ((hex >> 16) & 0xFF) as u8,
        ((hex >> 8) & 0xFF) as u8,
        (hex & 0xFF) as u8,
        255,
    ])
}

/// Strip background colour. Exactly eight named swatches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripColor {
    #[default]
    Pink,
    Lavender,
    Mint,
    Peach,
    Sky,
    Lemon,
    Rose,
    Cream,
}

impl StripColor {
    /// All swatches in picker order.
    pub fn all() -> &'static [StripColor] {
        &[
            StripColor::Pink,
            StripColor::Lavender,
            StripColor::Mint,
            StripColor::Peach,
            StripColor::Sky,
            StripColor::Lemon,
            StripColor::Rose,
            StripColor::Cream,
        ]
    }

    /// Stable lowercase key, used in settings files and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            StripColor::Pink => "pink",
            StripColor::Lavender => "lavender",
            StripColor::Mint => "mint",
            StripColor::Peach => "peach",
            StripColor::Sky => "sky",
            StripColor::Lemon => "lemon",
            StripColor::Rose => "rose",
            StripColor::Cream => "cream",
        }
    }

    pub fn rgba(&self) -> Rgba<u8> {
        match self {
            StripColor::Pink => rgb(0xFFD6E8),
            StripColor::Lavender => rgb(0xE6D6FF),
            StripColor::Mint => rgb(0xD6FFE8),
            StripColor::Peach => rgb(0xFFE6D6),
            StripColor::Sky => rgb(0xD6E8FF),
            StripColor::Lemon => rgb(0xFFFFD6),
            StripColor::Rose => rgb(0xFFD6D6),
            StripColor::Cream => rgb(0xFFF5E6),
        }
    }
}

impl fmt::Display for StripColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StripColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        StripColor::all()
            .iter()
            .copied()
            .find(|c| c.name() == key)
            .ok_or_else(|| {
                format!(
                    "unknown strip color '{}' (expected one of: {})",
                    s,
                    StripColor::all()
                        .iter()
                        .map(|c| c.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// Ink colours offered by the drawing tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InkColor {
    #[default]
    Black,
    Red,
    Blue,
    Pink,
    Purple,
    Green,
}

impl InkColor {
    pub fn rgba(&self) -> Rgba<u8> {
        match self {
            InkColor::Black => rgb(0x000000),
            InkColor::Red => rgb(0xEF4444),
            InkColor::Blue => rgb(0x3B82F6),
            InkColor::Pink => rgb(0xEC4899),
            InkColor::Purple => rgb(0xA855F7),
            InkColor::Green => rgb(0x10B981),
        }
    }
}

/// Drawing tool presets. Each tool only differs by line width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingTool {
    Pencil,
    #[default]
    Pen,
    Marker,
}

impl DrawingTool {
    pub fn line_width(&self) -> f32 {
        match self {
            DrawingTool::Pencil => 2.0,
            DrawingTool::Pen => 3.0,
            DrawingTool::Marker => 8.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_colors_parse_by_name() {
        for color in StripColor::all() {
            assert_eq!(color.name().parse::<StripColor>(), Ok(*color));
        }
        assert_eq!(" MINT ".parse::<StripColor>(), Ok(StripColor::Mint));
        assert!("teal".parse::<StripColor>().is_err());
    }

    #[test]
    fn strip_palette_has_eight_swatches() {
        assert_eq!(StripColor::all().len(), 8);
        assert_eq!(StripColor::Mint.rgba(), Rgba([0xD6, 0xFF, 0xE8, 255]));
        assert_eq!(StripColor::default(), StripColor::Pink);
    }

    #[test]
    fn tool_widths() {
        assert_eq!(DrawingTool::Pencil.line_width(), 2.0);
        assert_eq!(DrawingTool::default().line_width(), 3.0);
        assert_eq!(DrawingTool::Marker.line_width(), 8.0);
    }
}
