// ============================================================================
// DRAWING BOARD — pointer strokes, undo/clear, flattened raster publishing
// ============================================================================

use crate::components::colors::{DrawingTool, InkColor};
use crate::io::{ImagePayload, encode_png};
use crate::ops::strokes::{Point, Stroke, rasterize_strokes};
use crate::log_err;

/// Logical size of the drawing surface laid over the strip.
pub const DRAWING_WIDTH: u32 = 340;
pub const DRAWING_HEIGHT: u32 = 600;

/// Freehand layer. Finished strokes are kept in order; the flattened PNG is
/// recomputed after every change to that list.
#[derive(Clone, Debug, Default)]
pub struct DrawingBoard {
    strokes: Vec<Stroke>,
    active: Option<Stroke>,
    tool: DrawingTool,
    ink: InkColor,
    raster: Option<ImagePayload>,
}

impl DrawingBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(&self) -> DrawingTool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: DrawingTool) {
        self.tool = tool;
    }

    pub fn ink(&self) -> InkColor {
        self.ink
    }

    pub fn set_ink(&mut self, ink: InkColor) {
        self.ink = ink;
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn is_pressed(&self) -> bool {
        self.active.is_some()
    }

    /// Published raster; `None` means "no drawing", never a blank image.
    pub fn raster(&self) -> Option<&ImagePayload> {
        self.raster.as_ref()
    }

    /// Pointer down: start a stroke with the current tool and ink.
    pub fn press(&mut self, at: Point) {
        self.active = Some(Stroke {
            points: vec![at],
            color: self.ink.rgba().0,
            width: self.tool.line_width(),
        });
    }

    /// Pointer move. Ignored unless pressed.
    pub fn move_to(&mut self, at: Point) {
        if let Some(stroke) = self.active.as_mut() {
            stroke.points.push(at);
        }
    }

    /// Pointer up: finalize the stroke in progress.
    pub fn release(&mut self) {
        if let Some(stroke) = self.active.take() {
            self.strokes.push(stroke);
            self.republish();
        }
    }

    /// Pointer left the drawing area; same as releasing while pressed.
    pub fn leave(&mut self) {
        self.release();
    }

    /// Append an already finished stroke (design files).
    pub fn push_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
        self.republish();
    }

    /// Remove the most recently finished stroke. Returns `false` if empty.
    pub fn undo(&mut self) -> bool {
        if self.strokes.pop().is_some() {
            self.republish();
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.active = None;
        self.strokes.clear();
        self.republish();
    }

    fn republish(&mut self) {
        if self.strokes.is_empty() {
            self.raster = None;
            return;
        }
        let layer = rasterize_strokes(&self.strokes, DRAWING_WIDTH, DRAWING_HEIGHT, 1.0);
        self.raster = match encode_png(&layer) {
            Ok(bytes) => Some(ImagePayload::new(bytes)),
            Err(e) => {
                log_err!("Drawing: failed to encode layer: {}", e);
                None
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::decode_image;

    fn scribble(board: &mut DrawingBoard, from: (f32, f32), to: (f32, f32)) {
        board.press(from.into());
        board.move_to(((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0).into());
        board.move_to(to.into());
        board.release();
    }

    #[test]
    fn empty_board_publishes_no_drawing() {
        let board = DrawingBoard::new();
        assert!(board.raster().is_none());
    }

    #[test]
    fn finished_stroke_publishes_raster() {
        let mut board = DrawingBoard::new();
        scribble(&mut board, (10.0, 10.0), (100.0, 100.0));
        let raster = board.raster().expect("raster after stroke");
        let img = decode_image(raster).unwrap();
        assert_eq!(img.dimensions(), (DRAWING_WIDTH, DRAWING_HEIGHT));
        assert_eq!(img.get_pixel(55, 55)[3], 255);
    }

    #[test]
    fn move_without_press_is_ignored() {
        let mut board = DrawingBoard::new();
        board.move_to((5.0, 5.0).into());
        board.release();
        assert!(board.strokes().is_empty());
    }

    #[test]
    fn undo_pops_only_the_latest_stroke() {
        let mut board = DrawingBoard::new();
        board.set_ink(InkColor::Red);
        scribble(&mut board, (10.0, 10.0), (50.0, 10.0));
        board.set_tool(DrawingTool::Marker);
        scribble(&mut board, (10.0, 40.0), (50.0, 40.0));
        assert_eq!(board.strokes().len(), 2);

        assert!(board.undo());
        assert_eq!(board.strokes().len(), 1);
        assert_eq!(board.strokes()[0].width, DrawingTool::Pen.line_width());
        assert!(board.raster().is_some());

        assert!(board.undo());
        assert!(board.raster().is_none());
        assert!(!board.undo());
    }

    #[test]
    fn leaving_the_area_finalizes_the_stroke() {
        let mut board = DrawingBoard::new();
        board.press((1.0, 1.0).into());
        board.move_to((20.0, 1.0).into());
        board.leave();
        assert!(!board.is_pressed());
        assert_eq!(board.strokes().len(), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let mut board = DrawingBoard::new();
        scribble(&mut board, (10.0, 10.0), (50.0, 50.0));
        board.press((0.0, 0.0).into());
        board.clear();
        assert!(board.strokes().is_empty());
        assert!(!board.is_pressed());
        assert!(board.raster().is_none());
    }
}
