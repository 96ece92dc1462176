//! A `RenderSurface` that records draw calls instead of issuing them,
//! used by unit tests to assert on the renderer's draw order and state
//! transitions without a real GPU device.

use super::{Point, Rect, RenderError, RenderSurface};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedOp {
    Clear(u32),
    FillRect(Rect, u32),
    PushClip(Rect),
    PopClip,
    DrawLayout(u32, Point),
    GutterLineNumber(Point, u32, u32),
    DrawCaret(Point, f32, u32),
    DrawBitmap(u32, Point),
    Present(Option<Rect>),
}

#[derive(Default)]
pub struct RecordingSurface {
    pub ops: Vec<RecordedOp>,
    next_bitmap_id: u32,
    fail_bitmap_creation: bool,
}

impl RecordingSurface {
    pub fn failing() -> Self {
        RecordingSurface { fail_bitmap_creation: true, ..Default::default() }
    }
}

impl RenderSurface for RecordingSurface {
    type Layout = u32;
    type Bitmap = u32;

    fn clear(&mut self, color: u32) {
        self.ops.push(RecordedOp::Clear(color));
    }

    fn fill_rect(&mut self, rect: Rect, color: u32) {
        self.ops.push(RecordedOp::FillRect(rect, color));
    }

    fn push_clip(&mut self, rect: Rect) {
        self.ops.push(RecordedOp::PushClip(rect));
    }

    fn pop_clip(&mut self) {
        self.ops.push(RecordedOp::PopClip);
    }

    fn draw_layout(&mut self, layout: &u32, origin: Point) {
        self.ops.push(RecordedOp::DrawLayout(*layout, origin));
    }

    fn draw_gutter_line_number(&mut self, origin: Point, number: u32, color: u32) {
        self.ops.push(RecordedOp::GutterLineNumber(origin, number, color));
    }

    fn draw_caret(&mut self, origin: Point, height: f32, color: u32) {
        self.ops.push(RecordedOp::DrawCaret(origin, height, color));
    }

    fn create_bitmap(&mut self, layout: &u32, _width: f32, _height: f32) -> Result<u32, RenderError> {
        if self.fail_bitmap_creation {
            return Err(RenderError::ResourceCreation);
        }
        self.next_bitmap_id += 1;
        let _ = layout;
        Ok(self.next_bitmap_id)
    }

    fn draw_bitmap(&mut self, bitmap: &u32, origin: Point) {
        self.ops.push(RecordedOp::DrawBitmap(*bitmap, origin));
    }

    fn present(&mut self, dirty: Option<Rect>) -> Result<(), RenderError> {
        self.ops.push(RecordedOp::Present(dirty));
        Ok(())
    }
}
