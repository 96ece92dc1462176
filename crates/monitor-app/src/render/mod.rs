//! Renderer state machine and the rendering-surface seam. The concrete
//! GPU backend is out of scope; [`RenderSurface`] is the contract any
//! backend (or, in tests, a recording stub) must satisfy.

mod geometry;
mod recording;

pub use geometry::{Point, Rect};
pub use recording::{RecordingSurface, RecordedOp};

use scopewatch_core::ColorSpan;
use scopewatch_rpc::Sequence;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("failed to create GPU resource for this slice")]
    ResourceCreation,
    #[error("rendering device was lost and must be recreated")]
    DeviceLost,
}

/// Everything a concrete rendering backend must provide. Generic over
/// the layout type produced by a [`crate::layout::TextShaper`] and an
/// opaque, backend-owned bitmap handle for cached slice rasterizations.
pub trait RenderSurface {
    type Layout: Clone;
    type Bitmap: Clone;

    fn clear(&mut self, color: u32);
    fn fill_rect(&mut self, rect: Rect, color: u32);
    fn push_clip(&mut self, rect: Rect);
    fn pop_clip(&mut self);
    fn draw_layout(&mut self, layout: &Self::Layout, origin: Point);
    fn draw_gutter_line_number(&mut self, origin: Point, number: u32, color: u32);
    fn draw_caret(&mut self, origin: Point, height: f32, color: u32);
    fn create_bitmap(&mut self, layout: &Self::Layout, width: f32, height: f32) -> Result<Self::Bitmap, RenderError>;
    fn draw_bitmap(&mut self, bitmap: &Self::Bitmap, origin: Point);
    /// Presents the frame. `dirty` is `Some` for a partial (scroll-copy)
    /// present, `None` for a full repaint.
    fn present(&mut self, dirty: Option<Rect>) -> Result<(), RenderError>;
}

/// Which half of the rendering-source decision the viewer is currently
/// in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    AutoScroll,
    ScrollBack,
}

/// State machine driving what [`Renderer::draw`] actually paints:
/// - `NoLayout`: nothing shaped yet, draw nothing but chrome.
/// - `LayoutReady`: a freshly shaped layout for the current viewport,
///   not yet promoted to a cached bitmap.
/// - `SliceBitmapReady`: the common steady-state in `ScrollBack` — blit
///   the cached rasterization.
/// - `FallbackOnly`: a resource failure (out-of-memory creating a slice
///   bitmap) forces falling back to live layout draws every frame until
///   a bitmap can be created again.
/// - `TailOnly`: `AutoScroll` mode's fast path, always drawing the most
///   recent layout directly.
#[derive(Debug, Clone)]
pub enum RenderState<L, B> {
    NoLayout,
    LayoutReady(L),
    SliceBitmapReady(B),
    FallbackOnly(L),
    TailOnly(L),
}

/// Resolved per-frame inputs the view controller hands the renderer.
/// The renderer itself never touches `Document` or `ViewController`
/// state directly — keeping workers and the draw path free of that
/// coupling is what lets both run against a recording stub in tests.
pub struct FrameContext<'a> {
    pub viewport: Rect,
    pub gutter_width: f32,
    pub background_color: u32,
    pub gutter_color: u32,
    pub mode: RenderMode,
    pub selection_rects: &'a [Rect],
    pub selection_color: u32,
    pub search_highlight_rects: &'a [Rect],
    pub search_highlight_color: u32,
    pub color_spans: &'a [ColorSpan],
    /// One `(origin, line number)` pair per visible gutter row, drawn
    /// over the gutter background after the text layout/bitmap.
    pub gutter_line_numbers: &'a [(Point, u32)],
    pub gutter_text_color: u32,
    pub caret: Option<(Point, f32, u32)>,
    pub content_origin: Point,
    /// `Some((dy, dirty))` when the frame is a scroll-copy of the
    /// previous one and only `dirty` needs a fresh paint.
    pub partial_present: Option<(f32, Rect)>,
}

/// Owns the current [`RenderState`] and turns a [`FrameContext`] plus
/// that state into draw calls against a [`RenderSurface`].
pub struct Renderer<S: RenderSurface> {
    state: RenderState<S::Layout, S::Bitmap>,
    current_sequence: Sequence,
}

impl<S: RenderSurface> Default for Renderer<S> {
    fn default() -> Self {
        Renderer { state: RenderState::NoLayout, current_sequence: 0 }
    }
}

impl<S: RenderSurface> Renderer<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RenderState<S::Layout, S::Bitmap> {
        &self.state
    }

    pub fn current_sequence(&self) -> Sequence {
        self.current_sequence
    }

    /// A worker's layout result arrived, tagged with the sequence of the
    /// request that produced it. A packet older than the sequence already
    /// applied is dropped — it was superseded by a newer scroll/resize/
    /// filter change before the worker finished. Returns whether the
    /// packet was applied.
    pub fn on_layout_ready(&mut self, sequence: Sequence, layout: S::Layout, mode: RenderMode) -> bool {
        if sequence < self.current_sequence {
            return false;
        }
        self.current_sequence = sequence;
        self.state = match mode {
            RenderMode::AutoScroll => RenderState::TailOnly(layout),
            RenderMode::ScrollBack => RenderState::LayoutReady(layout),
        };
        true
    }

    /// A worker's width-measurement result arrived. Rejects a packet
    /// older than the sequence already applied, the same staleness rule
    /// [`Self::on_layout_ready`] enforces, so a scroll-triggered width
    /// rescan can't be overwritten by a slower, now-obsolete one.
    pub fn on_width_ready(&mut self, sequence: Sequence) -> bool {
        if sequence < self.current_sequence {
            return false;
        }
        self.current_sequence = sequence;
        true
    }

    /// Attempts to promote a `LayoutReady` state to `SliceBitmapReady`
    /// by rasterizing into the surface. On resource failure, falls back
    /// to `FallbackOnly` so subsequent frames keep drawing the live
    /// layout rather than erroring out.
    pub fn promote_to_bitmap(&mut self, surface: &mut S, width: f32, height: f32) {
        if let RenderState::LayoutReady(layout) = &self.state {
            match surface.create_bitmap(layout, width, height) {
                Ok(bitmap) => self.state = RenderState::SliceBitmapReady(bitmap),
                Err(_) => self.state = RenderState::FallbackOnly(layout.clone()),
            }
        }
    }

    pub fn on_device_lost(&mut self) {
        self.state = RenderState::NoLayout;
    }

    pub fn needs_fallback(&self) -> bool {
        matches!(self.state, RenderState::FallbackOnly(_))
    }

    /// Draws one frame: clear, gutter, clip to content area, search
    /// highlights under selection under text, pop clip, gutter line
    /// numbers, caret.
    pub fn draw(&self, surface: &mut S, ctx: &FrameContext<'_>) -> Result<(), RenderError> {
        surface.clear(ctx.background_color);
        if ctx.gutter_width > 0.0 {
            let gutter_rect = Rect {
                x: ctx.viewport.x,
                y: ctx.viewport.y,
                width: ctx.gutter_width,
                height: ctx.viewport.height,
            };
            surface.fill_rect(gutter_rect, ctx.gutter_color);
        }

        let content_rect = Rect {
            x: ctx.viewport.x + ctx.gutter_width,
            y: ctx.viewport.y,
            width: (ctx.viewport.width - ctx.gutter_width).max(0.0),
            height: ctx.viewport.height,
        };
        surface.push_clip(content_rect);

        for rect in ctx.search_highlight_rects {
            surface.fill_rect(*rect, ctx.search_highlight_color);
        }
        for rect in ctx.selection_rects {
            surface.fill_rect(*rect, ctx.selection_color);
        }

        match &self.state {
            RenderState::NoLayout => {}
            RenderState::LayoutReady(layout) | RenderState::FallbackOnly(layout) | RenderState::TailOnly(layout) => {
                surface.draw_layout(layout, ctx.content_origin);
            }
            RenderState::SliceBitmapReady(bitmap) => {
                surface.draw_bitmap(bitmap, ctx.content_origin);
            }
        }

        surface.pop_clip();

        for (origin, number) in ctx.gutter_line_numbers {
            surface.draw_gutter_line_number(*origin, *number, ctx.gutter_text_color);
        }

        if let Some((origin, height, color)) = ctx.caret {
            surface.draw_caret(origin, height, color);
        }

        surface.present(ctx.partial_present.map(|(_, dirty)| dirty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recording::RecordingSurface;

    #[test]
    fn tail_only_draws_layout_not_bitmap() {
        let mut renderer: Renderer<RecordingSurface> = Renderer::new();
        assert!(renderer.on_layout_ready(1, 42u32, RenderMode::AutoScroll));
        assert!(matches!(renderer.state(), RenderState::TailOnly(42)));

        let mut surface = RecordingSurface::default();
        let ctx = FrameContext {
            viewport: Rect { x: 0.0, y: 0.0, width: 800.0, height: 600.0 },
            gutter_width: 40.0,
            background_color: 0,
            gutter_color: 1,
            mode: RenderMode::AutoScroll,
            selection_rects: &[],
            selection_color: 0,
            search_highlight_rects: &[],
            search_highlight_color: 0,
            color_spans: &[],
            gutter_line_numbers: &[],
            gutter_text_color: 0,
            caret: None,
            content_origin: Point { x: 40.0, y: 0.0 },
            partial_present: None,
        };
        renderer.draw(&mut surface, &ctx).unwrap();
        assert!(surface.ops.iter().any(|op| matches!(op, RecordedOp::DrawLayout(42, _))));
    }

    #[test]
    fn stale_layout_sequence_is_rejected() {
        let mut renderer: Renderer<RecordingSurface> = Renderer::new();
        assert!(renderer.on_layout_ready(5, 1u32, RenderMode::ScrollBack));
        assert!(!renderer.on_layout_ready(3, 2u32, RenderMode::ScrollBack));
        assert!(matches!(renderer.state(), RenderState::LayoutReady(1)));
        assert_eq!(renderer.current_sequence(), 5);
    }

    #[test]
    fn bitmap_creation_failure_falls_back_to_layout_draw() {
        let mut renderer: Renderer<RecordingSurface> = Renderer::new();
        renderer.on_layout_ready(1, 7u32, RenderMode::ScrollBack);
        let mut surface = RecordingSurface::failing();
        renderer.promote_to_bitmap(&mut surface, 100.0, 100.0);
        assert!(matches!(renderer.state(), RenderState::FallbackOnly(7)));
        assert!(renderer.needs_fallback());
    }

    #[test]
    fn device_lost_resets_to_no_layout() {
        let mut renderer: Renderer<RecordingSurface> = Renderer::new();
        renderer.on_layout_ready(1, 1u32, RenderMode::ScrollBack);
        renderer.on_device_lost();
        assert!(matches!(renderer.state(), RenderState::NoLayout));
    }
}
