//! Viewport state, the `AUTO_SCROLL`/`SCROLL_BACK` mode policy, adaptive
//! debounce scheduling, and caret/selection handling.
//!
//! State here is plain fields mutated by explicit calls rather than
//! reactive signals, since the GPU/UI event loop itself is out of
//! scope.

use std::time::Duration;

use crate::render::{Point, Rect, RenderMode};

/// Fallback average glyph width used to turn a row/column position into
/// a pixel rect before a real measured width is available. Matches the
/// default font size's rough monospace advance.
const DEFAULT_AVERAGE_CHAR_WIDTH: f32 = 8.0;

/// How aggressively new-line arrival should be coalesced before the
/// viewport recomputes layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceTier {
    /// Fewer than 100 new lines: apply immediately.
    Sync,
    /// 100–1000 new lines: a short timer to coalesce bursts.
    Fast,
    /// More than 1000 new lines: a longer timer under sustained load.
    Standard,
}

pub fn debounce_tier_for(new_line_count: usize) -> DebounceTier {
    if new_line_count < 100 {
        DebounceTier::Sync
    } else if new_line_count <= 1000 {
        DebounceTier::Fast
    } else {
        DebounceTier::Standard
    }
}

pub fn debounce_duration(tier: DebounceTier) -> Duration {
    match tier {
        DebounceTier::Sync => Duration::ZERO,
        DebounceTier::Fast => Duration::from_millis(4),
        DebounceTier::Standard => Duration::from_millis(16),
    }
}

/// A virtualized slice window in display-row space, already expanded by
/// margin and aligned to a block boundary so small scrolls don't thrash
/// the layout cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceWindow {
    pub first_row: u32,
    pub last_row: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor_row: u32,
    pub anchor_col: u32,
    pub active_row: u32,
    pub active_col: u32,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.anchor_row == self.active_row && self.anchor_col == self.active_col
    }

    /// Ordered `(start, end)` as `(row, col)` pairs regardless of
    /// whether the user dragged forward or backward.
    pub fn ordered(&self) -> ((u32, u32), (u32, u32)) {
        let a = (self.anchor_row, self.anchor_col);
        let b = (self.active_row, self.active_col);
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

pub struct ViewController {
    scroll_x: f32,
    scroll_y_row: u32,
    client_width: f32,
    client_height: f32,
    dpi_scale: f32,
    line_height: f32,
    gutter_width: f32,
    average_char_width: f32,
    mode: RenderMode,
    slice_margin_rows: u32,
    block_alignment_rows: u32,
    caret_row: u32,
    caret_col: u32,
    selection: Option<Selection>,
}

const DEFAULT_SLICE_MARGIN_ROWS: u32 = 32;
const DEFAULT_BLOCK_ALIGNMENT_ROWS: u32 = 64;

impl ViewController {
    pub fn new(line_height: f32, gutter_width: f32) -> Self {
        ViewController {
            scroll_x: 0.0,
            scroll_y_row: 0,
            client_width: 0.0,
            client_height: 0.0,
            dpi_scale: 1.0,
            line_height,
            gutter_width,
            average_char_width: DEFAULT_AVERAGE_CHAR_WIDTH,
            mode: RenderMode::AutoScroll,
            slice_margin_rows: DEFAULT_SLICE_MARGIN_ROWS,
            block_alignment_rows: DEFAULT_BLOCK_ALIGNMENT_ROWS,
            caret_row: 0,
            caret_col: 0,
            selection: None,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32, dpi_scale: f32) {
        self.client_width = width;
        self.client_height = height;
        self.dpi_scale = dpi_scale;
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn visible_row_count(&self) -> u32 {
        if self.line_height <= 0.0 {
            return 0;
        }
        (self.client_height / self.line_height).ceil() as u32 + 1
    }

    /// Whether the current scroll position sits at (or past) the last
    /// display row — the condition for re-entering `AUTO_SCROLL`.
    pub fn is_at_bottom(&self, total_display_rows: u32) -> bool {
        let visible = self.visible_row_count();
        self.scroll_y_row + visible >= total_display_rows
    }

    /// User-initiated scroll. Leaves `AUTO_SCROLL` the moment the
    /// viewport no longer sits at the bottom, and re-enters it once the
    /// user scrolls back down to the bottom.
    pub fn on_scroll_to_row(&mut self, row: u32, total_display_rows: u32) {
        self.scroll_y_row = row.min(total_display_rows.saturating_sub(1));
        self.mode = if self.is_at_bottom(total_display_rows) {
            RenderMode::AutoScroll
        } else {
            RenderMode::ScrollBack
        };
    }

    /// New lines appended while in `AUTO_SCROLL`: follow the tail by
    /// keeping the scroll position pinned to the bottom. A no-op in
    /// `SCROLL_BACK`, where the viewport must not move under the user.
    pub fn on_lines_appended(&mut self, total_display_rows: u32) {
        if self.mode == RenderMode::AutoScroll {
            let visible = self.visible_row_count();
            self.scroll_y_row = total_display_rows.saturating_sub(visible);
        }
    }

    pub fn scroll_to_bottom(&mut self, total_display_rows: u32) {
        let visible = self.visible_row_count();
        self.scroll_y_row = total_display_rows.saturating_sub(visible);
        self.mode = RenderMode::AutoScroll;
    }

    pub fn set_scroll_x(&mut self, x: f32) {
        self.scroll_x = x.max(0.0);
    }

    pub fn scroll_x(&self) -> f32 {
        self.scroll_x
    }

    pub fn scroll_row(&self) -> u32 {
        self.scroll_y_row
    }

    pub fn gutter_width(&self) -> f32 {
        self.gutter_width
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn client_width(&self) -> f32 {
        self.client_width
    }

    pub fn client_height(&self) -> f32 {
        self.client_height
    }

    pub fn average_char_width(&self) -> f32 {
        self.average_char_width
    }

    /// Updates the width used to turn a column into a pixel offset, once
    /// a real measurement is available from the text shaper.
    pub fn set_average_char_width(&mut self, width: f32) {
        self.average_char_width = width.max(1.0);
    }

    /// The full drawing surface, origin at `(0, 0)`.
    pub fn viewport(&self) -> Rect {
        Rect { x: 0.0, y: 0.0, width: self.client_width, height: self.client_height }
    }

    /// Where the content layout's own origin (row 0, column 0) sits
    /// relative to the viewport, after the gutter and horizontal scroll.
    pub fn content_origin(&self) -> Point {
        Point { x: self.gutter_width - self.scroll_x, y: 0.0 }
    }

    /// Pixel rect for a single-row `[start_col, end_col)` span, relative
    /// to the current scroll position. `None` when the row has scrolled
    /// out of the visible viewport.
    pub fn rect_for_span(&self, row: u32, start_col: u32, end_col: u32) -> Option<Rect> {
        if row < self.scroll_y_row {
            return None;
        }
        let visual_row = row - self.scroll_y_row;
        if visual_row >= self.visible_row_count() {
            return None;
        }
        let y = visual_row as f32 * self.line_height;
        let origin_x = self.content_origin().x;
        let x = origin_x + start_col as f32 * self.average_char_width;
        let width = end_col.saturating_sub(start_col) as f32 * self.average_char_width;
        Some(Rect { x, y, width: width.max(0.0), height: self.line_height })
    }

    /// Pixel origin and height of the caret, or `None` if scrolled out
    /// of view.
    pub fn caret_rect(&self) -> Option<(Point, f32)> {
        let rect = self.rect_for_span(self.caret_row, self.caret_col, self.caret_col)?;
        Some((Point { x: rect.x, y: rect.y }, self.line_height))
    }

    /// One rect per selected row, clipped to the viewport. A selection
    /// spanning multiple rows fills to the right edge on all but the
    /// last row, and from the left edge on all but the first.
    pub fn selection_rects(&self) -> Vec<Rect> {
        let Some(sel) = self.selection() else {
            return Vec::new();
        };
        let ((start_row, start_col), (end_row, end_col)) = sel.ordered();
        let mut rects = Vec::new();
        for row in start_row..=end_row {
            if row < self.scroll_y_row {
                continue;
            }
            let visual_row = row - self.scroll_y_row;
            if visual_row >= self.visible_row_count() {
                break;
            }
            let y = visual_row as f32 * self.line_height;
            let origin_x = self.content_origin().x;
            let (x_start, x_end) = if start_row == end_row {
                (origin_x + start_col as f32 * self.average_char_width, origin_x + end_col as f32 * self.average_char_width)
            } else if row == start_row {
                (origin_x + start_col as f32 * self.average_char_width, self.client_width)
            } else if row == end_row {
                (origin_x, origin_x + end_col as f32 * self.average_char_width)
            } else {
                (origin_x, self.client_width)
            };
            rects.push(Rect { x: x_start, y, width: (x_end - x_start).max(0.0), height: self.line_height });
        }
        rects
    }

    /// Computes the virtualized slice window for the current scroll
    /// position: visible rows expanded by margin on both sides, then
    /// aligned outward to a block boundary so scrolling within a block
    /// reuses the same cached slice.
    pub fn compute_slice_window(&self, total_display_rows: u32) -> SliceWindow {
        if total_display_rows == 0 {
            return SliceWindow { first_row: 0, last_row: 0 };
        }
        let visible = self.visible_row_count();
        let raw_first = self.scroll_y_row.saturating_sub(self.slice_margin_rows);
        let raw_last = (self.scroll_y_row + visible + self.slice_margin_rows).min(total_display_rows.saturating_sub(1));

        let block = self.block_alignment_rows.max(1);
        let first_row = (raw_first / block) * block;
        let last_row = (((raw_last / block) + 1) * block - 1).min(total_display_rows.saturating_sub(1));
        SliceWindow { first_row, last_row }
    }

    pub fn caret(&self) -> (u32, u32) {
        (self.caret_row, self.caret_col)
    }

    pub fn set_caret(&mut self, row: u32, col: u32) {
        self.caret_row = row;
        self.caret_col = col;
    }

    pub fn move_caret_vertical(&mut self, delta: i32, total_display_rows: u32, extend_selection: bool) {
        let new_row = if delta < 0 {
            self.caret_row.saturating_sub((-delta) as u32)
        } else {
            (self.caret_row + delta as u32).min(total_display_rows.saturating_sub(1))
        };
        self.move_caret_to(new_row, self.caret_col, extend_selection);
    }

    pub fn move_caret_home(&mut self, extend_selection: bool) {
        self.move_caret_to(self.caret_row, 0, extend_selection);
    }

    pub fn move_caret_end(&mut self, line_len: u32, extend_selection: bool) {
        self.move_caret_to(self.caret_row, line_len, extend_selection);
    }

    pub fn move_caret_document_start(&mut self, extend_selection: bool) {
        self.move_caret_to(0, 0, extend_selection);
    }

    pub fn move_caret_document_end(&mut self, last_row: u32, last_row_len: u32, extend_selection: bool) {
        self.move_caret_to(last_row, last_row_len, extend_selection);
    }

    fn move_caret_to(&mut self, row: u32, col: u32, extend_selection: bool) {
        if extend_selection {
            let anchor = self.selection.map(|s| (s.anchor_row, s.anchor_col)).unwrap_or((self.caret_row, self.caret_col));
            self.selection = Some(Selection {
                anchor_row: anchor.0,
                anchor_col: anchor.1,
                active_row: row,
                active_col: col,
            });
        } else {
            self.selection = None;
        }
        self.caret_row = row;
        self.caret_col = col;
    }

    /// Mouse-down: starts a new selection anchored at the click point.
    pub fn begin_selection_at(&mut self, row: u32, col: u32) {
        self.caret_row = row;
        self.caret_col = col;
        self.selection = Some(Selection { anchor_row: row, anchor_col: col, active_row: row, active_col: col });
    }

    /// Mouse-drag: extends the active selection without moving the
    /// anchor.
    pub fn extend_selection_to(&mut self, row: u32, col: u32) {
        if let Some(selection) = &mut self.selection {
            selection.active_row = row;
            selection.active_col = col;
        } else {
            self.begin_selection_at(row, col);
        }
        self.caret_row = row;
        self.caret_col = col;
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection.filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounce_tiers_match_thresholds() {
        assert_eq!(debounce_tier_for(0), DebounceTier::Sync);
        assert_eq!(debounce_tier_for(99), DebounceTier::Sync);
        assert_eq!(debounce_tier_for(100), DebounceTier::Fast);
        assert_eq!(debounce_tier_for(1000), DebounceTier::Fast);
        assert_eq!(debounce_tier_for(1001), DebounceTier::Standard);
    }

    #[test]
    fn scrolling_away_from_bottom_switches_to_scroll_back() {
        let mut vc = ViewController::new(16.0, 40.0);
        vc.resize(800.0, 320.0, 1.0); // 20 visible rows + 1
        vc.scroll_to_bottom(1000);
        assert_eq!(vc.mode(), RenderMode::AutoScroll);
        vc.on_scroll_to_row(100, 1000);
        assert_eq!(vc.mode(), RenderMode::ScrollBack);
    }

    #[test]
    fn scrolling_back_to_bottom_resumes_auto_scroll() {
        let mut vc = ViewController::new(16.0, 40.0);
        vc.resize(800.0, 320.0, 1.0);
        vc.on_scroll_to_row(500, 1000);
        assert_eq!(vc.mode(), RenderMode::ScrollBack);
        let visible = vc.visible_row_count();
        vc.on_scroll_to_row(1000 - visible, 1000);
        assert_eq!(vc.mode(), RenderMode::AutoScroll);
    }

    #[test]
    fn auto_scroll_follows_appended_lines() {
        let mut vc = ViewController::new(16.0, 40.0);
        vc.resize(800.0, 320.0, 1.0);
        vc.scroll_to_bottom(100);
        vc.on_lines_appended(150);
        let visible = vc.visible_row_count();
        assert_eq!(vc.scroll_row(), 150 - visible);
    }

    #[test]
    fn scroll_back_ignores_appended_lines() {
        let mut vc = ViewController::new(16.0, 40.0);
        vc.resize(800.0, 320.0, 1.0);
        vc.on_scroll_to_row(10, 1000);
        vc.on_lines_appended(2000);
        assert_eq!(vc.scroll_row(), 10);
    }

    #[test]
    fn slice_window_is_block_aligned_and_margined() {
        let mut vc = ViewController::new(16.0, 40.0);
        vc.resize(800.0, 320.0, 1.0);
        vc.on_scroll_to_row(100, 10_000);
        let window = vc.compute_slice_window(10_000);
        assert_eq!(window.first_row % 64, 0);
        assert!(window.first_row <= 100 - 32);
        assert!(window.last_row >= 100 + vc.visible_row_count() + 32 - 1);
    }

    #[test]
    fn drag_extends_selection_without_moving_anchor() {
        let mut vc = ViewController::new(16.0, 40.0);
        vc.begin_selection_at(5, 2);
        vc.extend_selection_to(7, 9);
        let sel = vc.selection().unwrap();
        assert_eq!((sel.anchor_row, sel.anchor_col), (5, 2));
        assert_eq!((sel.active_row, sel.active_col), (7, 9));
    }

    #[test]
    fn arrow_key_without_shift_clears_selection() {
        let mut vc = ViewController::new(16.0, 40.0);
        vc.begin_selection_at(5, 2);
        vc.extend_selection_to(7, 9);
        vc.move_caret_vertical(1, 100, false);
        assert!(vc.selection().is_none());
    }

    #[test]
    fn caret_rect_scrolls_with_viewport() {
        let mut vc = ViewController::new(16.0, 40.0);
        vc.resize(800.0, 320.0, 1.0);
        vc.set_caret(5, 3);
        let (origin, height) = vc.caret_rect().unwrap();
        assert_eq!(height, 16.0);
        assert_eq!(origin.y, 5.0 * 16.0);
        vc.on_scroll_to_row(5, 1000);
        assert!(vc.caret_rect().is_none(), "caret above the scrolled viewport is not visible");
    }

    #[test]
    fn selection_rects_span_full_rows_in_the_middle() {
        let mut vc = ViewController::new(16.0, 40.0);
        vc.resize(800.0, 320.0, 1.0);
        vc.begin_selection_at(0, 2);
        vc.extend_selection_to(2, 1);
        let rects = vc.selection_rects();
        assert_eq!(rects.len(), 3);
        assert_eq!(rects[1].x, vc.content_origin().x, "middle row fills from the left edge");
        assert_eq!(rects[1].width, vc.client_width() - vc.content_origin().x);
    }
}
