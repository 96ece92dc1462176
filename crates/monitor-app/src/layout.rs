//! Layout/width worker pool and the `TextShaper` seam that stands in for
//! the out-of-scope GPU/text backend.
//!
//! A pool of parallel worker threads performs layout and width
//! measurement; workers never touch the `Document`. The pool is backed
//! by `rayon` — workers receive fully captured snapshots and post
//! sequence-tagged results back over a `crossbeam_channel`.

use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use scopewatch_rpc::{LayoutReady, LayoutRequest, Sequence, WidthReady, WorkerEvent};

/// The text-shaping/measurement contract the GPU/text backend must
/// satisfy. Only the operations the workers need are defined here — the
/// concrete backend (device, shaping API) is out of scope.
pub trait TextShaper: Send + Sync {
    type Layout: Send + Clone + 'static;

    /// Shapes `text` at `width_dip`, producing a measured layout.
    fn shape(&self, text: &str, width_dip: f32) -> Self::Layout;

    /// Measures the unwrapped width of a single line of text.
    fn measure_width(&self, text: &str) -> f32;
}

/// Default shaper backed by `cosmic-text`, a standalone text-shaping
/// engine independent of any particular GPU/windowing backend.
pub struct CosmicTextShaper {
    font_system: Mutex<cosmic_text::FontSystem>,
    metrics: cosmic_text::Metrics,
}

/// A measured layout: total content size plus how many visual lines the
/// shaper produced (used for tail/slice height bookkeeping).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredLayout {
    pub width: f32,
    pub height: f32,
    pub line_count: usize,
}

impl CosmicTextShaper {
    pub fn new(font_size: f32, line_height: f32) -> Self {
        CosmicTextShaper {
            font_system: Mutex::new(cosmic_text::FontSystem::new()),
            metrics: cosmic_text::Metrics::new(font_size, line_height),
        }
    }
}

impl TextShaper for CosmicTextShaper {
    type Layout = MeasuredLayout;

    fn shape(&self, text: &str, width_dip: f32) -> MeasuredLayout {
        let mut font_system = self.font_system.lock();
        let mut buffer = cosmic_text::Buffer::new(&mut font_system, self.metrics);
        let width = if width_dip.is_finite() && width_dip > 0.0 {
            Some(width_dip)
        } else {
            None
        };
        buffer.set_size(&mut font_system, width, None);
        buffer.set_text(
            &mut font_system,
            text,
            cosmic_text::Attrs::new(),
            cosmic_text::Shaping::Advanced,
        );
        buffer.shape_until_scroll(&mut font_system, false);

        let mut max_w = 0f32;
        let mut line_count = 0usize;
        for run in buffer.layout_runs() {
            max_w = max_w.max(run.line_w);
            line_count += 1;
        }
        MeasuredLayout {
            width: max_w,
            height: line_count as f32 * self.metrics.line_height,
            line_count,
        }
    }

    fn measure_width(&self, text: &str) -> f32 {
        self.shape(text, f32::INFINITY).width
    }
}

#[derive(thiserror::Error, Debug)]
pub enum WorkerSubmitError {
    #[error("failed to build worker thread pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),
}

/// Shared pool that performs both layout and width measurement jobs.
/// Submission is asynchronous; if the pool cannot accept work it
/// degrades to inline execution on the calling (UI) thread.
pub struct Workers<S: TextShaper + 'static> {
    pool: rayon::ThreadPool,
    shaper: Arc<S>,
    sender: Sender<WorkerEvent<S::Layout>>,
}

impl<S: TextShaper + 'static> Workers<S> {
    pub fn new(shaper: Arc<S>, sender: Sender<WorkerEvent<S::Layout>>, num_threads: usize) -> Result<Self, WorkerSubmitError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads.max(1))
            .thread_name(|i| format!("scopewatch-layout-{i}"))
            .build()?;
        Ok(Workers { pool, shaper, sender })
    }

    /// Submits a layout job. Sequence `request.sequence` lets the UI
    /// discard this result if a newer request has since been issued.
    pub fn submit_layout(&self, request: LayoutRequest) {
        let shaper = self.shaper.clone();
        let sender = self.sender.clone();
        self.pool.spawn(move || {
            Self::run_layout(&shaper, &sender, request);
        });
    }

    /// Runs a layout job inline on the caller's thread — the degraded
    /// path used when async submission isn't available.
    pub fn submit_layout_inline(&self, request: LayoutRequest) {
        Self::run_layout(&self.shaper, &self.sender, request);
    }

    fn run_layout(shaper: &S, sender: &Sender<WorkerEvent<S::Layout>>, request: LayoutRequest) {
        let layout = shaper.shape(&request.text, request.width_dip);
        let packet = LayoutReady {
            sequence: request.sequence,
            layout,
            first_source_line: request.first_source_line,
            last_source_line: request.last_source_line,
            slice_start_position: request.slice_start_position,
            slice_end_position: request.slice_end_position,
            slice_first_display_row: request.slice_first_display_row,
            is_filtered: request.is_filtered,
            filtered_runs: request.filtered_runs,
        };
        let _ = sender.send(WorkerEvent::Layout(packet));
    }

    /// Submits a width-measurement job over `lines` (index, text pairs
    /// drawn from `Document::extract_dirty_line_range`).
    pub fn submit_width(&self, sequence: Sequence, lines: Vec<(usize, String)>) {
        let shaper = self.shaper.clone();
        let sender = self.sender.clone();
        self.pool.spawn(move || {
            Self::run_width(&shaper, &sender, sequence, lines);
        });
    }

    pub fn submit_width_inline(&self, sequence: Sequence, lines: Vec<(usize, String)>) {
        Self::run_width(&self.shaper, &self.sender, sequence, lines);
    }

    fn run_width(shaper: &S, sender: &Sender<WorkerEvent<S::Layout>>, sequence: Sequence, lines: Vec<(usize, String)>) {
        let mut indices = Vec::with_capacity(lines.len());
        let mut widths = Vec::with_capacity(lines.len());
        for (idx, text) in lines {
            indices.push(idx);
            widths.push(shaper.measure_width(&text));
        }
        let _ = sender.send(WorkerEvent::Width(WidthReady { sequence, indices, widths }));
    }
}

/// Tracks the running maximum line width and which line produced it, so
/// a shrink of the current max line triggers a full re-scan rather than
/// silently understating the content width.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaxWidthTracker {
    max_width: f32,
    max_index: Option<usize>,
}

impl MaxWidthTracker {
    pub fn observe(&mut self, index: usize, width: f32) {
        match self.max_index {
            None => {
                self.max_width = width;
                self.max_index = Some(index);
            }
            Some(max_idx) => {
                if width >= self.max_width {
                    self.max_width = width;
                    self.max_index = Some(index);
                } else if index == max_idx {
                    // the previous max line shrank; caller must re-scan
                    // all known widths to find the new maximum.
                    self.max_index = None;
                }
            }
        }
    }

    pub fn needs_rescan(&self) -> bool {
        self.max_index.is_none()
    }

    pub fn rescan(&mut self, widths: impl Iterator<Item = (usize, f32)>) {
        self.max_width = 0.0;
        self.max_index = None;
        for (idx, w) in widths {
            if w > self.max_width {
                self.max_width = w;
                self.max_index = Some(idx);
            }
        }
    }

    pub fn max_width(&self) -> f32 {
        self.max_width
    }
}

/// Approximate content width for the horizontal scrollbar extent:
/// `max(measured_max, average_char_width * longest_line_chars)`.
pub fn approximate_content_width(measured_max: f32, average_char_width: f32, longest_line_chars: usize) -> f32 {
    measured_max.max(average_char_width * longest_line_chars as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_width_tracker_rescans_on_shrink() {
        let mut tracker = MaxWidthTracker::default();
        tracker.observe(0, 100.0);
        tracker.observe(1, 50.0);
        assert!(!tracker.needs_rescan());
        tracker.observe(0, 10.0); // the current max line shrank
        assert!(tracker.needs_rescan());
        tracker.rescan([(0, 10.0), (1, 50.0)].into_iter());
        assert_eq!(tracker.max_width(), 50.0);
    }

    #[test]
    fn content_width_takes_the_larger_estimate() {
        assert_eq!(approximate_content_width(100.0, 8.0, 5), 100.0);
        assert_eq!(approximate_content_width(10.0, 8.0, 5), 40.0);
    }
}
