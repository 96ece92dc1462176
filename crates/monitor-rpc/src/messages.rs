//! Typed cross-thread messages — a typed multi-producer/single-consumer
//! channel keyed by message type, replacing raw `PostMessage`-style
//! dispatch — and the monotonic sequence numbers that let the UI
//! discard stale async results.

use scopewatch_core::FilteredRun;

/// Monotonically increasing tag on every async layout/width job. The UI
/// discards packets whose sequence is older than the current one.
pub type Sequence = u64;

/// Snapshot handed to a layout worker: fully captured inputs so the
/// worker never touches `Document`. `layout_handle`'s
/// concrete shaping type lives in `scopewatch-app`; this crate only
/// carries the sequencing and positional metadata around it.
#[derive(Debug, Clone)]
pub struct LayoutRequest {
    pub sequence: Sequence,
    pub text: String,
    pub width_dip: f32,
    pub first_source_line: usize,
    pub last_source_line: usize,
    pub slice_start_position: u32,
    pub slice_end_position: u32,
    pub slice_first_display_row: u32,
    pub is_filtered: bool,
    pub filtered_runs: Vec<FilteredRun>,
}

/// A completed layout job, generic over the concrete measured-layout
/// type produced by whatever `TextShaper` the app crate wires up.
#[derive(Debug, Clone)]
pub struct LayoutReady<L> {
    pub sequence: Sequence,
    pub layout: L,
    pub first_source_line: usize,
    pub last_source_line: usize,
    pub slice_start_position: u32,
    pub slice_end_position: u32,
    pub slice_first_display_row: u32,
    pub is_filtered: bool,
    pub filtered_runs: Vec<FilteredRun>,
}

/// A completed width-measurement job.
#[derive(Debug, Clone)]
pub struct WidthReady {
    pub sequence: Sequence,
    pub indices: Vec<usize>,
    pub widths: Vec<f32>,
}

/// Everything that can arrive on the UI thread's single event channel.
#[derive(Debug, Clone)]
pub enum WorkerEvent<L> {
    Layout(LayoutReady<L>),
    Width(WidthReady),
    /// The transport worker's "queue was empty, now isn't" notify.
    IngestNotify,
}
