//! Top-level wiring: `Document` + `ViewController` + `Renderer` +
//! `EtwQueue` + worker pool + settings, the event-pump loop, single-
//! instance enforcement, and shutdown ordering.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use scopewatch_core::{CachedSlice, Document, FilterMask, FilteredRun, LayoutCache, SliceKey, TailLineInfo};
use scopewatch_rpc::{EtwQueue, LayoutReady, LayoutRequest, Sequence, WorkerEvent, DEFAULT_BATCH_CAP};

use crate::config::Settings;
use crate::find::FindOverlay;
use crate::layout::{MaxWidthTracker, TextShaper, Workers};
use crate::render::{Point, RenderSurface, Renderer};
use crate::theme::{self, ResolvedTheme, ThemeDefinition};
use crate::view_controller::ViewController;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("another instance is already running")]
    AlreadyRunning,
    #[error("failed to acquire single-instance lock: {0}")]
    LockIo(#[source] io::Error),
    #[error("failed to start worker pool: {0}")]
    Workers(#[from] crate::layout::WorkerSubmitError),
}

/// Enforces that only one instance of the viewer runs against a given
/// lock path at a time. Abstracted behind a trait so tests can supply a
/// fake without touching the filesystem.
pub trait SingleInstanceGuard: Sized {
    fn acquire(path: &Path) -> Result<Self, AppError>;
}

/// Default lock-file-based implementation. Relies on `create_new`'s
/// atomicity (the file is created only if it doesn't already exist) for
/// exclusivity and removes the file on `Drop`, so a clean exit always
/// releases it. A crash leaves a stale lock file behind; recovering
/// from that (e.g. checking whether the recorded pid is still alive)
/// is left to the caller.
pub struct FileLockGuard {
    path: PathBuf,
    _file: File,
}

impl SingleInstanceGuard for FileLockGuard {
    fn acquire(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(AppError::LockIo)?;
        }
        let mut file = match fs::OpenOptions::new().create_new(true).write(true).open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Err(AppError::AlreadyRunning),
            Err(err) => return Err(AppError::LockIo(err)),
        };
        let _ = write!(file, "{}", std::process::id());
        Ok(FileLockGuard { path: path.to_path_buf(), _file: file })
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

pub fn default_lock_path() -> Option<PathBuf> {
    Settings::config_dir().map(|dir| dir.join("instance.lock"))
}

/// Everything the viewer needs once a single instance has been granted:
/// the document, worker pool, view controller, inbound event queue, and
/// active theme/settings.
pub struct Application<S: TextShaper + 'static> {
    pub document: Arc<Document>,
    pub view_controller: ViewController,
    pub find: FindOverlay,
    pub settings: Settings,
    pub theme: ResolvedTheme,
    workers: Workers<S>,
    event_rx: Receiver<WorkerEvent<S::Layout>>,
    inbox: Arc<EtwQueue>,
    layout_cache: LayoutCache<S::Layout>,
    current_sequence: Sequence,
    max_width_tracker: MaxWidthTracker,
    last_width_dip: f32,
}

impl<S: TextShaper + 'static> Application<S> {
    pub fn new(shaper: Arc<S>, settings: Settings, num_worker_threads: usize, line_height: f32, gutter_width: f32) -> Result<Self, AppError> {
        let (event_tx, event_rx): (Sender<WorkerEvent<S::Layout>>, Receiver<WorkerEvent<S::Layout>>) = crossbeam_channel::unbounded();
        let workers = Workers::new(shaper, event_tx.clone(), num_worker_threads)?;

        let (notify_tx, _notify_rx) = crossbeam_channel::bounded(1);
        let inbox = Arc::new(EtwQueue::new(notify_tx));

        let document = Arc::new(Document::new());
        document.set_filter_mask(FilterMask::from_bits(settings.filter_mask));
        document.enable_show_ids(settings.menu.show_ids);

        let base_theme = if settings.theme_id == "dark" { theme::builtin_dark() } else { theme::builtin_light() };
        let theme = resolve_theme(&base_theme);

        Ok(Application {
            document,
            view_controller: ViewController::new(line_height, gutter_width),
            find: FindOverlay::new(),
            settings,
            theme,
            workers,
            event_rx,
            inbox,
            layout_cache: LayoutCache::default(),
            current_sequence: 0,
            max_width_tracker: MaxWidthTracker::default(),
            last_width_dip: 0.0,
        })
    }

    pub fn inbox(&self) -> Arc<EtwQueue> {
        self.inbox.clone()
    }

    pub fn workers(&self) -> &Workers<S> {
        &self.workers
    }

    pub fn current_sequence(&self) -> Sequence {
        self.current_sequence
    }

    /// Checks the slice-window cache before asking a worker to shape it.
    /// A hit returns the cached layout immediately; a miss submits an
    /// async layout job (its result arrives later as a
    /// `WorkerEvent::Layout`) and returns `None`. `SliceKey` doesn't
    /// carry `width_dip`, so a width change invalidates the whole cache
    /// rather than risk serving a slice shaped for the wrong width.
    pub fn ensure_slice_layout(&mut self, width_dip: f32) -> Option<S::Layout> {
        if (width_dip - self.last_width_dip).abs() > f32::EPSILON {
            self.layout_cache.clear();
            self.last_width_dip = width_dip;
        }

        let total_rows = self.document.total_display_rows();
        let window = self.view_controller.compute_slice_window(total_rows);
        let first_visible = self.document.visible_index_from_display_row(window.first_row);
        let last_visible = self.document.visible_index_from_display_row(window.last_row);
        let first_source = self.document.visible_source_index(first_visible)?;
        let last_source = self.document.visible_source_index(last_visible).unwrap_or(first_source);
        let key = SliceKey { first_source_line: first_source, last_source_line: last_source };

        if let Some(cached) = self.layout_cache.get(&key) {
            return Some(cached.layout_handle.clone());
        }

        let tail = self.document.build_filtered_tail_text(first_source, last_source);
        let span = last_source - first_source + 1;
        self.current_sequence += 1;
        let request = LayoutRequest {
            sequence: self.current_sequence,
            slice_start_position: self.document.get_line_start_offset(first_source),
            slice_end_position: self.document.get_line_start_offset(first_source) + tail.text.len() as u32,
            slice_first_display_row: window.first_row,
            is_filtered: tail.visible_count != span,
            filtered_runs: tail_to_filtered_runs(&tail.lines),
            text: tail.text,
            width_dip,
            first_source_line: first_source,
            last_source_line: last_source,
        };
        self.workers.submit_layout(request);
        None
    }

    /// Promotes a worker's layout result into the slice cache, keyed by
    /// the source-line range it covers.
    pub fn cache_layout_ready(&mut self, ready: &LayoutReady<S::Layout>) {
        let key = SliceKey { first_source_line: ready.first_source_line, last_source_line: ready.last_source_line };
        self.layout_cache.insert(
            key,
            CachedSlice {
                start_position: ready.slice_start_position,
                end_position: ready.slice_end_position,
                first_display_row: ready.slice_first_display_row,
                is_filtered: ready.is_filtered,
                filtered_runs: ready.filtered_runs.clone(),
                layout_handle: ready.layout.clone(),
            },
        );
    }

    pub fn max_width_tracker(&self) -> &MaxWidthTracker {
        &self.max_width_tracker
    }

    pub fn observe_width(&mut self, index: usize, width: f32) {
        self.max_width_tracker.observe(index, width);
    }

    /// Drains pending transport events into the document and, if in
    /// `AUTO_SCROLL`, follows the new tail. Returns how many lines were
    /// appended, so the caller can pick the right debounce tier.
    pub fn pump_ingest(&mut self) -> usize {
        let batch = self.inbox.drain(DEFAULT_BATCH_CAP);
        let count = batch.len();
        for event in batch {
            self.document.append_info_line(&event.message, event.meta);
        }
        if count > 0 {
            self.view_controller.on_lines_appended(self.document.total_display_rows());
        }
        count
    }

    /// Non-blocking poll of the worker-event channel; callers typically
    /// call this once per UI tick alongside `pump_ingest`.
    pub fn try_recv_worker_event(&self) -> Option<WorkerEvent<S::Layout>> {
        self.event_rx.try_recv().ok()
    }

    pub fn set_theme(&mut self, definition: &ThemeDefinition) {
        self.theme = resolve_theme(definition);
        self.settings.theme_id = definition.id.clone();
    }

    pub fn set_filter_mask(&mut self, mask: FilterMask) {
        self.document.set_filter_mask(mask);
        self.settings.filter_mask = mask.bits();
        self.layout_cache.clear();
    }

    /// Orderly shutdown: stop accepting new transport events first (so
    /// no worker is started against a document that's about to be
    /// torn down), then persist settings. GPU/text resource teardown is
    /// the concrete backend's responsibility and happens after this
    /// returns.
    pub fn shutdown(&self) {
        self.inbox.stop();
        let _ = self.settings.save();
    }
}

fn resolve_theme(definition: &ThemeDefinition) -> ResolvedTheme {
    definition.resolve(None)
}

/// Converts the per-line output of `Document::build_filtered_tail_text`
/// into the `layout_start`/`source_start` mapping a cached slice (and the
/// layout worker that produces it) carries around, so a filtered view's
/// positions can be traced back to the source line they came from.
fn tail_to_filtered_runs(lines: &[TailLineInfo]) -> Vec<FilteredRun> {
    let mut runs = Vec::with_capacity(lines.len());
    let mut cursor = 0u32;
    for line in lines {
        let display_len = line.prefix_length + line.text_length;
        runs.push(FilteredRun {
            source_line: line.source_index,
            layout_start: cursor,
            length: display_len,
            source_start: line.prefix_length,
        });
        cursor += display_len + 1; // '\n' joining adjacent visible lines
    }
    runs
}

/// Drives the renderer for one tick: pumps ingest, applies any ready
/// worker results, consults the slice cache before asking a worker to
/// shape the current window, and redraws. Kept free of any concrete
/// event-loop type so it can be called from whatever windowing backend
/// is wired up.
pub fn run_tick<S, R>(app: &mut Application<S>, renderer: &mut Renderer<R>, surface: &mut R)
where
    S: TextShaper + 'static,
    R: RenderSurface<Layout = S::Layout>,
{
    app.pump_ingest();

    while let Some(event) = app.try_recv_worker_event() {
        match event {
            WorkerEvent::Layout(ready) => {
                app.cache_layout_ready(&ready);
                renderer.on_layout_ready(ready.sequence, ready.layout, app.view_controller.mode());
            }
            WorkerEvent::Width(ready) => {
                if renderer.on_width_ready(ready.sequence) {
                    for (index, width) in ready.indices.into_iter().zip(ready.widths) {
                        app.observe_width(index, width);
                    }
                }
            }
            WorkerEvent::IngestNotify => {}
        }
    }

    let width_dip = (app.view_controller.client_width() - app.view_controller.gutter_width()).max(0.0);
    if let Some(layout) = app.ensure_slice_layout(width_dip) {
        renderer.on_layout_ready(app.current_sequence(), layout, app.view_controller.mode());
    }

    let caret = app.view_controller.caret_rect().map(|(origin, height)| {
        (origin, height, app.theme.ui.get(theme::UI_KEY_CARET).copied().unwrap_or(0xFFFF_FFFF))
    });

    let selection_rects = app.view_controller.selection_rects();

    let search_highlight_rects: Vec<crate::render::Rect> = app
        .find
        .matches()
        .iter()
        .filter_map(|m| {
            let row = app.document.display_row_for_source(m.line);
            app.view_controller.rect_for_span(row, m.start, m.end)
        })
        .collect();

    let mut gutter_line_numbers: Vec<(Point, u32)> = Vec::new();
    let scroll_row = app.view_controller.scroll_row();
    let visible_rows = app.view_controller.visible_row_count();
    for row in scroll_row..scroll_row.saturating_add(visible_rows) {
        let visible_index = app.document.visible_index_from_display_row(row);
        let Some(source_index) = app.document.visible_source_index(visible_index) else { break };
        if app.document.display_row_for_source(source_index) != row {
            continue; // a wrapped continuation row, not a line's first row
        }
        if let Some(rect) = app.view_controller.rect_for_span(row, 0, 0) {
            gutter_line_numbers.push((Point { x: 0.0, y: rect.y }, source_index as u32 + 1));
        }
    }

    let ctx = crate::render::FrameContext {
        viewport: app.view_controller.viewport(),
        gutter_width: app.view_controller.gutter_width(),
        background_color: app.theme.ui.get(theme::UI_KEY_BACKGROUND).copied().unwrap_or(0xFF00_0000),
        gutter_color: app.theme.ui.get(theme::UI_KEY_GUTTER_BACKGROUND).copied().unwrap_or(0xFF00_0000),
        mode: app.view_controller.mode(),
        selection_rects: &selection_rects,
        selection_color: app.theme.ui.get(theme::UI_KEY_SELECTION).copied().unwrap_or(0xFF00_0000),
        search_highlight_rects: &search_highlight_rects,
        search_highlight_color: app.theme.ui.get(theme::UI_KEY_SEARCH_HIGHLIGHT).copied().unwrap_or(0xFF00_0000),
        color_spans: &[],
        gutter_line_numbers: &gutter_line_numbers,
        gutter_text_color: app.theme.ui.get(theme::UI_KEY_GUTTER_FOREGROUND).copied().unwrap_or(0xFF00_0000),
        caret,
        content_origin: app.view_controller.content_origin(),
        partial_present: None,
    };
    let _ = renderer.draw(surface, &ctx);
}

/// Polling cadence when no debounce timer is pending.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(16);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RecordedOp, RecordingSurface};
    use chrono::Local;
    use scopewatch_core::{LineMeta, MessageType};

    struct TestShaper;

    impl TextShaper for TestShaper {
        type Layout = u32;

        fn shape(&self, text: &str, _width_dip: f32) -> u32 {
            text.len() as u32
        }

        fn measure_width(&self, text: &str) -> f32 {
            text.len() as f32
        }
    }

    fn test_app() -> Application<TestShaper> {
        Application::new(Arc::new(TestShaper), Settings::default(), 1, 16.0, 40.0).unwrap()
    }

    #[test]
    fn pump_ingest_appends_lines_and_follows_tail_in_auto_scroll() {
        let mut app = test_app();
        app.view_controller.resize(800.0, 320.0, 1.0);
        let meta = LineMeta { msg_type: MessageType::Info, time: Local::now(), process_id: 1, thread_id: 1 };
        app.inbox().push(scopewatch_rpc::IngestEvent { meta, message: "hello".to_string() });
        let appended = app.pump_ingest();
        assert_eq!(appended, 1);
        assert_eq!(app.document.total_line_count(), 1);
    }

    #[test]
    fn lock_guard_rejects_second_acquire() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instance.lock");
        let _first = FileLockGuard::acquire(&path).unwrap();
        assert!(matches!(FileLockGuard::acquire(&path), Err(AppError::AlreadyRunning)));
    }

    #[test]
    fn lock_guard_releases_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instance.lock");
        {
            let _guard = FileLockGuard::acquire(&path).unwrap();
        }
        let _second = FileLockGuard::acquire(&path).unwrap();
    }

    #[test]
    fn run_tick_draws_without_panicking() {
        let mut app = test_app();
        let mut renderer: Renderer<RecordingSurface> = Renderer::new();
        let mut surface = RecordingSurface::default();
        run_tick(&mut app, &mut renderer, &mut surface);
    }

    #[test]
    fn run_tick_with_content_populates_gutter_numbers() {
        let mut app = test_app();
        app.view_controller.resize(800.0, 320.0, 1.0);
        for k in 0..10 {
            let meta = LineMeta { msg_type: MessageType::Info, time: Local::now(), process_id: 1, thread_id: 1 };
            app.document.append_info_line(&format!("line {k}"), meta);
        }
        app.view_controller.on_lines_appended(app.document.total_display_rows());

        let mut renderer: Renderer<RecordingSurface> = Renderer::new();
        let mut surface = RecordingSurface::default();
        run_tick(&mut app, &mut renderer, &mut surface);

        assert!(surface.ops.iter().any(|op| matches!(op, RecordedOp::GutterLineNumber(_, 1, _))));
    }

    #[test]
    fn cached_slice_is_served_without_resubmitting_a_layout_job() {
        let mut app = test_app();
        app.view_controller.resize(800.0, 320.0, 1.0);
        for k in 0..10 {
            let meta = LineMeta { msg_type: MessageType::Info, time: Local::now(), process_id: 1, thread_id: 1 };
            app.document.append_info_line(&format!("line {k}"), meta);
        }

        assert!(app.ensure_slice_layout(760.0).is_none(), "first call misses and submits a job");
        let ready = LayoutReady {
            sequence: app.current_sequence(),
            layout: 99u32,
            first_source_line: 0,
            last_source_line: app.document.total_line_count() - 1,
            slice_start_position: 0,
            slice_end_position: 0,
            slice_first_display_row: 0,
            is_filtered: false,
            filtered_runs: Vec::new(),
        };
        app.cache_layout_ready(&ready);
        assert_eq!(app.ensure_slice_layout(760.0), Some(99));
    }

    #[test]
    fn resizing_the_viewport_invalidates_the_slice_cache() {
        let mut app = test_app();
        app.view_controller.resize(800.0, 320.0, 1.0);
        for k in 0..10 {
            let meta = LineMeta { msg_type: MessageType::Info, time: Local::now(), process_id: 1, thread_id: 1 };
            app.document.append_info_line(&format!("line {k}"), meta);
        }
        app.ensure_slice_layout(760.0);
        let ready = LayoutReady {
            sequence: app.current_sequence(),
            layout: 1u32,
            first_source_line: 0,
            last_source_line: app.document.total_line_count() - 1,
            slice_start_position: 0,
            slice_end_position: 0,
            slice_first_display_row: 0,
            is_filtered: false,
            filtered_runs: Vec::new(),
        };
        app.cache_layout_ready(&ready);
        assert!(app.ensure_slice_layout(760.0).is_some());
        assert!(app.ensure_slice_layout(900.0).is_none(), "a different width must not be served from a cache keyed without width");
    }
}
