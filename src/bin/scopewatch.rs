//! Process entry point: CLI parsing, logging setup, single-instance
//! enforcement, and handoff to `scopewatch_app::Application`. The
//! concrete windowing/GPU backend and the event-tracing transport's
//! session lifecycle are both out of scope here — this binary only
//! wires the engine together and pumps it on a timer.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use scopewatch_app::{
    app::{default_lock_path, AppError, Application, FileLockGuard, SingleInstanceGuard, IDLE_POLL_INTERVAL},
    CosmicTextShaper, Settings,
};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "scopewatch", version)]
struct Cli {
    /// File to load and display on launch.
    path: Option<PathBuf>,

    /// Poll for the running instance to exit instead of exiting immediately.
    #[arg(long)]
    wait_instance: bool,

    /// Override the tracing log level (off, error, warn, info, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
}

fn init_logging(log_level: Option<&str>) {
    let filter = log_level
        .map(String::from)
        .or_else(|| std::env::var("SCOPEWATCH_LOG").ok())
        .unwrap_or_else(|| "info".to_string());
    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).with_ansi(true).init();
}

/// Blocks until a lock is acquired. When `wait` is false, a single
/// contended attempt is made and the process exits quietly on failure
/// rather than retrying.
fn acquire_instance_lock(wait: bool) -> Option<FileLockGuard> {
    let Some(path) = default_lock_path() else {
        tracing::warn!("no config directory available; skipping single-instance enforcement");
        return None;
    };

    loop {
        match FileLockGuard::acquire(&path) {
            Ok(guard) => return Some(guard),
            Err(AppError::AlreadyRunning) if wait => {
                thread::sleep(Duration::from_millis(200));
            }
            Err(AppError::AlreadyRunning) => {
                tracing::info!("another instance is already running, exiting");
                std::process::exit(0);
            }
            Err(err) => {
                tracing::error!("failed to acquire single-instance lock: {err}");
                std::process::exit(1);
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let _lock = acquire_instance_lock(cli.wait_instance);

    let settings = Settings::load().unwrap_or_else(|err| {
        tracing::warn!("failed to load settings, using defaults: {err}");
        Settings::default()
    });

    let shaper = Arc::new(CosmicTextShaper::new(13.0, 18.0));
    let mut app = match Application::new(shaper, settings, num_worker_threads(), 18.0, 48.0) {
        Ok(app) => app,
        Err(err) => {
            tracing::error!("failed to start: {err}");
            std::process::exit(1);
        }
    };

    if let Some(path) = cli.path.as_ref() {
        match std::fs::read_to_string(path) {
            Ok(text) => app.document.set_text(&text),
            Err(err) => tracing::warn!("failed to read {}: {err}", path.display()),
        }
    }

    run_headless(&mut app);
    app.shutdown();
}

fn num_worker_threads() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(2).max(1)
}

/// Pumps ingest and worker events on a fixed cadence. Stands in for a
/// real event loop until a windowing backend is wired in; rendering is
/// intentionally skipped since no `RenderSurface` is available here.
fn run_headless<S: scopewatch_app::TextShaper + 'static>(app: &mut Application<S>) {
    loop {
        app.pump_ingest();
        while app.try_recv_worker_event().is_some() {}
        thread::sleep(IDLE_POLL_INTERVAL);
    }
}
