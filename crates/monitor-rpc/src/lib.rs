//! Wire-level message types, the transport-ingest consumer contract, and
//! the bounded inbox between the transport worker and the UI thread.
//!
//! Named `scopewatch-rpc` for the role it plays: data formats shared
//! between independently-threaded components that do not share memory.

pub mod ingest;
pub mod messages;
pub mod queue;

pub use ingest::{format_perf_scope_message, trim_trailing_newline, IngestEvent, PerfScopeFields};
pub use messages::{LayoutReady, LayoutRequest, Sequence, WidthReady, WorkerEvent};
pub use queue::{EtwQueue, DEFAULT_BATCH_CAP};
