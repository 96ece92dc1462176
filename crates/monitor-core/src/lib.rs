//! Append-only log document, visibility index, and slice layout cache.
//!
//! This crate owns the core data model: the source-of-truth line log,
//! the filter-aware visibility index, and character/display-row
//! coordinate mappings. It has no knowledge of threads, workers, or
//! rendering — those live in `scopewatch-rpc` and `scopewatch-app`.

pub mod document;
pub mod filter;
pub mod layout_cache;
pub mod line;

pub use document::{Document, FilteredTailText, TailLineInfo};
pub use filter::{FilterMask, MessageType};
pub use layout_cache::{CachedSlice, FilteredRun, LayoutCache, SliceKey};
pub use line::{ColorSpan, Line, LineMeta, VisibleLine};
