//! Viewer engine: layout/width worker pool, the renderer state machine,
//! the view controller's mode policy and caret/selection handling, find,
//! theming, and settings persistence. None of this crate touches the
//! concrete GPU/windowing backend directly — it exposes the seams
//! (`TextShaper`, `RenderSurface`) a backend plugs into.

pub mod app;
pub mod config;
pub mod find;
pub mod layout;
pub mod render;
pub mod theme;
pub mod view_controller;

pub use app::{Application, SingleInstanceGuard};
pub use config::Settings;
pub use find::{FindOverlay, FindStartMode};
pub use layout::{CosmicTextShaper, MeasuredLayout, TextShaper, Workers};
pub use render::{RenderMode, RenderState, RenderSurface, Renderer};
pub use theme::{ResolvedTheme, ThemeDefinition};
pub use view_controller::ViewController;
