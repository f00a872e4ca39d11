// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. render::RenderResult)
    clippy::module_name_repetitions
)]

//! # Together
//!
//! Markdown documents with a live HTML preview.
//!
//! Together keeps a markdown document and an HTML rendering of it in step:
//! - CommonMark plus the GitHub extensions (tables, task lists, strikethrough, autolinks)
//! - Rendering never fails; broken input yields a readable error page
//! - Background rendering that only ever shows the newest edit
//! - File watching for live preview next to any editor
//!
//! ## Architecture
//!
//! Data flows one way:
//! - **Document**: owns the text, notifies subscribers with snapshots
//! - **Renderer**: pure function from snapshot text to an HTML document
//! - **Preview**: orders render results and hands the newest to a surface
//!
//! ## Modules
//!
//! - [`document`]: Editable text, snapshots, file I/O
//! - [`render`]: Markdown to HTML with error fallback
//! - [`preview`]: Render ordering, worker thread, surfaces
//! - [`app`]: Command-line front end and live sessions
//! - [`watcher`]: File watching
//! - [`config`]: Saved defaults
//! - [`perf`]: Timing and debug log

pub mod app;
pub mod config;
pub mod document;
pub mod perf;
pub mod preview;
pub mod render;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Session};
    pub use crate::document::{Document, Snapshot};
    pub use crate::preview::{PreviewSurface, PreviewSync, PreviewWorker};
    pub use crate::render::{RenderOptions, RenderResult, Renderer, render};
}
