//! The editable markdown document.
//!
//! This module handles:
//! - Holding the source text (rope-backed) and its revision counter
//! - Change notifications to subscribers, carrying immutable snapshots
//! - Loading and saving UTF-8 plain-text files

mod model;
mod snapshot;

pub use model::Document;
pub use snapshot::{DocumentError, Snapshot, SubscriptionId};

/// Extension used for the preview file written next to a markdown source.
pub const PREVIEW_EXTENSION: &str = "html";

/// Default path for the HTML preview of `source`: same name, `.html` extension.
pub fn preview_path_for(source: &std::path::Path) -> std::path::PathBuf {
    source.with_extension(PREVIEW_EXTENSION)
}

/// Title shown in the preview for `source`: its file name.
pub fn title_for(source: &std::path::Path) -> String {
    source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
