use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Something that shows a complete HTML document.
///
/// Displaying never fails from the caller's point of view; surfaces deal
/// with their own errors.
pub trait PreviewSurface {
    fn display(&mut self, html: &str);
}

impl<F: FnMut(&str)> PreviewSurface for F {
    fn display(&mut self, html: &str) {
        self(html);
    }
}

/// Writes the preview to an HTML file a browser can keep open.
///
/// Each update goes to a hidden sibling first and is renamed into place, so
/// readers never observe a partially written file.
#[derive(Debug)]
pub struct HtmlFileSurface {
    path: PathBuf,
    writes: usize,
}

impl HtmlFileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writes: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of successful writes so far.
    pub const fn writes(&self) -> usize {
        self.writes
    }

    fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(|| "preview".into(), |n| n.to_string_lossy().to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    fn write(&self, html: &str) -> io::Result<()> {
        let staging = self.staging_path();
        fs::write(&staging, html)?;
        fs::rename(&staging, &self.path)
    }
}

impl PreviewSurface for HtmlFileSurface {
    fn display(&mut self, html: &str) {
        match self.write(html) {
            Ok(()) => {
                self.writes += 1;
                debug!(path = %self.path.display(), bytes = html.len(), "preview written");
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to write preview");
                crate::perf::log_event(
                    "preview.write_error",
                    format!("path={} err={err}", self.path.display()),
                );
            }
        }
    }
}

/// Prints the preview to standard output.
#[derive(Debug, Default)]
pub struct StdoutSurface;

impl PreviewSurface for StdoutSurface {
    fn display(&mut self, html: &str) {
        let mut out = io::stdout().lock();
        if let Err(err) = out.write_all(html.as_bytes()).and_then(|()| out.flush()) {
            warn!(error = %err, "failed to print preview");
        }
    }
}
