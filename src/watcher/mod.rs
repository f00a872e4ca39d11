//! Watching the markdown source for external edits.
//!
//! Uses notify for cross-platform file system events. Events are coalesced:
//! a change is reported once the file has been quiet for the debounce window.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

/// Debounced change detection for a single source file.
pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
    dir: PathBuf,
    source: PathBuf,
    source_name: Option<OsString>,
    quiet_period: Duration,
    last_change: Option<Instant>,
}

impl SourceWatcher {
    /// Watch `path`, reporting a change after `quiet_period` without events.
    ///
    /// The parent directory is watched rather than the file, since editors
    /// often save by replacing the file.
    ///
    /// # Errors
    /// Returns an error if the watcher cannot be created or the directory cannot be watched.
    pub fn new(path: impl AsRef<Path>, quiet_period: Duration) -> notify::Result<Self> {
        // OS event paths are canonical, so compare against the canonical form.
        let source = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let source_name = source.file_name().map(std::ffi::OsStr::to_os_string);
        let dir = parent_dir(&source);

        let (tx, events) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!(source = %source.display(), dir = %dir.display(), "watching source");

        Ok(Self {
            _watcher: watcher,
            events,
            dir,
            source,
            source_name,
            quiet_period,
            last_change: None,
        })
    }

    /// Canonical path of the watched file.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Drain pending events. Returns true once a change has settled.
    pub fn poll_changed(&mut self) -> bool {
        let mut relevant = 0u32;
        let mut ignored = 0u32;
        while let Ok(event) = self.events.try_recv() {
            match event {
                Ok(ev) if self.is_relevant(&ev) => relevant += 1,
                Ok(_) => ignored += 1,
                Err(err) => {
                    warn!(error = %err, "file watcher error");
                    crate::perf::log_event("watcher.error", format!("{err}"));
                }
            }
        }

        if relevant + ignored > 0 {
            crate::perf::log_event(
                "watcher.poll",
                format!(
                    "relevant={relevant} ignored={ignored} source={}",
                    self.source.display()
                ),
            );
        }
        if relevant > 0 {
            self.last_change = Some(Instant::now());
        }

        match self.last_change {
            Some(at) if at.elapsed() >= self.quiet_period => {
                self.last_change = None;
                true
            }
            _ => false,
        }
    }

    fn is_relevant(&self, event: &Event) -> bool {
        if matches!(event.kind, EventKind::Access(_)) {
            return false;
        }
        event.paths.iter().any(|path| {
            path == &self.dir
                || path == &self.source
                || self
                    .source_name
                    .as_ref()
                    .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
        })
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
