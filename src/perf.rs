//! Opt-in diagnostics for the render pipeline.
//!
//! `--perf` turns on timing scopes, reported through tracing under the
//! `together::perf` target. Separately, a render debug log file collects
//! timestamped pipeline events (fallback pages, stale or superseded renders,
//! watcher activity) so live-preview behaviour can be reconstructed later.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

static TIMING: AtomicBool = AtomicBool::new(false);
static EVENT_LOG: LazyLock<Mutex<Option<EventLog>>> = LazyLock::new(|| Mutex::new(None));

/// Open render debug log file.
struct EventLog {
    opened: Instant,
    out: BufWriter<File>,
}

impl EventLog {
    fn create(path: &Path) -> io::Result<Self> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "together render debug log start")?;
        out.flush()?;
        Ok(Self {
            opened: Instant::now(),
            out,
        })
    }

    fn record(&mut self, name: &str, detail: &str) -> io::Result<()> {
        let at_ms = self.opened.elapsed().as_secs_f64() * 1000.0;
        writeln!(self.out, "[{at_ms:>10.3} ms] {name}: {detail}")?;
        self.out.flush()
    }
}

fn event_log() -> MutexGuard<'static, Option<EventLog>> {
    EVENT_LOG.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Times the stage it is named after until dropped.
#[derive(Debug)]
pub struct Scope {
    stage: &'static str,
    started: Instant,
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(target: "together::perf", stage = self.stage, elapsed_ms, "timing");
        log_event(self.stage, format!("took {elapsed_ms:.3} ms"));
    }
}

pub fn set_enabled(enabled: bool) {
    TIMING.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    TIMING.load(Ordering::Relaxed)
}

/// Start timing `stage`; the report is emitted when the scope drops.
pub fn scope(stage: &'static str) -> Scope {
    Scope {
        stage,
        started: Instant::now(),
    }
}

/// Route debug events to a fresh file at `path`, or stop logging with `None`.
///
/// # Errors
/// Returns an error if the log file cannot be created. The previous log, if
/// any, stays active in that case.
pub fn set_debug_log_path(path: Option<&Path>) -> io::Result<()> {
    let next = path.map(EventLog::create).transpose()?;
    *event_log() = next;
    Ok(())
}

pub fn is_debug_log_enabled() -> bool {
    event_log().is_some()
}

/// Append `name: detail` to the debug log. No-op when no log is open.
pub fn log_event(name: &str, detail: impl AsRef<str>) {
    if let Some(log) = event_log().as_mut()
        && let Err(err) = log.record(name, detail.as_ref())
    {
        tracing::debug!(event = name, error = %err, "render debug log write failed");
    }
}
