//! Application front end.
//!
//! - [`App`]: configured from the command line; renders once or runs the live preview loop
//! - [`Session`]: a document wired to a preview surface through the render worker

mod debounce;
mod session;

pub use session::Session;

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::document::{self, Document};
use crate::preview::{HtmlFileSurface, PreviewSurface, StdoutSurface};
use crate::render::{RenderOptions, RenderResult, Renderer};
use crate::watcher::SourceWatcher;

/// Default pause after the last edit before the preview re-renders.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// How often the live loop polls the watcher and the render worker.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Entry point configured from the command line.
pub struct App {
    source: PathBuf,
    output: Option<PathBuf>,
    watch: bool,
    json: bool,
    render_options: RenderOptions,
    debounce: Duration,
}

impl App {
    /// Create an app for the given markdown file.
    pub fn new(source: PathBuf) -> Self {
        let title = document::title_for(&source);
        Self {
            source,
            output: None,
            watch: false,
            json: false,
            render_options: RenderOptions {
                title,
                ..RenderOptions::default()
            },
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Write HTML to `path` instead of standard output.
    pub fn with_output(mut self, path: Option<PathBuf>) -> Self {
        self.output = path;
        self
    }

    /// Keep running and re-render when the source changes.
    pub const fn with_watch(mut self, enabled: bool) -> Self {
        self.watch = enabled;
        self
    }

    /// Print the render result as JSON instead of the HTML document.
    pub const fn with_json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }

    /// Override the document title shown in the preview.
    pub fn with_title(mut self, title: Option<String>) -> Self {
        if let Some(title) = title {
            self.render_options.title = title;
        }
        self
    }

    pub fn with_max_nesting(mut self, max_nesting: Option<usize>) -> Self {
        if let Some(max) = max_nesting {
            self.render_options.max_nesting = max;
        }
        self
    }

    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Where the live preview is written.
    pub fn preview_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| document::preview_path_for(&self.source))
    }

    /// Run once or, with watching enabled, until interrupted.
    ///
    /// # Errors
    /// Returns an error if the source cannot be read, the output cannot be
    /// written, or the watcher cannot be started.
    pub fn run(&self) -> Result<()> {
        if self.watch {
            return self.run_live();
        }
        let result = self.render_once()?;
        if let Some(message) = result.error_message() {
            warn!(error = message, "rendered fallback page");
        }
        if self.json {
            let json = serde_json::to_string_pretty(&result).context("Failed to encode result")?;
            match &self.output {
                Some(path) => std::fs::write(path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => {
                    let mut out = std::io::stdout().lock();
                    writeln!(out, "{json}").context("Failed to write result")?;
                }
            }
            return Ok(());
        }
        match &self.output {
            Some(path) => std::fs::write(path, result.html())
                .with_context(|| format!("Failed to write {}", path.display()))?,
            None => StdoutSurface.display(result.html()),
        }
        Ok(())
    }

    /// Render the source file once.
    ///
    /// # Errors
    /// Returns an error if the source cannot be opened.
    pub fn render_once(&self) -> Result<RenderResult> {
        let doc = Document::open(&self.source)
            .with_context(|| format!("Failed to open {}", self.source.display()))?;
        let renderer = Renderer::new(self.render_options.clone());
        Ok(renderer.render(&doc.text()))
    }

    /// Start a live session writing to [`App::preview_path`].
    ///
    /// # Errors
    /// Returns an error if the source cannot be opened or the render thread
    /// cannot be started.
    pub fn start_session(&self) -> Result<Session<HtmlFileSurface>> {
        let doc = Document::open(&self.source)
            .with_context(|| format!("Failed to open {}", self.source.display()))?;
        let surface = HtmlFileSurface::new(self.preview_path());
        Session::new(
            doc,
            Renderer::new(self.render_options.clone()),
            surface,
            self.debounce,
        )
        .context("Failed to start preview renderer")
    }

    fn run_live(&self) -> Result<()> {
        let _scope = crate::perf::scope("app.run_live");
        let mut session = self.start_session()?;
        let mut watcher = SourceWatcher::new(&self.source, self.debounce)
            .with_context(|| format!("Failed to watch {}", self.source.display()))?;
        info!(
            source = %self.source.display(),
            preview = %self.preview_path().display(),
            "live preview running"
        );
        eprintln!("Previewing {} (Ctrl-C to stop)", self.preview_path().display());

        loop {
            if watcher.poll_changed() {
                match session.reload_source() {
                    Ok(changed) => {
                        crate::perf::log_event("reload", format!("changed={changed}"));
                    }
                    Err(err) => {
                        warn!(error = %err, "reload failed; keeping last preview");
                        crate::perf::log_event("reload.error", format!("{err}"));
                    }
                }
            }
            session.step(Instant::now());
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}
