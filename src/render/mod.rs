//! Markdown to HTML rendering.
//!
//! The renderer is a pure function of its input and options: it parses the
//! source with comrak, serializes the AST to an HTML fragment and wraps the
//! fragment in a complete HTML document from the `templates/` pages. Failures never escape [`Renderer::render`];
//! they come back as a [`RenderResult`] whose HTML shows the error instead.

mod guard;
mod shell;

use std::panic::{self, AssertUnwindSafe};

use comrak::{Arena, Options, format_html, parse_document};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub use guard::check_nesting;

/// Default limit for container and bracket nesting.
pub const DEFAULT_MAX_NESTING: usize = 128;

/// Default `<title>` of rendered documents.
pub const DEFAULT_TITLE: &str = "Preview";

/// Why a render fell back to the error page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The source is structured in a way the parser should not be asked to handle.
    #[error("markdown could not be parsed: {reason}")]
    ParseFailure { reason: String },
    /// Serialization failed or the markdown library faulted.
    #[error("internal render fault: {0}")]
    InternalRenderFault(String),
}

/// Outcome of one render call.
///
/// `html` is always a complete HTML document. `error_message` is present
/// exactly when `ok` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderResult {
    html: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl RenderResult {
    fn success(html: String) -> Self {
        Self {
            html,
            ok: true,
            error_message: None,
        }
    }

    fn failure(html: String, error: &RenderError) -> Self {
        Self {
            html,
            ok: false,
            error_message: Some(error.to_string()),
        }
    }

    /// The rendered (or fallback) HTML document.
    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn into_html(self) -> String {
        self.html
    }

    /// Whether the markdown rendered without falling back.
    pub const fn is_ok(&self) -> bool {
        self.ok
    }

    /// Human readable failure description, set iff [`Self::is_ok`] is false.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

/// Settings that shape the rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Text of the `<title>` element.
    pub title: String,
    /// Deepest container or bracket nesting accepted before a parse failure.
    pub max_nesting: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

/// Stateless markdown renderer.
///
/// Cheap to clone and safe to share between threads; every call builds its
/// own parser arena.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub const fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render `markdown` into a complete HTML document.
    ///
    /// # Example
    ///
    /// ```
    /// use together::render::Renderer;
    ///
    /// let result = Renderer::default().render("# Hello");
    /// assert!(result.is_ok());
    /// assert!(result.html().contains("<h1>Hello</h1>"));
    /// ```
    pub fn render(&self, markdown: &str) -> RenderResult {
        let _scope = crate::perf::scope("render.markdown");
        let page = self
            .render_fragment(markdown)
            .and_then(|fragment| shell::document(&self.options.title, &fragment));
        match page {
            Ok(html) => RenderResult::success(html),
            Err(err) => {
                debug!(error = %err, bytes = markdown.len(), "render fell back to error page");
                crate::perf::log_event("render.fallback", err.to_string());
                let html = shell::fallback(&self.options.title, &err.to_string());
                RenderResult::failure(html, &err)
            }
        }
    }

    /// Render `markdown` into an HTML fragment without the document shell.
    ///
    /// # Errors
    /// Returns [`RenderError::ParseFailure`] when the input nests deeper than
    /// the configured limit and [`RenderError::InternalRenderFault`] when the
    /// HTML serializer fails.
    pub fn render_fragment(&self, markdown: &str) -> Result<String, RenderError> {
        check_nesting(markdown, self.options.max_nesting)?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let arena = Arena::new();
            let mut options = Options::default();
            configure_extensions(&mut options);
            let root = parse_document(&arena, markdown, &options);
            let mut out = Vec::with_capacity(markdown.len() * 2);
            format_html(root, &options, &mut out).map(|()| out)
        }));

        let bytes = match outcome {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(err)) => {
                return Err(RenderError::InternalRenderFault(format!(
                    "HTML serialization failed: {err}"
                )));
            }
            Err(payload) => {
                return Err(RenderError::InternalRenderFault(format!(
                    "markdown library panicked: {}",
                    panic_message(payload.as_ref())
                )));
            }
        };

        String::from_utf8(bytes).map_err(|err| {
            RenderError::InternalRenderFault(format!("serializer produced invalid UTF-8: {err}"))
        })
    }
}

/// Render with default options.
pub fn render(markdown: &str) -> RenderResult {
    Renderer::default().render(markdown)
}

fn configure_extensions(options: &mut Options) {
    // GFM
    options.extension.strikethrough = true;
    options.extension.tagfilter = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;

    options.extension.footnotes = true;
    options.extension.superscript = true;
    options.extension.subscript = true;
    options.extension.description_lists = true;
    options.extension.shortcodes = true;

    // Raw HTML stays omitted so the preview only ever sees our own markup.
    options.render.unsafe_ = false;
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
