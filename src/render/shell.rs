//! HTML document shell around rendered fragments.

use std::borrow::Cow;

use askama::Template;
use tracing::warn;

use super::RenderError;

#[derive(Template)]
#[template(path = "page.html")]
struct PageTemplate<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Template)]
#[template(path = "render_error.html")]
struct RenderErrorTemplate<'a> {
    message: &'a str,
}

/// Served only if the templates themselves cannot be rendered.
const UNAVAILABLE_PAGE: &str = "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Preview</title>\n</head>\n<body>\n<p>Preview unavailable</p>\n</body>\n</html>\n";

/// Wrap an HTML fragment in a complete document.
///
/// # Errors
/// Returns [`RenderError::InternalRenderFault`] if the page template fails.
pub(super) fn document(title: &str, body: &str) -> Result<String, RenderError> {
    let body = if body.is_empty() || body.ends_with('\n') {
        Cow::Borrowed(body)
    } else {
        Cow::Owned(format!("{body}\n"))
    };
    let mut html = PageTemplate { title, body: &body }
        .render()
        .map_err(|err| RenderError::InternalRenderFault(format!("page template failed: {err}")))?;
    if !html.ends_with('\n') {
        html.push('\n');
    }
    Ok(html)
}

/// Document whose body shows `message` instead of rendered markdown.
pub(super) fn fallback(title: &str, message: &str) -> String {
    RenderErrorTemplate { message }
        .render()
        .map_err(|err| RenderError::InternalRenderFault(format!("error template failed: {err}")))
        .and_then(|body| document(title, &body))
        .unwrap_or_else(|err| {
            warn!(error = %err, "error page could not be rendered");
            UNAVAILABLE_PAGE.to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_has_nothing_between_body_tags() {
        let html = document("t", "").unwrap();
        assert!(html.contains("<body>\n</body>"), "{html}");
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn test_head_carries_charset_viewport_and_title() {
        let html = document("Notes", "<p>x</p>\n").unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<meta charset=\"utf-8\">"));
        assert!(html.contains("name=\"viewport\""));
        assert!(html.contains("<title>Notes</title>"));
        assert!(html.contains("<body>\n<p>x</p>\n</body>"));
    }

    #[test]
    fn test_title_markup_is_escaped() {
        let html = document("<script>", "").unwrap();
        assert!(!html.contains("<script>"), "{html}");
        assert!(html.contains("script</title>"), "{html}");
    }

    #[test]
    fn test_fallback_escapes_message() {
        let html = fallback("t", "bad <tag> & \"quote\"");
        assert!(!html.contains("<tag>"), "{html}");
        assert!(!html.contains("\"quote\""), "{html}");
        assert!(html.contains("Preview unavailable"));
        assert!(html.contains("role=\"alert\""));
    }

    #[test]
    fn test_fallback_shows_plain_message_verbatim() {
        let html = fallback("t", "line 3 nests too deep");
        assert!(html.contains("<p>line 3 nests too deep</p>"), "{html}");
    }

    #[test]
    fn test_missing_trailing_newline_is_added() {
        let html = document("t", "<p>x</p>").unwrap();
        assert!(html.contains("<p>x</p>\n</body>"));
    }
}
