//! Nesting guard run before parsing.

use super::RenderError;

const TAB_WIDTH: usize = 4;

/// Reject sources that nest containers or brackets deeper than `max_nesting`.
///
/// Two depths are measured per line outside fenced code: container markers
/// that open the line (`>`, bullets, ordered list numbers) and unclosed `[`
/// or `(` brackets, which carry over until the next blank line.
///
/// # Errors
/// Returns [`RenderError::ParseFailure`] naming the first offending line.
pub fn check_nesting(source: &str, max_nesting: usize) -> Result<(), RenderError> {
    let mut fence: Option<(char, usize)> = None;
    let mut bracket_depth = 0usize;

    for (index, line) in source.lines().enumerate() {
        let line_no = index + 1;

        if let Some(marker) = fence_marker(line) {
            match fence {
                None => {
                    fence = Some(marker);
                    continue;
                }
                Some((ch, len)) if marker.0 == ch && marker.1 >= len => {
                    fence = None;
                    continue;
                }
                Some(_) => {}
            }
        }
        if fence.is_some() {
            continue;
        }

        if line.trim().is_empty() {
            bracket_depth = 0;
            continue;
        }

        let containers = container_depth(line);
        if containers > max_nesting {
            return Err(too_deep(line_no, "block containers", containers, max_nesting));
        }

        let mut escaped = false;
        for ch in line.chars() {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '[' | '(' => {
                    bracket_depth += 1;
                    if bracket_depth > max_nesting {
                        return Err(too_deep(
                            line_no,
                            "unclosed brackets",
                            bracket_depth,
                            max_nesting,
                        ));
                    }
                }
                ']' | ')' => bracket_depth = bracket_depth.saturating_sub(1),
                _ => {}
            }
        }
    }
    Ok(())
}

fn too_deep(line: usize, what: &str, depth: usize, max: usize) -> RenderError {
    RenderError::ParseFailure {
        reason: format!("line {line} nests {what} {depth} levels deep (limit {max})"),
    }
}

/// Fence character and run length when `line` opens or closes a code fence.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let ch = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = trimmed.chars().take_while(|c| *c == ch).count();
    (run >= 3).then_some((ch, run))
}

/// Number of block containers a line opens: quote markers, bullets and
/// ordered list numbers, plus one level per two columns of leading
/// indentation when the line opens any container.
fn container_depth(line: &str) -> usize {
    let (indent, offset) = leading_indent(line);
    let mut rest = &line[offset..];
    let mut markers = 0usize;

    loop {
        rest = rest.trim_start_matches([' ', '\t']);
        if let Some(after) = rest.strip_prefix('>') {
            markers += 1;
            rest = after;
        } else if let Some(after) = strip_bullet(rest) {
            markers += 1;
            rest = after;
        } else if let Some(after) = strip_ordinal(rest) {
            markers += 1;
            rest = after;
        } else {
            break;
        }
    }

    if markers > 0 { markers + indent / 2 } else { 0 }
}

/// Columns of leading whitespace, with tabs advancing to the next multiple
/// of [`TAB_WIDTH`], and the byte offset where the indentation ends.
fn leading_indent(line: &str) -> (usize, usize) {
    let mut columns = 0;
    for (offset, ch) in line.char_indices() {
        match ch {
            ' ' => columns += 1,
            '\t' => columns += TAB_WIDTH - columns % TAB_WIDTH,
            _ => return (columns, offset),
        }
    }
    (columns, line.len())
}

fn strip_bullet(text: &str) -> Option<&str> {
    let marker = text.chars().next()?;
    if !matches!(marker, '-' | '*' | '+') {
        return None;
    }
    let after = &text[1..];
    if after.is_empty() || after.starts_with([' ', '\t']) {
        Some(after)
    } else {
        None
    }
}

fn strip_ordinal(text: &str) -> Option<&str> {
    let digits = text.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let after = text[digits..].strip_prefix(['.', ')'])?;
    if after.is_empty() || after.starts_with([' ', '\t']) {
        Some(after)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_prose_passes() {
        assert!(check_nesting("# Title\n\nSome [link](http://x.y) text.", 8).is_ok());
    }

    #[test]
    fn test_deep_blockquote_fails() {
        let source = ">".repeat(20);
        let err = check_nesting(&source, 8).unwrap_err();
        assert!(err.to_string().contains("block containers"), "{err}");
        assert!(err.to_string().contains("line 1"), "{err}");
    }

    #[test]
    fn test_unclosed_brackets_fail() {
        let source = "[".repeat(20);
        let err = check_nesting(&source, 8).unwrap_err();
        assert!(matches!(err, RenderError::ParseFailure { .. }));
        assert!(err.to_string().contains("unclosed brackets"), "{err}");
    }

    #[test]
    fn test_balanced_brackets_do_not_accumulate() {
        let source = "[a](b) ".repeat(100);
        assert!(check_nesting(&source, 4).is_ok());
    }

    #[test]
    fn test_blank_line_resets_bracket_depth() {
        let source = format!("{}\n\n{}", "[".repeat(5), "[".repeat(5));
        assert!(check_nesting(&source, 6).is_ok());
    }

    #[test]
    fn test_escaped_brackets_are_ignored() {
        let source = "\\[".repeat(50);
        assert!(check_nesting(&source, 4).is_ok());
    }

    #[test]
    fn test_fenced_code_is_skipped() {
        let source = format!("```lisp\n{}\n```\n\nafter", "(".repeat(50));
        assert!(check_nesting(&source, 4).is_ok());
    }

    #[test]
    fn test_nested_bullets_on_one_line_count() {
        assert_eq!(container_depth("- - - item"), 3);
        assert_eq!(container_depth("> > 1. item"), 3);
    }

    #[test]
    fn test_thematic_break_is_not_a_container() {
        assert_eq!(container_depth("---"), 0);
        assert_eq!(container_depth("**bold**"), 0);
    }

    #[test]
    fn test_indented_list_item_adds_indent_levels() {
        assert_eq!(container_depth("    - nested"), 3);
        assert_eq!(container_depth("    plain code"), 0);
    }

    #[test]
    fn test_tabs_expand_to_tab_stops() {
        assert_eq!(leading_indent("\t- x"), (4, 1));
        assert_eq!(leading_indent("  \t- x"), (4, 3));
        assert_eq!(leading_indent("\t \t"), (8, 3));
        assert_eq!(container_depth("\t\t- nested"), 5);
        assert_eq!(container_depth("\t> quoted"), 3);
        assert_eq!(container_depth("\tindented code"), 0);
    }

    #[test]
    fn test_tab_nested_list_fails() {
        let source: String = (0..500).map(|k| format!("{}- x\n", "\t".repeat(k))).collect();
        let err = check_nesting(&source, 128).unwrap_err();
        assert!(err.to_string().contains("block containers"), "{err}");
    }

    #[test]
    fn test_shallow_tab_nested_list_passes() {
        let source: String = (0..8).map(|k| format!("{}- x\n", "\t".repeat(k))).collect();
        assert!(check_nesting(&source, 128).is_ok());
    }
}
