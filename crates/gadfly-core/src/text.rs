//! Text position utilities for byte offsets and line:column conversions.
//!
//! Conventions (shared across the workspace):
//! - Byte offsets are 0-indexed
//! - Lines and columns are 1-indexed
//!
//! Fixers lean on [`leading_indent`] to lift indentation from the original
//! file instead of synthesizing it, and on [`line_at_offset`] for the
//! one-line reference snippets the resolver attaches to results.

use crate::patch::Span;

// ============================================================================
// Offset / Position Conversions
// ============================================================================

/// Convert a byte offset to 1-indexed line and column.
///
/// Columns count bytes. If `offset` exceeds the content length, returns the
/// position at end of content.
pub fn offset_to_position(content: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(content.len());
    let mut line = 1u32;
    let mut col = 1u32;
    for (i, byte) in content.bytes().enumerate() {
        if i >= offset {
            break;
        }
        if byte == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Byte offset of the start of the line containing `offset`.
pub fn line_start(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    content[..offset].rfind('\n').map(|p| p + 1).unwrap_or(0)
}

/// Byte offset one past the end of the line containing `offset`
/// (past the trailing `\n` when one exists).
pub fn line_end(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    content[offset..]
        .find('\n')
        .map(|p| offset + p + 1)
        .unwrap_or(content.len())
}

/// The text of the line containing `offset`, without its trailing newline.
pub fn line_at_offset(content: &str, offset: usize) -> &str {
    let start = line_start(content, offset);
    let end = line_end(content, offset);
    content[start..end].trim_end_matches(['\n', '\r'])
}

/// Count the lines covered by a span (inclusive of both endpoints' lines).
pub fn span_line_count(content: &str, span: Span) -> u32 {
    let (start_line, _) = offset_to_position(content, span.start as usize);
    let end = (span.end as usize).saturating_sub(1).max(span.start as usize);
    let (end_line, _) = offset_to_position(content, end);
    end_line - start_line + 1
}

// ============================================================================
// Indentation
// ============================================================================

/// Leading whitespace of the line containing `offset`.
///
/// Scans backward from `offset` to the preceding newline, then forward over
/// spaces and tabs. This is how fixers preserve the original indentation of
/// an edited region.
pub fn leading_indent(content: &str, offset: usize) -> &str {
    let start = line_start(content, offset);
    let line = &content[start..];
    let indent_len = line
        .bytes()
        .take_while(|&b| b == b' ' || b == b'\t')
        .count();
    &line[..indent_len]
}

/// Strip the longest common leading whitespace from a set of lines and
/// re-indent each non-empty line with `indent`.
///
/// Used when a fixer moves a block of statements to a new nesting level:
/// the block's internal structure is preserved, only the base indentation
/// changes. Blank lines stay blank.
pub fn reindent(text: &str, indent: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let common = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.bytes().take_while(|&b| b == b' ' || b == b'\t').count())
        .min()
        .unwrap_or(0);

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if line.trim().is_empty() {
            continue;
        }
        out.push_str(indent);
        out.push_str(&line[common.min(line.len())..]);
    }
    out
}

/// Extract the text of a span from content.
///
/// Returns `None` if the span extends beyond the content or does not fall
/// on UTF-8 boundaries.
pub fn extract_span(content: &str, span: Span) -> Option<&str> {
    content.get(span.start as usize..span.end as usize)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_to_position_basic() {
        let content = "line1\nline2\nline3\n";
        assert_eq!(offset_to_position(content, 0), (1, 1));
        assert_eq!(offset_to_position(content, 4), (1, 5));
        assert_eq!(offset_to_position(content, 6), (2, 1));
        assert_eq!(offset_to_position(content, 12), (3, 1));
    }

    #[test]
    fn offset_past_end_clamps() {
        assert_eq!(offset_to_position("short", 100), (1, 6));
    }

    #[test]
    fn line_bounds() {
        let content = "aa\nbbb\ncc";
        assert_eq!(line_start(content, 4), 3);
        assert_eq!(line_end(content, 4), 7);
        assert_eq!(line_start(content, 0), 0);
        assert_eq!(line_end(content, 8), 9);
    }

    #[test]
    fn line_snippet() {
        let content = "first\n\tsecond line\nthird";
        assert_eq!(line_at_offset(content, 8), "\tsecond line");
        assert_eq!(line_at_offset(content, 0), "first");
        assert_eq!(line_at_offset(content, 20), "third");
    }

    #[test]
    fn leading_indent_tabs_and_spaces() {
        let content = "func f() {\n\t\tx := 1\n}\n";
        assert_eq!(leading_indent(content, 13), "\t\t");
        assert_eq!(leading_indent(content, 0), "");
    }

    #[test]
    fn span_line_counts() {
        let content = "a\nb\nc\nd\n";
        assert_eq!(span_line_count(content, Span::new(0, 1)), 1);
        assert_eq!(span_line_count(content, Span::new(0, 4)), 2);
        assert_eq!(span_line_count(content, Span::new(2, 8)), 3);
    }

    #[test]
    fn reindent_preserves_relative_structure() {
        let text = "\t\tif x {\n\t\t\ty()\n\t\t}";
        let out = reindent(text, "\t");
        assert_eq!(out, "\tif x {\n\t\ty()\n\t}");
    }

    #[test]
    fn reindent_single_line() {
        assert_eq!(reindent("doShape()", "\t\t"), "\t\tdoShape()");
    }

    #[test]
    fn reindent_keeps_blank_lines_blank() {
        let text = "a()\n\nb()";
        assert_eq!(reindent(text, "  "), "  a()\n\n  b()");
    }

    #[test]
    fn extract_span_bounds() {
        let content = "hello world";
        assert_eq!(extract_span(content, Span::new(0, 5)), Some("hello"));
        assert_eq!(extract_span(content, Span::new(6, 100)), None);
    }
}
