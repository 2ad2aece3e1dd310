//! Section scanner: locates every `selector { ... }` rule in a buffer.
//!
//! Scanning runs over a *sanitized* copy of the source. Comments are masked with
//! spaces and `#{...}` / `@{...}` interpolations with `a`. Masking keeps every byte
//! offset stable, so ranges found in the sanitized copy address the original text.

use super::error::{ParseError, StructureErrorKind};
use super::tokenizer::Guard;
use crate::config::DEFAULT_ITERATION_LIMIT;
use crate::source::Range;

/// Offsets of one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpan {
    /// Start of the (trimmed) selector.
    pub start: usize,
    /// End of the (trimmed) selector.
    pub selector_end: usize,
    /// Offset of the opening `{`.
    pub content_start: usize,
    /// Offset just past the closing `}`.
    pub end: usize,
}

impl SectionSpan {
    pub fn range(&self) -> Range {
        Range::new(self.start, self.end)
    }

    /// The same span moved `offset` bytes forward.
    pub fn shifted(self, offset: usize) -> SectionSpan {
        SectionSpan {
            start: self.start + offset,
            selector_end: self.selector_end + offset,
            content_start: self.content_start + offset,
            end: self.end + offset,
        }
    }
}

/// Scanner failure positioned at a byte offset, resolved to a [`ParseError`] by the caller.
#[derive(Debug, Clone, Copy)]
enum Fault {
    Structure(StructureErrorKind, usize),
    Exhausted(usize),
}

impl Fault {
    fn into_error(self, text: &str, limit: usize) -> ParseError {
        match self {
            Fault::Structure(kind, offset) => ParseError::structure(kind, text, offset),
            Fault::Exhausted(offset) => ParseError::exhausted(limit, text, offset),
        }
    }
}

#[inline]
fn is_quote(b: u8) -> bool {
    b == b'"' || b == b'\''
}

/// Index just past the string opened by the quote at `open`, or `None` if it never closes.
fn skip_string(b: &[u8], open: usize) -> Option<usize> {
    let quote = b[open];
    let mut i = open + 1;
    while i < b.len() {
        match b[i] {
            b'\\' => i += 2,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn find(b: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    b.get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

/// Copy `text`, masking every range with `fill` repeated per byte, or dropping it when `fill` is `None`.
fn replace_ranges(text: &str, ranges: &[Range], fill: Option<char>) -> String {
    if ranges.is_empty() {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut offset = 0;
    for r in ranges {
        out.push_str(&text[offset..r.start]);
        if let Some(ch) = fill {
            out.extend(std::iter::repeat(ch).take(r.len()));
        }
        offset = r.end;
    }
    out.push_str(&text[offset..]);
    out
}

// ---------------------------------------------------------------------------
// Sanitizing
// ---------------------------------------------------------------------------

fn block_comment_ranges(css: &str) -> Vec<Range> {
    let b = css.as_bytes();
    let mut ranges = Vec::new();
    if find(b, 0, b"/*").is_none() {
        return ranges;
    }

    let mut i = 0;
    while i < b.len() {
        if b[i] == b'/' && b.get(i + 1) == Some(&b'*') {
            // An unclosed comment runs to the end of input.
            let end = find(b, i + 2, b"*/").map_or(b.len(), |p| p + 2);
            ranges.push(Range::new(i, end));
            i = end;
        } else if is_quote(b[i]) {
            i = skip_string(b, i).unwrap_or(b.len());
        } else {
            i += 1;
        }
    }
    ranges
}

/// Whether the `(` at `paren` opens a `url(` call.
fn is_url_open(b: &[u8], paren: usize) -> bool {
    let mut j = paren;
    while j > 0 && b[j - 1].is_ascii_whitespace() {
        j -= 1;
    }
    if j < 3 || !b[j - 3..j].eq_ignore_ascii_case(b"url") {
        return false;
    }
    j == 3 || !(b[j - 4].is_ascii_alphanumeric() || b[j - 4] == b'_')
}

fn line_comment_ranges(css: &str) -> Result<Vec<Range>, Fault> {
    let b = css.as_bytes();
    let mut ranges = Vec::new();
    if find(b, 0, b"//").is_none() {
        return Ok(ranges);
    }

    let mut i = 0;
    while i < b.len() {
        match b[i] {
            b'(' if is_url_open(b, i) => {
                // `//` inside url() is part of the address.
                let mut j = i + 1;
                while j < b.len() && b[j].is_ascii_whitespace() {
                    j += 1;
                }
                if j < b.len() && is_quote(b[j]) {
                    j = skip_string(b, j).unwrap_or(b.len());
                }
                let close = b[j.min(b.len())..]
                    .iter()
                    .position(|&c| c == b')')
                    .ok_or(Fault::Structure(StructureErrorKind::InvalidUrl, i + 1))?;
                i = j + close + 1;
            }
            b'/' if b.get(i + 1) == Some(&b'/') => {
                let mut end = i + 2;
                while end < b.len() {
                    end += 1;
                    if matches!(b[end - 1], b'\n' | b'\r') {
                        break;
                    }
                }
                ranges.push(Range::new(i, end));
                i = end;
            }
            c if is_quote(c) => i = skip_string(b, i).unwrap_or(b.len()),
            _ => i += 1,
        }
    }
    Ok(ranges)
}

fn strip_comments_inner(css: &str, replacement: Option<char>) -> Result<String, Fault> {
    let css = replace_ranges(css, &block_comment_ranges(css), replacement);
    let ranges = line_comment_ranges(&css)?;
    Ok(replace_ranges(&css, &ranges, replacement))
}

fn sanitize_inner(css: &str) -> Result<String, Fault> {
    let content = strip_comments_inner(css, Some(' '))?;
    let b = content.as_bytes();
    let mut ranges = Vec::new();

    let mut i = 0;
    while i < b.len() {
        match b[i] {
            b'#' | b'@' if b.get(i + 1) == Some(&b'{') => {
                let close = find(b, i + 2, b"}")
                    .ok_or(Fault::Structure(StructureErrorKind::InvalidInterpolation, i))?;
                ranges.push(Range::new(i, close + 1));
                i = close + 1;
            }
            c if is_quote(c) => i = skip_string(b, i).unwrap_or(b.len()),
            _ => i += 1,
        }
    }

    Ok(replace_ranges(&content, &ranges, Some('a')))
}

/// Replace comments with `replacement` repeated per byte, or remove them when `None`.
///
/// `//` comments are recognized everywhere except inside `url(...)`.
pub fn strip_comments(css: &str, replacement: Option<char>) -> Result<String, ParseError> {
    strip_comments_inner(css, replacement).map_err(|f| f.into_error(css, DEFAULT_ITERATION_LIMIT))
}

/// Mask comments and interpolations. The result has the same byte length as `css`.
///
/// Sanitized text is only fit for searching, never for output.
pub fn sanitize(css: &str) -> Result<String, ParseError> {
    sanitize_inner(css).map_err(|f| f.into_error(css, DEFAULT_ITERATION_LIMIT))
}

// ---------------------------------------------------------------------------
// Braces and selectors
// ---------------------------------------------------------------------------

fn match_braces_inner(content: &[u8], pos: usize, limit: usize) -> Result<Vec<Range>, Fault> {
    let mut guard = Guard::new(limit);
    let mut stack: Vec<usize> = Vec::new();
    let mut ranges = Vec::new();

    let mut i = pos;
    while i < content.len() {
        guard.tick().map_err(|_| Fault::Exhausted(i))?;
        match content[i] {
            b'{' => stack.push(i),
            b'}' => {
                let open = stack
                    .pop()
                    .ok_or(Fault::Structure(StructureErrorKind::UnbalancedBraces, i))?;
                ranges.push(Range::new(open, i + 1));
                if stack.is_empty() {
                    return Ok(ranges);
                }
            }
            b'`' => {
                let close = content[i + 1..]
                    .iter()
                    .position(|&c| c == b'`')
                    .ok_or(Fault::Structure(StructureErrorKind::UnterminatedBacktick, i))?;
                i += close + 1;
            }
            c if is_quote(c) => {
                i = skip_string(content, i).unwrap_or(content.len());
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    match stack.first() {
        Some(&open) => Err(Fault::Structure(StructureErrorKind::UnbalancedBraces, open)),
        None => Ok(ranges),
    }
}

/// Match the brace block opened at `pos`, returning every `{...}` range inside it
/// in closing order (innermost first, the outer block last).
///
/// `content` must already be sanitized.
pub fn match_braces(content: &str, pos: usize) -> Result<Vec<Range>, ParseError> {
    match_braces_inner(content.as_bytes(), pos, DEFAULT_ITERATION_LIMIT)
        .map_err(|f| f.into_error(content, DEFAULT_ITERATION_LIMIT))
}

/// Walk backward from `b[pos]` over a quoted string. Returns `false` if `b[pos]` is not a quote.
fn skip_string_backward(b: &[u8], pos: &mut isize) -> bool {
    let quote = b[*pos as usize];
    if !is_quote(quote) {
        return false;
    }
    loop {
        *pos -= 1;
        if *pos < 0 {
            break;
        }
        let p = *pos as usize;
        if b[p] == quote && (p == 0 || b[p - 1] != b'\\') {
            break;
        }
    }
    true
}

/// Locate the selector that ends at the `{` at `brace`, scanning backward to the
/// previous `{`, `}` or `;`. Parenthesized groups (mixin arguments, guards) are
/// skipped whole. The result is trimmed of whitespace.
pub fn extract_selector(content: &str, brace: usize) -> Range {
    let b = content.as_bytes();
    let mut pos = brace as isize;

    loop {
        pos -= 1;
        if pos < 0 {
            break;
        }
        if skip_string_backward(b, &mut pos) {
            continue;
        }
        match b[pos as usize] {
            b')' => loop {
                pos -= 1;
                if pos < 0 {
                    break;
                }
                if skip_string_backward(b, &mut pos) {
                    continue;
                }
                if b[pos as usize] == b'(' {
                    break;
                }
            },
            b'{' | b'}' | b';' => {
                pos += 1;
                break;
            }
            _ => {}
        }
    }

    let start = pos.max(0) as usize;
    let slice = &b[start..brace];
    match slice.iter().position(|c| !c.is_ascii_whitespace()) {
        Some(lead) => {
            let trail = slice.iter().rev().take_while(|c| c.is_ascii_whitespace()).count();
            Range::new(start + lead, brace - trail)
        }
        None => Range::empty(brace),
    }
}

/// Find every rule in `css`, sorted by start offset.
pub fn scan_sections(css: &str, limit: usize) -> Result<Vec<SectionSpan>, ParseError> {
    let clean = sanitize_inner(css).map_err(|f| f.into_error(css, limit))?;
    let b = clean.as_bytes();
    let mut sections = Vec::new();

    let mut i = 0;
    while i < b.len() {
        match b[i] {
            c if is_quote(c) => {
                i = skip_string(b, i).ok_or_else(|| {
                    ParseError::structure(StructureErrorKind::UnterminatedString, css, i)
                })?;
            }
            b'{' => {
                let groups = match_braces_inner(b, i, limit).map_err(|f| f.into_error(css, limit))?;
                for group in &groups {
                    let selector = extract_selector(&clean, group.start);
                    sections.push(SectionSpan {
                        start: selector.start,
                        selector_end: selector.end,
                        content_start: group.start,
                        end: group.end,
                    });
                }
                i = groups.last().map_or(i + 1, |g| g.end);
            }
            _ => i += 1,
        }
    }

    sections.sort_by_key(|s| s.start);
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn selectors(css: &str) -> Vec<String> {
        scan_sections(css, DEFAULT_ITERATION_LIMIT)
            .unwrap()
            .into_iter()
            .map(|s| css[s.start..s.selector_end].to_string())
            .collect()
    }

    fn structure_kind(err: ParseError) -> StructureErrorKind {
        match err {
            ParseError::Structure { kind, .. } => kind,
            other => panic!("expected a structure error, got {other}"),
        }
    }

    // ── Sanitizing ───────────────────────────────────────────────────

    #[test]
    fn sanitize_masks_comments_and_interpolations() {
        let css = "a /* x */ b // y\nc #{d} e";
        let clean = sanitize(css).unwrap();
        assert_eq!(clean.len(), css.len());
        assert_eq!(clean, format!("a {} b {}c aaaa e", " ".repeat(7), " ".repeat(5)));
    }

    #[test]
    fn sanitize_keeps_urls_and_strings() {
        let css = "a{b:url(http://x.com/y.png);c:\"//d\"}";
        assert_eq!(sanitize(css).unwrap(), css);
    }

    #[test]
    fn unclosed_block_comment_runs_to_end() {
        assert_eq!(sanitize("a{} /* b{}").unwrap(), format!("a{{}} {}", " ".repeat(6)));
    }

    #[test]
    fn strip_comments_can_remove() {
        assert_eq!(strip_comments("a,/* x */ b", None).unwrap(), "a, b");
    }

    #[test]
    fn sanitize_keeps_multibyte_length() {
        let css = "/* жж */a{}";
        assert_eq!(sanitize(css).unwrap().len(), css.len());
    }

    // ── Sections ─────────────────────────────────────────────────────

    #[test]
    fn flat_sections() {
        let spans = scan_sections("a {b:c}\nd {e:f}", DEFAULT_ITERATION_LIMIT).unwrap();
        assert_eq!(
            spans,
            vec![
                SectionSpan {
                    start: 0,
                    selector_end: 1,
                    content_start: 2,
                    end: 7
                },
                SectionSpan {
                    start: 8,
                    selector_end: 9,
                    content_start: 10,
                    end: 15
                },
            ]
        );
    }

    #[test]
    fn nested_sections_sorted_by_start() {
        assert_eq!(selectors("a { b {} c { d {} } }"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn selector_stops_at_declarations() {
        assert_eq!(selectors("a { x: y; b:hover {} }"), vec!["a", "b:hover"]);
    }

    #[test]
    fn selector_skips_mixin_arguments() {
        assert_eq!(
            selectors(".m(@a; @b) when (@a > 1) {x:y}"),
            vec![".m(@a; @b) when (@a > 1)"]
        );
    }

    #[test]
    fn selector_skips_quoted_braces() {
        assert_eq!(selectors("a[title=\"}\"] {}"), vec!["a[title=\"}\"]"]);
    }

    #[test]
    fn comment_before_selector_is_trimmed() {
        let spans = scan_sections("/* c */ a {}", DEFAULT_ITERATION_LIMIT).unwrap();
        assert_eq!(spans[0].start, 8);
    }

    #[test]
    fn interpolated_selector() {
        assert_eq!(selectors(".a-#{$b} {}"), vec![".a-#{$b}"]);
    }

    #[test]
    fn braces_in_strings_are_ignored() {
        assert_eq!(selectors("a { content: \"{\"; }"), vec!["a"]);
    }

    #[test]
    fn blank_selector_is_empty_range() {
        let spans = scan_sections("{}", DEFAULT_ITERATION_LIMIT).unwrap();
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].selector_end, 0);
    }

    // ── Errors ───────────────────────────────────────────────────────

    #[test]
    fn unterminated_string_literal() {
        let err = scan_sections("a {} 'b", DEFAULT_ITERATION_LIMIT).unwrap_err();
        assert_eq!(structure_kind(err), StructureErrorKind::UnterminatedString);
    }

    #[test]
    fn unclosed_brace() {
        let err = scan_sections("a { b {}", DEFAULT_ITERATION_LIMIT).unwrap_err();
        assert_eq!(structure_kind(err.clone()), StructureErrorKind::UnbalancedBraces);
        assert_eq!(err.location().column, 3);
    }

    #[test]
    fn stray_closing_brace_is_skipped() {
        let spans = scan_sections("a {} }", DEFAULT_ITERATION_LIMIT).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].end, 4);
        assert!(scan_sections("}", DEFAULT_ITERATION_LIMIT).unwrap().is_empty());
    }

    #[test]
    fn unterminated_backtick() {
        let err = scan_sections("a { b: `c; }", DEFAULT_ITERATION_LIMIT).unwrap_err();
        assert_eq!(structure_kind(err), StructureErrorKind::UnterminatedBacktick);
    }

    #[test]
    fn unterminated_interpolation() {
        let err = scan_sections("a {} #{b", DEFAULT_ITERATION_LIMIT).unwrap_err();
        assert_eq!(structure_kind(err), StructureErrorKind::InvalidInterpolation);
    }

    #[test]
    fn unclosed_url() {
        let err = scan_sections("// x\na { b: url(c; }", DEFAULT_ITERATION_LIMIT).unwrap_err();
        assert_eq!(structure_kind(err), StructureErrorKind::InvalidUrl);
    }

    #[test]
    fn brace_matching_respects_limit() {
        let css = "a { b: c; d: e; }";
        assert!(matches!(
            scan_sections(css, 3),
            Err(ParseError::ResourceExhausted { limit: 3, .. })
        ));
    }

    #[test]
    fn match_braces_reports_inner_first() {
        let ranges = match_braces("a{b{}c{}}", 1).unwrap();
        assert_eq!(
            ranges,
            vec![Range::new(3, 5), Range::new(6, 8), Range::new(1, 9)]
        );
    }
}
