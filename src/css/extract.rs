//! Declaration extractor: splits a run of declaration text into `name: value;` ranges.
//!
//! The extractor is lenient. Missing values, missing terminators and declarations
//! typed in front of existing ones all produce usable ranges instead of errors.

use super::error::ParseError;
use super::tokenizer::{tokenize, Token, TokenKind};
use crate::source::Range;

/// Ranges of one extracted declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    pub name: Range,
    pub value: Range,
    /// The `;` terminator, or an empty range at the untrimmed value end.
    pub terminator: Range,
}

impl Declaration {
    pub fn between(&self) -> Range {
        Range::new(self.name.end, self.value.start)
    }

    /// Value end to terminator end.
    pub fn after(&self) -> Range {
        Range::new(self.value.end, self.terminator.end)
    }
}

/// Token cursor used while consuming declarations.
struct Cursor<'t> {
    tokens: &'t [Token],
    index: usize,
}

impl<'t> Cursor<'t> {
    fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.index)
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.index + 1)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn skip_formatting(&mut self) {
        while self
            .current()
            .is_some_and(|t| t.is_formatting() || t.is_op(';'))
        {
            self.advance();
        }
    }
}

fn trim(source: &str, mut range: Range, start: bool, end: bool) -> Range {
    let text = range.substring(source);
    if start {
        range.start += text.len() - text.trim_start().len();
    }
    if end {
        range.end -= text.len() - text.trim_end().len();
    }
    if range.end < range.start {
        range.end = range.start;
    }
    range
}

/// Start of the first line break after the last non-formatting token.
///
/// An unterminated value never spans the blank lines and comment lines that follow it.
fn line_break_after_content(tokens: &[Token]) -> Option<usize> {
    let from = tokens
        .iter()
        .rposition(|t| !t.is_formatting())
        .map_or(0, |i| i + 1);
    tokens[from..]
        .iter()
        .find(|t| t.kind == TokenKind::Line)
        .map(|t| t.span.start)
}

/// Consume one declaration starting at the cursor.
fn consume(cursor: &mut Cursor<'_>, source: &str) -> Option<Declaration> {
    cursor.skip_formatting();
    let first = cursor.current()?;

    let mut name = first.span;
    let at_rule = first.is_op('@');
    let mut consumed_end = first.span.end;
    let mut value: Option<Range> = None;
    let mut terminator: Option<Range> = None;
    cursor.advance();

    // Name: runs up to `:`, a line break or `;`. At-rule names also stop at whitespace.
    while let Some(mut token) = cursor.current() {
        if token.kind == TokenKind::White && cursor.peek().is_some_and(|t| t.is_op(':')) {
            // `@a : 1;`
            cursor.advance();
            token = cursor.current()?;
        }
        name.end = token.span.end;
        consumed_end = token.span.end;

        match token.kind {
            TokenKind::Op(':') | TokenKind::White => {
                name.end = token.span.start;
                cursor.advance();
                if token.is_op(':') || at_rule {
                    break;
                }
            }
            TokenKind::Op(';') | TokenKind::Line => {
                // No value: a mixin call or a declaration still being typed.
                name.end = token.span.start;
                value = Some(Range::empty(token.span.start));
                if token.is_op(';') {
                    terminator = Some(token.span);
                }
                cursor.advance();
                break;
            }
            _ => cursor.advance(),
        }
    }

    if value.is_none() {
        if let Some(first_value) = cursor.current() {
            let mut range = Range::empty(first_value.span.start);
            let mut last_newline: Option<usize> = None;
            let value_start = cursor.index;
            let mut value_stop = cursor.tokens.len();

            while let Some(token) = cursor.current() {
                match token.kind {
                    TokenKind::Line => {
                        last_newline = Some(cursor.index);
                        range.end = token.span.end;
                        cursor.advance();
                    }
                    TokenKind::Op('}') | TokenKind::Op(';') => {
                        range.end = token.span.start;
                        value_stop = cursor.index;
                        if token.is_op(';') {
                            terminator = Some(token.span);
                        }
                        cursor.advance();
                        break;
                    }
                    TokenKind::Op(':') if last_newline.is_some() => {
                        // A value typed in front of an existing declaration without a `;`:
                        // stop at the last line break and resume from there.
                        if let Some(newline) = last_newline {
                            range.end = cursor.tokens[newline].span.start;
                            value_stop = newline;
                            cursor.index = newline;
                        }
                        break;
                    }
                    _ => {
                        range.end = token.span.end;
                        cursor.advance();
                    }
                }
            }
            if terminator.is_none() {
                if let Some(line) = line_break_after_content(&cursor.tokens[value_start..value_stop]) {
                    range.end = range.end.min(line);
                }
            }
            value = Some(range);
        }
    }

    let value = value.unwrap_or_else(|| Range::empty(consumed_end.max(name.end)));
    let terminator = terminator.unwrap_or_else(|| Range::empty(value.end));

    Some(Declaration {
        name: trim(source, name, true, true),
        value: trim(source, value, true, terminator.len() > 0),
        terminator,
    })
}

/// Extract every declaration found in `range` of `source`.
///
/// `limit` bounds both the tokenizer and the number of declarations consumed.
pub fn extract_declarations(
    source: &str,
    range: Range,
    limit: usize,
) -> Result<Vec<Declaration>, ParseError> {
    let text = range.substring(source);
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let tokens = tokenize(source, Range::with_len(range.start, trimmed.len()), limit)?;
    let mut cursor = Cursor {
        tokens: &tokens,
        index: 0,
    };
    let mut out = Vec::new();
    let mut steps = 0usize;

    loop {
        let start = cursor.index;
        let Some(declaration) = consume(&mut cursor, source) else {
            break;
        };
        out.push(declaration);

        steps += 1;
        if steps > limit {
            return Err(ParseError::exhausted(limit, source, declaration.name.start));
        }
        // The newline rewind always lands past the declaration's first token.
        debug_assert!(cursor.index > start, "extractor made no progress");
        if cursor.index <= start {
            cursor.index = start + 1;
        }
    }

    Ok(out)
}
