//! logos-based tokenizer for declaration bodies.
//!
//! Token priority in logos is determined by:
//! 1. Longest match wins (e.g. `-5` as [`TokenKind::Number`] beats `-` as an identifier)
//! 2. Equal-length matches must not overlap, so `=`, `<` and `>` are name characters
//!    and never operators
//!
//! Constructs that can span lines (block comments, strings, backtick blocks and
//! parenthesized groups) are consumed by callbacks. Each callback charges every
//! character it reads to the per-token [`Guard`] carried in the lexer extras.

use logos::{Lexer, Logos};

use super::error::{LexErrorKind, ParseError};
use crate::config::DEFAULT_ITERATION_LIMIT;
use crate::source::{Location, Range};

/// Per-token step budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    limit: usize,
    steps: usize,
}

impl Guard {
    pub fn new(limit: usize) -> Self {
        Self { limit, steps: 0 }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Charge one step. Fails once the budget is spent.
    #[inline]
    pub fn tick(&mut self) -> Result<(), LexErrorKind> {
        self.steps += 1;
        if self.steps > self.limit {
            Err(LexErrorKind::IterationLimit)
        } else {
            Ok(())
        }
    }

    pub fn reset(&mut self) {
        self.steps = 0;
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATION_LIMIT)
    }
}

/// Kind of a lexed token.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexErrorKind)]
#[logos(extras = Guard)]
pub enum TokenKind {
    // ── Layout ───────────────────────────────────────────────────────

    /// Run of spaces and tabs.
    #[regex(r"[ \t]+")]
    White,

    /// `\n`, `\r\n` or a lone `\r`.
    #[token("\n")]
    #[token("\r\n")]
    #[token("\r")]
    Line,

    /// `// ...` up to the end of the line, or `/* ... */`.
    #[regex(r"//[^\r\n]*")]
    #[token("/*", block_comment)]
    Comment,

    // ── Multi-char constructs ────────────────────────────────────────

    /// Quoted string with backslash escapes.
    #[token("\"", quoted)]
    #[token("'", quoted)]
    Str,

    /// Verbatim `` `...` `` block.
    #[token("`", backtick)]
    Backtick,

    /// Parenthesized group, nested parens and strings included.
    #[token("(", paren_group)]
    Brace,

    // ── Words ────────────────────────────────────────────────────────

    /// Name built from letters, Cyrillic letters, `& _ < > = -` and digits after the first char.
    #[regex(r"[a-zA-Z\x{0400}-\x{04FF}&_<>=][a-zA-Z0-9\x{0400}-\x{04FF}&_<>=\-]*")]
    #[regex(r"-([a-zA-Z\x{0400}-\x{04FF}&_<>=\-][a-zA-Z0-9\x{0400}-\x{04FF}&_<>=\-]*)?")]
    Identifier,

    /// Number with an optional sign and at most one decimal point.
    #[regex(r"-?[0-9]+(\.[0-9]*)?")]
    #[regex(r"\.[0-9]+")]
    Number,

    /// Attribute match operator: `*=`, `^=`, `|=`, `$=`, `~=`.
    #[regex(r"[*^|$~]=")]
    Match,

    /// Single-character operator.
    #[regex(r"[{}\[\]+*.,;:~|\\%$#@^!)/]", |lex| lex.slice().chars().next())]
    Op(char),
}

fn block_comment(lex: &mut Lexer<'_, TokenKind>) -> Result<(), LexErrorKind> {
    let rest = lex.remainder();
    let mut prev = 0u8;
    for (i, &b) in rest.as_bytes().iter().enumerate() {
        lex.extras.tick()?;
        if prev == b'*' && b == b'/' {
            lex.bump(i + 1);
            return Ok(());
        }
        prev = b;
    }
    Err(LexErrorKind::UnterminatedComment)
}

fn quoted(lex: &mut Lexer<'_, TokenKind>) -> Result<(), LexErrorKind> {
    let quote = lex.slice().as_bytes()[0];
    let len = scan_string(lex.remainder().as_bytes(), quote, &mut lex.extras)?;
    lex.bump(len);
    Ok(())
}

fn backtick(lex: &mut Lexer<'_, TokenKind>) -> Result<(), LexErrorKind> {
    let rest = lex.remainder();
    for (i, &b) in rest.as_bytes().iter().enumerate() {
        lex.extras.tick()?;
        if b == b'`' {
            lex.bump(i + 1);
            return Ok(());
        }
    }
    Err(LexErrorKind::UnterminatedBacktick)
}

fn paren_group(lex: &mut Lexer<'_, TokenKind>) -> Result<(), LexErrorKind> {
    let rest = lex.remainder().as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i < rest.len() {
        lex.extras.tick()?;
        match rest[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    lex.bump(i + 1);
                    return Ok(());
                }
            }
            q @ (b'"' | b'\'') => {
                i += scan_string(&rest[i + 1..], q, &mut lex.extras)?;
            }
            _ => {}
        }
        i += 1;
    }
    Err(LexErrorKind::UnterminatedBrace)
}

/// Length of a string body up to and including the closing `quote`.
///
/// A raw newline is allowed only when a backslash follows it.
fn scan_string(rest: &[u8], quote: u8, guard: &mut Guard) -> Result<usize, LexErrorKind> {
    let mut i = 0;
    while i < rest.len() {
        guard.tick()?;
        match rest[i] {
            b if b == quote => return Ok(i + 1),
            b'\\' => i += 1,
            b'\n' => {
                if rest.get(i + 1) != Some(&b'\\') {
                    return Err(LexErrorKind::UnterminatedString);
                }
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    Err(LexErrorKind::UnterminatedString)
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// A token with its absolute byte span in the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.substring(source)
    }

    #[inline]
    pub fn is_op(&self, ch: char) -> bool {
        self.kind == TokenKind::Op(ch)
    }

    /// Whitespace, line breaks and comments.
    #[inline]
    pub fn is_formatting(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::White | TokenKind::Line | TokenKind::Comment
        )
    }
}

/// Tokenize `range` of `source`.
///
/// Spans are absolute offsets into `source`, and error locations are reported
/// against the whole buffer.
pub fn tokenize(source: &str, range: Range, limit: usize) -> Result<Vec<Token>, ParseError> {
    let input = range.substring(source);
    let base = range.start;
    let mut lexer = TokenKind::lexer_with_extras(input, Guard::new(limit));
    let mut tokens = Vec::new();

    loop {
        lexer.extras.reset();
        let Some(result) = lexer.next() else { break };
        let span = lexer.span();
        let start = base + span.start;
        match result {
            Ok(kind) => tokens.push(Token {
                kind,
                span: Range::new(start, base + span.end),
            }),
            Err(kind) => return Err(lex_error(kind, source, start, limit)),
        }
    }

    Ok(tokens)
}

/// Tokenize a whole string with the default iteration limit.
pub fn lex(text: &str) -> Result<Vec<Token>, ParseError> {
    tokenize(text, Range::new(0, text.len()), DEFAULT_ITERATION_LIMIT)
}

/// Concatenate the text of `tokens`.
pub fn to_source(tokens: &[Token], source: &str) -> String {
    tokens.iter().map(|t| t.text(source)).collect()
}

fn lex_error(kind: LexErrorKind, source: &str, offset: usize, limit: usize) -> ParseError {
    let location = Location::resolve(source, offset);
    match kind {
        LexErrorKind::IterationLimit => ParseError::ResourceExhausted { limit, location },
        LexErrorKind::UnrecognizedCharacter => ParseError::UnrecognizedCharacter {
            ch: source[offset..].chars().next().unwrap_or('\0'),
            location,
        },
        kind => ParseError::Lexical { kind, location },
    }
}
