//! The shared, mutable text buffer every node of a tree points into.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::range::Range;

/// Number of characters shown on each side of the column in a [`Location`] hint.
const HINT_WINDOW: usize = 50;

/// Errors raised when an edit does not fit the buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("range {range} is outside of a buffer of {len} bytes")]
    OutOfBounds { range: Range, len: usize },
    #[error("range {range} does not fall on character boundaries")]
    NotCharBoundary { range: Range },
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A human-readable position inside a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
    /// Full text of the line.
    pub text: String,
    /// The line (windowed around the column) and a `---^` pointer beneath it.
    pub hint: String,
}

impl Location {
    /// Resolve byte `offset` of `text` into line, column and hint.
    pub fn resolve(text: &str, offset: usize) -> Location {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }

        let bytes = text.as_bytes();
        let mut line = 1;
        let mut line_start = 0;
        let mut i = 0;
        while i < offset {
            match bytes[i] {
                b'\n' => {
                    line += 1;
                    line_start = i + 1;
                }
                b'\r' => {
                    if bytes.get(i + 1) == Some(&b'\n') && i + 1 < offset {
                        i += 1;
                    }
                    line += 1;
                    line_start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }

        let column = text[line_start..offset].chars().count() + 1;
        let line_end = text[line_start..]
            .find(['\r', '\n'])
            .map_or(text.len(), |n| line_start + n);
        let line_text = &text[line_start..line_end];

        let skip = (column - 1).saturating_sub(HINT_WINDOW);
        let chunk: String = line_text.chars().skip(skip).take(HINT_WINDOW * 2).collect();
        let hint = format!("{chunk}\n{}^", "-".repeat(column - 1 - skip));

        Location {
            line,
            column,
            text: line_text.to_owned(),
            hint,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, char {}", self.line, self.column)
    }
}

// ---------------------------------------------------------------------------
// Changes
// ---------------------------------------------------------------------------

/// One buffer edit: bytes `[start, end)` of the text at that moment were replaced by `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(usize, usize, String)", into = "(usize, usize, String)")]
pub struct Change {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl From<(usize, usize, String)> for Change {
    fn from((start, end, text): (usize, usize, String)) -> Self {
        Change { start, end, text }
    }
}

impl From<Change> for (usize, usize, String) {
    fn from(change: Change) -> Self {
        (change.start, change.end, change.text)
    }
}

/// An ordered log of edits. Replaying it over the original text reproduces the edited text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Changeset(Vec<Change>);

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) {
        self.0.push(change);
    }

    pub fn changes(&self) -> &[Change] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply every change, in order, to `original`.
    pub fn replay(&self, original: &str) -> Result<String, BufferError> {
        let mut source = Source::new(original);
        for change in &self.0 {
            source.update(Range::new(change.start, change.end), &change.text)?;
        }
        Ok(source.into_text())
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// The text buffer of a tree.
///
/// Every update may be appended to a [`Changeset`] when recording is on.
#[derive(Debug, Clone, Default)]
pub struct Source {
    text: String,
    changes: Option<Changeset>,
}

impl Source {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            changes: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn substring(&self, range: Range) -> &str {
        range.substring(&self.text)
    }

    /// Replace the bytes of `range` with `text`.
    pub fn update(&mut self, range: Range, text: &str) -> Result<(), BufferError> {
        if range.end > self.text.len() {
            return Err(BufferError::OutOfBounds {
                range,
                len: self.text.len(),
            });
        }
        if !self.text.is_char_boundary(range.start) || !self.text.is_char_boundary(range.end) {
            return Err(BufferError::NotCharBoundary { range });
        }

        self.text.replace_range(range.start..range.end, text);
        if let Some(changes) = self.changes.as_mut() {
            changes.push(Change {
                start: range.start,
                end: range.end,
                text: text.to_owned(),
            });
        }
        Ok(())
    }

    /// Start logging edits. A log that is already running is kept.
    pub fn start_recording(&mut self) {
        self.changes.get_or_insert_with(Changeset::new);
    }

    pub fn changeset(&self) -> Option<&Changeset> {
        self.changes.as_ref()
    }

    /// Take the recorded log. Recording stops.
    pub fn take_changeset(&mut self) -> Option<Changeset> {
        self.changes.take()
    }

    pub fn location(&self, offset: usize) -> Location {
        Location::resolve(&self.text, offset)
    }
}
