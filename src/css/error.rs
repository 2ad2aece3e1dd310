//! Fatal lexical and structural errors raised while parsing.

use crate::source::Location;

/// Failures raised by the tokenizer callbacks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, thiserror::Error)]
pub enum LexErrorKind {
    #[default]
    #[error("unrecognized character")]
    UnrecognizedCharacter,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("unterminated backtick block")]
    UnterminatedBacktick,
    #[error("unterminated parenthesized group")]
    UnterminatedBrace,
    #[error("iteration limit exceeded")]
    IterationLimit,
}

/// Failures raised by the section scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StructureErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated backtick block")]
    UnterminatedBacktick,
    #[error("unterminated interpolation")]
    InvalidInterpolation,
    #[error("invalid url()")]
    InvalidUrl,
    #[error("unbalanced braces")]
    UnbalancedBraces,
}

/// Errors that abort a parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("CSS parsing error at {location}: {kind}\n{}", location.hint)]
    Lexical {
        kind: LexErrorKind,
        location: Location,
    },

    #[error("CSS parsing error at {location}: unrecognized character '{ch}'\n{}", location.hint)]
    UnrecognizedCharacter { ch: char, location: Location },

    #[error("CSS parsing error at {location}: {kind}\n{}", location.hint)]
    Structure {
        kind: StructureErrorKind,
        location: Location,
    },

    #[error("CSS parsing error at {location}: more than {limit} steps spent on a single token")]
    ResourceExhausted { limit: usize, location: Location },
}

impl ParseError {
    /// Where in the source the error was detected.
    pub fn location(&self) -> &Location {
        match self {
            ParseError::Lexical { location, .. }
            | ParseError::UnrecognizedCharacter { location, .. }
            | ParseError::Structure { location, .. }
            | ParseError::ResourceExhausted { location, .. } => location,
        }
    }

    pub(crate) fn structure(kind: StructureErrorKind, text: &str, offset: usize) -> Self {
        ParseError::Structure {
            kind,
            location: Location::resolve(text, offset),
        }
    }

    pub(crate) fn exhausted(limit: usize, text: &str, offset: usize) -> Self {
        ParseError::ResourceExhausted {
            limit,
            location: Location::resolve(text, offset),
        }
    }
}
