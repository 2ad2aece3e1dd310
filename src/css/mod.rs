//! CSS front end: tokenizer, section scanner, declaration extractor, tree builder
//! and the selector model.

pub mod builder;
pub mod error;
pub mod extract;
pub mod scanner;
pub mod selector;
pub mod tokenizer;

pub use builder::build;
pub use error::{LexErrorKind, ParseError, StructureErrorKind};
pub use selector::{Selector, SelectorDeclaration, SelectorPart};
