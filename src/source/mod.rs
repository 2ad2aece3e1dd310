//! Byte ranges and the shared text buffer they index into.

pub mod buffer;
pub mod range;

pub use buffer::{BufferError, Change, Changeset, Location, Source};
pub use range::{sort_ranges, Range};
