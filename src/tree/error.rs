//! Errors raised by tree reads and edits.

use super::node::{NodeKind, RangeName};
use crate::css::ParseError;
use crate::source::BufferError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("index {index} is out of range for {len} children")]
    IndexOutOfRange { index: isize, len: usize },

    #[error("unknown range name \"{0}\"")]
    UnknownRange(String),

    #[error("unknown style \"{0}\", expected before, between or after")]
    UnknownStyle(String),

    #[error("the {0} range is derived and cannot be written")]
    DerivedRange(RangeName),

    #[error("the root node has no writable {0} range")]
    RootRange(RangeName),

    #[error("{0} nodes cannot hold children")]
    NotAContainer(NodeKind),

    #[error("a root node cannot be inserted into another tree")]
    InvalidFragment,

    #[error("node no longer exists")]
    NodeNotFound,

    #[error("serialized {kind} node has no name range")]
    MissingName { kind: NodeKind },

    #[error("serialized tree must start with a root node, found {0}")]
    NotARoot(NodeKind),

    #[error("serialized root has no source text")]
    MissingSource,

    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// New section content that does not parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
}
