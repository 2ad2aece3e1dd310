//! Crate-level error type.

use crate::css::ParseError;
use crate::tree::TreeError;

/// Any error returned by the crate's entry points.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("invalid serialized tree: {0}")]
    Json(#[from] serde_json::Error),
}
