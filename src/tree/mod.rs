//! Editable tree: slotmap-backed nodes whose ranges index one shared buffer.

pub mod arena;
pub mod edit;
pub mod error;
pub mod json;
pub mod node;
pub mod outline;
pub mod section;
pub mod view;

pub use arena::CssTree;
pub use error::TreeError;
pub use json::{SerializedNode, SerializedRanges};
pub use node::{NodeData, NodeId, NodeKind, Position, RangeName, RangeSet, Style};
pub use view::NodeRef;
