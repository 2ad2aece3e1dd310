//! Serialized form of a tree: `{t, r, c, src}` objects, with `src` on the root only.
//!
//! Restoring keeps every stored range exactly as serialized. Nothing is re-derived.

use serde::{Deserialize, Serialize, Serializer};

use super::arena::CssTree;
use super::error::TreeError;
use super::node::{NodeData, NodeId, NodeKind, RangeSet};
use crate::source::{BufferError, Range, Source};

/// Stored ranges of a serialized node. Absent ranges are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedRanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub between: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Range>,
}

impl SerializedRanges {
    pub fn is_empty(&self) -> bool {
        self.before.is_none()
            && self.name.is_none()
            && self.between.is_none()
            && self.value.is_none()
            && self.after.is_none()
    }

    fn iter(&self) -> impl Iterator<Item = Range> + '_ {
        [self.before, self.name, self.between, self.value, self.after]
            .into_iter()
            .flatten()
    }
}

impl From<&RangeSet> for SerializedRanges {
    fn from(ranges: &RangeSet) -> Self {
        Self {
            before: ranges.before,
            name: Some(ranges.name),
            between: ranges.between,
            value: ranges.value,
            after: ranges.after,
        }
    }
}

/// One serialized node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub t: NodeKind,
    #[serde(default, skip_serializing_if = "SerializedRanges::is_empty")]
    pub r: SerializedRanges,
    #[serde(default)]
    pub c: Vec<SerializedNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}

impl CssTree {
    pub fn to_serialized(&self) -> SerializedNode {
        let mut node = self.serialize_node(self.root());
        node.src = Some(self.text().to_owned());
        node
    }

    fn serialize_node(&self, id: NodeId) -> SerializedNode {
        let data = &self.nodes[id];
        SerializedNode {
            t: data.kind,
            r: match data.kind {
                NodeKind::Root => SerializedRanges::default(),
                _ => SerializedRanges::from(&data.ranges),
            },
            c: self
                .children(id)
                .iter()
                .map(|&c| self.serialize_node(c))
                .collect(),
            src: None,
        }
    }

    /// Rebuild a tree from its serialized form.
    pub fn from_serialized(node: &SerializedNode) -> Result<CssTree, TreeError> {
        if node.t != NodeKind::Root {
            return Err(TreeError::NotARoot(node.t));
        }
        let src = node.src.as_deref().ok_or(TreeError::MissingSource)?;
        let mut tree = CssTree::with_root(Source::new(src), NodeData::root());
        let root = tree.root();
        for child in &node.c {
            tree.restore(root, child)?;
        }
        log::debug!("restored {} nodes from {} bytes", tree.len(), src.len());
        Ok(tree)
    }

    fn restore(&mut self, parent: NodeId, node: &SerializedNode) -> Result<(), TreeError> {
        if node.t == NodeKind::Root {
            return Err(TreeError::InvalidFragment);
        }
        let name = node.r.name.ok_or(TreeError::MissingName { kind: node.t })?;
        for range in node.r.iter() {
            self.check_range(range)?;
        }

        let ranges = RangeSet {
            before: node.r.before,
            name,
            between: node.r.between,
            value: node.r.value,
            after: node.r.after,
        };
        let id = self.push_child(parent, NodeData::new(node.t, ranges));
        for child in &node.c {
            self.restore(id, child)?;
        }
        Ok(())
    }

    fn check_range(&self, range: Range) -> Result<(), BufferError> {
        let text = self.text();
        if range.end > text.len() {
            return Err(BufferError::OutOfBounds {
                range,
                len: text.len(),
            });
        }
        if !text.is_char_boundary(range.start) || !text.is_char_boundary(range.end) {
            return Err(BufferError::NotCharBoundary { range });
        }
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json_str(json: &str) -> Result<CssTree, crate::Error> {
        let node: SerializedNode = serde_json::from_str(json)?;
        Ok(CssTree::from_serialized(&node)?)
    }
}

impl Serialize for CssTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_serialized().serialize(serializer)
    }
}
