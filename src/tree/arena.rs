//! The editable tree: a slotmap arena of nodes sharing one source buffer.
//!
//! Parent/child relationships live in secondary maps, so removal is
//! O(subtree size) and lookup is O(1). Ranges that a node does not store are
//! derived from its neighbours on read; [`CssTree::materialize`] stores them.

use std::collections::VecDeque;
use std::fmt;

use slotmap::{SecondaryMap, SlotMap};

use super::node::{NodeData, NodeId, NodeKind, RangeName};
use super::view::NodeRef;
use crate::source::{Changeset, Range, Source};

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[NodeId] = &[];

/// An editable stylesheet, or a detached fragment when its root is a section or property.
#[derive(Debug, Clone)]
pub struct CssTree {
    pub(crate) nodes: SlotMap<NodeId, NodeData>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
    root: NodeId,
    pub(crate) source: Source,
    /// Set while some node lacks a stored range.
    sparse: bool,
}

impl CssTree {
    /// Create a tree holding a single node.
    pub(crate) fn with_root(source: Source, data: NodeData) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(data);
        let mut children = SecondaryMap::new();
        children.insert(root, Vec::new());
        let sparse = needs_ranges(&nodes[root]);
        Self {
            nodes,
            children,
            parent: SecondaryMap::new(),
            root,
            source,
            sparse,
        }
    }

    /// An empty stylesheet.
    pub fn empty() -> Self {
        Self::with_root(Source::default(), NodeData::root())
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> NodeRef<'_> {
        NodeRef::new(self, self.root)
    }

    /// Read access to a node, `None` if it was removed.
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.nodes.contains_key(id).then(|| NodeRef::new(self, id))
    }

    /// Whether this tree is a detached section or property rather than a stylesheet.
    pub fn is_fragment(&self) -> bool {
        self.nodes[self.root].kind != NodeKind::Root
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The current text of the whole buffer.
    pub fn text(&self) -> &str {
        self.source.text()
    }

    /// Number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(id).map(|d| d.kind)
    }

    // ── Changesets ───────────────────────────────────────────────────

    /// Start recording buffer edits.
    pub fn start_recording(&mut self) {
        self.source.start_recording();
    }

    pub fn changeset(&self) -> Option<&Changeset> {
        self.source.changeset()
    }

    pub fn take_changeset(&mut self) -> Option<Changeset> {
        self.source.take_changeset()
    }

    // ── Structure ────────────────────────────────────────────────────

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// Children of a node. Empty if the node has none or does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Position of `id` among its parent's children.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Ancestors from the immediate parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    /// Pre-order depth-first traversal starting from `start`.
    pub fn walk_depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }

    /// Append a new node to `parent`'s children.
    pub(crate) fn push_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        debug_assert!(self.nodes.contains_key(parent), "parent node does not exist");
        self.sparse |= needs_ranges(&data);
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        self.parent.insert(id, parent);
        if let Some(siblings) = self.children.get_mut(parent) {
            siblings.push(id);
        }
        id
    }

    /// Attach a parentless node at `index` of `parent`'s children.
    pub(crate) fn attach(&mut self, parent: NodeId, index: usize, id: NodeId) {
        self.parent.insert(id, parent);
        if let Some(siblings) = self.children.get_mut(parent) {
            siblings.insert(index.min(siblings.len()), id);
        }
    }

    /// Insert a parentless node.
    pub(crate) fn insert_detached(&mut self, data: NodeData) -> NodeId {
        self.sparse |= needs_ranges(&data);
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        id
    }

    pub(crate) fn sort_children_by<K: Ord>(&mut self, id: NodeId, mut key: impl FnMut(&NodeData) -> K) {
        let nodes = &self.nodes;
        if let Some(kids) = self.children.get_mut(id) {
            kids.sort_by_key(|&c| key(&nodes[c]));
        }
    }

    /// Detach a node and drop it together with all its descendants.
    pub(crate) fn remove_subtree(&mut self, id: NodeId) {
        if !self.nodes.contains_key(id) {
            return;
        }
        if let Some(parent_id) = self.parent.remove(id) {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|&child| child != id);
            }
        }

        let mut to_remove = VecDeque::new();
        to_remove.push_back(id);
        while let Some(current) = to_remove.pop_front() {
            if let Some(kids) = self.children.remove(current) {
                to_remove.extend(kids);
            }
            self.parent.remove(current);
            self.nodes.remove(current);
        }
    }

    /// Drop every descendant of `id`, keeping the node itself.
    pub(crate) fn clear_children(&mut self, id: NodeId) {
        let kids = self.children(id).to_vec();
        for kid in kids {
            self.remove_subtree(kid);
        }
    }

    // ── Ranges ───────────────────────────────────────────────────────

    /// The current range `name` of node `id`, stored or derived.
    pub fn range(&self, id: NodeId, name: RangeName) -> Range {
        let Some(data) = self.nodes.get(id) else {
            return Range::default();
        };
        if data.kind == NodeKind::Root {
            let len = self.source.len();
            return match name {
                RangeName::Before | RangeName::Name | RangeName::Between => Range::empty(0),
                RangeName::After => Range::empty(len),
                RangeName::Value | RangeName::Full | RangeName::Own => Range::new(0, len),
            };
        }

        let stored = &data.ranges;
        match name {
            RangeName::Full => {
                let before = self.range(id, RangeName::Before);
                let after = self.range(id, RangeName::After);
                Range::new(before.start, after.end.max(before.start))
            }
            RangeName::Own => {
                let after = self.range(id, RangeName::After);
                Range::new(stored.name.start, after.end.max(stored.name.start))
            }
            RangeName::Name => stored.name,
            RangeName::Value => self.derive_value(id),
            RangeName::Before => stored.before.unwrap_or_else(|| self.derive_before(id)),
            RangeName::Between => stored.between.unwrap_or_else(|| {
                let value = self.range(id, RangeName::Value);
                Range::new(stored.name.end, value.start.max(stored.name.end))
            }),
            RangeName::After => stored.after.unwrap_or_else(|| self.derive_after(id)),
        }
    }

    /// Text of range `name` of node `id`.
    pub fn range_text(&self, id: NodeId, name: RangeName) -> &str {
        self.source.substring(self.range(id, name))
    }

    /// Sections with children span from the first child's start to the last child's end.
    fn derive_value(&self, id: NodeId) -> Range {
        let data = &self.nodes[id];
        let kids = self.children(id);
        if let (NodeKind::Section, Some(&first), Some(&last)) = (data.kind, kids.first(), kids.last()) {
            let start = self.range(first, RangeName::Full).start;
            let end = self.range(last, RangeName::Full).end;
            return Range::new(start, end.max(start));
        }
        data.ranges
            .value
            .unwrap_or_else(|| Range::empty(self.range(id, RangeName::Before).end))
    }

    /// Start of the region a container's children partition, read from stored ranges only.
    fn anchor_start(&self, container: NodeId) -> usize {
        let data = &self.nodes[container];
        if data.kind == NodeKind::Root {
            return 0;
        }
        data.ranges
            .value
            .map(|v| v.start)
            .or(data.ranges.between.map(|b| b.end))
            .unwrap_or(data.ranges.name.end)
    }

    /// End of the region a container's children partition, read from stored ranges only.
    fn anchor_end(&self, container: NodeId) -> Option<usize> {
        let data = &self.nodes[container];
        if data.kind == NodeKind::Root {
            return Some(self.source.len());
        }
        data.ranges.value.map(|v| v.end)
    }

    fn derive_before(&self, id: NodeId) -> Range {
        let name_start = self.nodes[id].ranges.name.start;
        let start = match self.parent(id) {
            None => 0,
            Some(parent) => match self.index_of(id) {
                Some(0) | None => self.anchor_start(parent),
                Some(ix) => self.range(self.children(parent)[ix - 1], RangeName::Full).end,
            },
        };
        Range::new(start.min(name_start), name_start)
    }

    fn derive_after(&self, id: NodeId) -> Range {
        let from = self.range(id, RangeName::Value).end;
        let next = self
            .parent(id)
            .zip(self.index_of(id))
            .and_then(|(p, ix)| self.children(p).get(ix + 1).copied());
        let to = match next {
            Some(next) => {
                let ranges = &self.nodes[next].ranges;
                ranges.before.map_or(ranges.name.start, |b| b.start)
            }
            None => self
                .parent(id)
                .and_then(|p| self.anchor_end(p))
                .unwrap_or(from),
        };
        let to = to.max(from);
        let end = self
            .text()
            .get(from..to)
            .and_then(|gap| gap.find(['\n', '\r']))
            .map_or(to, |p| from + p);
        Range::new(from, end)
    }

    /// Store every derivable range that is still missing.
    ///
    /// Stored ranges are never changed. Once every range is stored this returns
    /// without walking the tree.
    pub fn materialize(&mut self) {
        if !self.sparse {
            return;
        }
        for id in self.walk_depth_first(self.root) {
            let data = &self.nodes[id];
            if data.kind == NodeKind::Root || data.ranges.is_complete() {
                continue;
            }
            let mut ranges = data.ranges;
            for name in [
                RangeName::Value,
                RangeName::Before,
                RangeName::Between,
                RangeName::After,
            ] {
                if ranges.get(name).is_none() {
                    ranges.set(name, self.range(id, name));
                }
            }
            self.nodes[id].ranges = ranges;
        }
        self.sparse = false;
    }

    /// Whether some node still derives a range on read.
    pub fn is_sparse(&self) -> bool {
        self.sparse
    }
}

fn needs_ranges(data: &NodeData) -> bool {
    data.kind != NodeKind::Root && !data.ranges.is_complete()
}

impl Default for CssTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for CssTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.range_text(self.root, RangeName::Full))
    }
}
