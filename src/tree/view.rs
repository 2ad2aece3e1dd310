//! Read-only node handles.

use std::fmt;

use super::arena::CssTree;
use super::error::TreeError;
use super::node::{NodeId, NodeKind, RangeName, Style};
use crate::css::selector::SelectorDeclaration;
use crate::source::Range;

/// A borrowed view of one node.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a CssTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(tree: &'a CssTree, id: NodeId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a CssTree {
        self.tree
    }

    pub fn kind(&self) -> NodeKind {
        self.tree.nodes[self.id].kind
    }

    pub fn is_section(&self) -> bool {
        self.kind() == NodeKind::Section
    }

    pub fn is_property(&self) -> bool {
        self.kind() == NodeKind::Property
    }

    // ── Structure ────────────────────────────────────────────────────

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.tree.parent(self.id).map(|p| NodeRef::new(self.tree, p))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.children(self.id).iter().map(move |&c| NodeRef::new(tree, c))
    }

    pub fn child_count(&self) -> usize {
        self.tree.children(self.id).len()
    }

    pub fn child(&self, index: usize) -> Option<NodeRef<'a>> {
        self.tree
            .children(self.id)
            .get(index)
            .map(|&c| NodeRef::new(self.tree, c))
    }

    /// First child named `name`.
    pub fn get(&self, name: &str) -> Option<NodeRef<'a>> {
        self.children().find(|c| c.name() == name)
    }

    /// Position among the parent's children.
    pub fn index(&self) -> Option<usize> {
        self.tree.index_of(self.id)
    }

    /// Every descendant in pre-order, this node excluded.
    pub fn all(&self) -> Vec<NodeRef<'a>> {
        self.tree
            .walk_depth_first(self.id)
            .into_iter()
            .skip(1)
            .map(|id| NodeRef::new(self.tree, id))
            .collect()
    }

    pub fn properties(&self) -> Vec<NodeRef<'a>> {
        self.children().filter(|c| c.is_property()).collect()
    }

    pub fn sections(&self) -> Vec<NodeRef<'a>> {
        self.children().filter(|c| c.is_section()).collect()
    }

    /// The last property named `name`. Later duplicates override earlier ones.
    pub fn property_node(&self, name: &str) -> Option<NodeRef<'a>> {
        self.children()
            .filter(|c| c.is_property() && c.name() == name)
            .last()
    }

    /// Value of the last property named `name`.
    pub fn property(&self, name: &str) -> Option<&'a str> {
        self.property_node(name).map(|p| p.value())
    }

    /// The `index`-th child section named `name`, or the last one when `index` is `None`.
    pub fn section(&self, name: &str, index: Option<usize>) -> Option<NodeRef<'a>> {
        let mut matches = self
            .children()
            .filter(|c| c.is_section() && c.name() == name);
        match index {
            Some(i) => matches.nth(i),
            None => matches.last(),
        }
    }

    // ── Ranges and text ──────────────────────────────────────────────

    pub fn range(&self, name: RangeName) -> Range {
        self.tree.range(self.id, name)
    }

    /// Look a range up by its string name (`"before"`, `"self"`, ...).
    pub fn range_by_name(&self, name: &str) -> Result<Range, TreeError> {
        Ok(self.range(name.parse()?))
    }

    pub fn text(&self, name: RangeName) -> &'a str {
        self.tree.range_text(self.id, name)
    }

    pub fn name(&self) -> &'a str {
        self.text(RangeName::Name)
    }

    pub fn value(&self) -> &'a str {
        self.text(RangeName::Value)
    }

    pub fn before(&self) -> &'a str {
        self.text(RangeName::Before)
    }

    pub fn between(&self) -> &'a str {
        self.text(RangeName::Between)
    }

    pub fn after(&self) -> &'a str {
        self.text(RangeName::After)
    }

    /// The node's complete text, formatting included.
    pub fn full_text(&self) -> &'a str {
        self.text(RangeName::Full)
    }

    /// A formatting range by name: `"before"`, `"between"` or `"after"`.
    pub fn style(&self, name: &str) -> Result<&'a str, TreeError> {
        let style: Style = name.parse()?;
        Ok(self.text(style.range_name()))
    }

    /// The parsed selector of a section.
    pub fn selector(&self) -> Option<&'a SelectorDeclaration> {
        let data = &self.tree.nodes[self.id];
        if data.kind != NodeKind::Section {
            return None;
        }
        Some(
            data.selector
                .get_or_init(|| SelectorDeclaration::new(self.name())),
        )
    }
}

impl fmt::Display for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_text())
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("value", &self.value())
            .finish()
    }
}
