//! Text edits that keep every node range consistent with the buffer.
//!
//! Every edit writes to the shared [`Source`] first and then shifts the
//! ranges that follow the edited span: later ranges of the node itself,
//! its descendants when the edit precedes the value, every later sibling
//! subtree of the node and of each ancestor, and the value end of each
//! enclosing section.

use super::arena::CssTree;
use super::error::TreeError;
use super::node::{NodeData, NodeId, NodeKind, Position, RangeName, RangeSet, Style};
use crate::config::ParseOptions;
use crate::css::builder::{build, populate_container};
use crate::source::{Range, Source};

impl CssTree {
    /// Build a detached node from its five parts: before, name, between, value, after.
    ///
    /// The fragment can then be placed with [`CssTree::insert`].
    pub fn fragment(kind: NodeKind, parts: [&str; 5]) -> Result<CssTree, TreeError> {
        if kind == NodeKind::Root {
            return Err(TreeError::InvalidFragment);
        }
        let mut ranges = RangeSet::default();
        let mut offset = 0;
        for (name, part) in RangeName::STORED.into_iter().zip(parts) {
            ranges.set(name, Range::with_len(offset, part.len()));
            offset += part.len();
        }
        Ok(CssTree::with_root(
            Source::new(parts.concat()),
            NodeData::new(kind, ranges),
        ))
    }

    /// Replace the text of a stored range and return the range's new extent.
    ///
    /// Replacing a section's value replaces its children with the sections and
    /// properties parsed from the new text. Text that does not parse is
    /// rejected before the buffer changes.
    pub fn replace_named(&mut self, id: NodeId, name: RangeName, text: &str) -> Result<Range, TreeError> {
        let kind = self.kind(id).ok_or(TreeError::NodeNotFound)?;
        if kind == NodeKind::Root {
            return Err(TreeError::RootRange(name));
        }
        let Some(order) = name.order() else {
            return Err(TreeError::DerivedRange(name));
        };
        let options = ParseOptions::default();
        let reparse = kind == NodeKind::Section && name == RangeName::Value;
        if reparse {
            build(text, &options)?;
        }
        self.materialize();

        let old = self.range(id, name);
        self.source.update(old, text)?;
        let delta = text.len() as isize - old.len() as isize;
        let new = Range::with_len(old.start, text.len());

        let data = &mut self.nodes[id];
        data.ranges.set(name, new);
        for later in &RangeName::STORED[order + 1..] {
            data.ranges.shift(*later, delta);
        }
        if name == RangeName::Name {
            data.invalidate_selector();
        }

        match name {
            RangeName::Value => {
                self.clear_children(id);
                if reparse {
                    populate_container(self, id, options.iteration_limit)?;
                }
            }
            RangeName::After => {}
            _ => {
                for node in self.walk_depth_first(id).into_iter().skip(1) {
                    self.nodes[node].ranges.shift_all(delta);
                }
            }
        }
        self.shift_following(id, delta);

        log::trace!("replaced {name} of {kind} {old} -> {new} ({delta:+})");
        Ok(new)
    }

    /// Replace a range given by name (`"name"`, `"value"`, `"before"`, ...).
    pub fn replace_range(&mut self, id: NodeId, name: &str, text: &str) -> Result<Range, TreeError> {
        self.replace_named(id, name.parse()?, text)
    }

    pub fn set_name(&mut self, id: NodeId, text: &str) -> Result<Range, TreeError> {
        self.replace_named(id, RangeName::Name, text)
    }

    pub fn set_value(&mut self, id: NodeId, text: &str) -> Result<Range, TreeError> {
        self.replace_named(id, RangeName::Value, text)
    }

    pub fn set_style(&mut self, id: NodeId, style: Style, text: &str) -> Result<Range, TreeError> {
        self.replace_named(id, style.range_name(), text)
    }

    /// Insert a detached node (see [`CssTree::fragment`] and [`CssTree::clone_node`])
    /// into `parent` and return its new id.
    ///
    /// The fragment's full text is placed in front of the child currently at
    /// the target index, or at the end of the parent's value.
    pub fn insert(&mut self, parent: NodeId, fragment: CssTree, position: Position) -> Result<NodeId, TreeError> {
        let kind = self.kind(parent).ok_or(TreeError::NodeNotFound)?;
        if !kind.is_container() {
            return Err(TreeError::NotAContainer(kind));
        }
        if !fragment.is_fragment() {
            return Err(TreeError::InvalidFragment);
        }
        let siblings = self.children(parent);
        let index = position.resolve(siblings.len())?;
        self.materialize();

        let offset = match self.children(parent).get(index) {
            Some(&next) => self.range(next, RangeName::Full).start,
            None => self.range(parent, RangeName::Value).end,
        };
        let full = fragment.range(fragment.root(), RangeName::Full);
        let text = fragment.range_text(fragment.root(), RangeName::Full);
        self.source.update(Range::empty(offset), text)?;

        let delta = offset as isize - full.start as isize;
        let id = self.graft(&fragment, fragment.root(), delta);
        if self.children(parent).is_empty() {
            // Comments and blank lines of a container without children lead the new child.
            let start = self.range(parent, RangeName::Value).start;
            if let Some(before) = self.nodes[id].ranges.before.as_mut() {
                before.start = start.min(before.start);
            }
        }
        self.attach(parent, index, id);
        self.shift_following(id, text.len() as isize);

        log::trace!("inserted {} at {offset} ({} bytes)", self.nodes[id].kind, text.len());
        Ok(id)
    }

    /// Remove a node and its text. Unknown and detached nodes are ignored.
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        if !self.contains(id) || self.parent(id).is_none() {
            return Ok(());
        }
        self.materialize();

        let full = self.range(id, RangeName::Full);
        self.source.update(full, "")?;
        self.shift_following(id, -(full.len() as isize));
        self.remove_subtree(id);

        log::trace!("removed {full}");
        Ok(())
    }

    /// A detached deep copy of a node with its own buffer.
    ///
    /// Cloning the root copies the whole tree.
    pub fn clone_node(&self, id: NodeId) -> Result<CssTree, TreeError> {
        let kind = self.kind(id).ok_or(TreeError::NodeNotFound)?;
        if kind == NodeKind::Root {
            return Ok(self.clone());
        }
        let full = self.range(id, RangeName::Full);
        let delta = -(full.start as isize);
        let mut copy = CssTree::with_root(
            Source::new(self.range_text(id, RangeName::Full)),
            NodeData::new(kind, self.resolved_ranges(id, delta)),
        );
        let root = copy.root();
        for (index, &child) in self.children(id).iter().enumerate() {
            let grafted = copy.graft(self, child, delta);
            copy.attach(root, index, grafted);
        }
        Ok(copy)
    }

    /// Every stored range of `id` in `from`, resolved and moved by `delta`.
    fn resolved_ranges(&self, id: NodeId, delta: isize) -> RangeSet {
        let mut ranges = RangeSet::default();
        for name in RangeName::STORED {
            ranges.set(name, self.range(id, name).shifted(delta));
        }
        ranges
    }

    /// Copy the subtree of `id` from `from` into this arena, detached.
    fn graft(&mut self, from: &CssTree, id: NodeId, delta: isize) -> NodeId {
        let data = NodeData::new(from.nodes[id].kind, from.resolved_ranges(id, delta));
        let copy = self.insert_detached(data);
        for (index, &child) in from.children(id).iter().enumerate() {
            let grafted = self.graft(from, child, delta);
            self.attach(copy, index, grafted);
        }
        copy
    }

    /// Propagate a length change at the end of `id` to everything after it.
    pub(crate) fn shift_following(&mut self, id: NodeId, delta: isize) {
        if delta == 0 {
            return;
        }
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let siblings = self.children(parent);
            let start = siblings.iter().position(|&c| c == current).map_or(siblings.len(), |i| i + 1);
            let following: Vec<NodeId> = siblings[start..].to_vec();
            for sibling in following {
                for node in self.walk_depth_first(sibling) {
                    self.nodes[node].ranges.shift_all(delta);
                }
            }

            let ranges = &mut self.nodes[parent].ranges;
            if let Some(value) = ranges.value.as_mut() {
                value.grow(delta);
            }
            ranges.shift(RangeName::After, delta);
            current = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use pretty_assertions::assert_eq;

    fn first_section(tree: &CssTree) -> NodeId {
        tree.root_node().child(0).unwrap().id()
    }

    /// Every node's full range must be covered by its parent's full range.
    fn assert_nested(tree: &CssTree) {
        for id in tree.walk_depth_first(tree.root()) {
            if let Some(parent) = tree.parent(id) {
                let outer = tree.range(parent, RangeName::Full);
                let inner = tree.range(id, RangeName::Full);
                assert!(outer.contains(inner), "{inner} escapes {outer}");
            }
        }
    }

    // ── Replacing ranges ─────────────────────────────────────────────

    #[test]
    fn rename_sections() {
        let mut tree = parse("a {b:c}\nd {e:f}").unwrap();
        let root = tree.root_node();
        let a = root.child(0).unwrap().id();
        let d = root.child(1).unwrap().id();
        tree.set_name(a, "foo").unwrap();
        tree.set_name(d, "bar").unwrap();
        assert_eq!(tree.to_string(), "foo {b:c}\nbar {e:f}");
        let bar = tree.node(d).unwrap();
        assert_eq!(bar.name(), "bar");
        assert_eq!(bar.child(0).unwrap().value(), "f");
        assert_nested(&tree);
    }

    #[test]
    fn replace_property_name_and_value() {
        let mut tree = parse("a {b:c;d:e}").unwrap();
        let b = tree.root_node().child(0).unwrap().child(0).unwrap().id();
        tree.set_name(b, "foo").unwrap();
        tree.set_value(b, "bar").unwrap();
        assert_eq!(tree.to_string(), "a {foo:bar;d:e}");
        let d = tree.root_node().child(0).unwrap().child(1).unwrap();
        assert_eq!(d.name(), "d");
        assert_eq!(d.value(), "e");
    }

    #[test]
    fn shrinking_edits_shift_back() {
        let mut tree = parse("long-name {color: red}\nb {c: d}").unwrap();
        let a = first_section(&tree);
        tree.set_name(a, "a").unwrap();
        assert_eq!(tree.to_string(), "a {color: red}\nb {c: d}");
        let b = tree.root_node().child(1).unwrap();
        assert_eq!(b.name(), "b");
        assert_eq!(b.property("c"), Some("d"));
    }

    #[test]
    fn replacing_section_value_reparses_children() {
        let mut tree = parse("a {b:c;d:e}").unwrap();
        let a = first_section(&tree);
        tree.set_value(a, "x:y; e {f: g}").unwrap();
        assert_eq!(tree.to_string(), "a {x:y; e {f: g}}");
        let section = tree.node(a).unwrap();
        assert_eq!(section.child_count(), 2);
        assert_eq!(section.property("x"), Some("y"));
        assert_eq!(section.section("e", None).unwrap().property("f"), Some("g"));
        assert_eq!(section.value(), "x:y; e {f: g}");
        assert_nested(&tree);
    }

    #[test]
    fn inserting_after_a_value_replacement() {
        let mut tree = parse("a {b:c}
h {}").unwrap();
        let a = first_section(&tree);
        tree.set_value(a, "x:y;").unwrap();
        let fragment = CssTree::fragment(NodeKind::Property, ["", "foo", ":", "bar", ";"]).unwrap();
        tree.insert(a, fragment, Position::Last).unwrap();
        assert_eq!(tree.to_string(), "a {x:y;foo:bar;}
h {}");
        let section = tree.node(a).unwrap();
        let joined: String = section.children().map(|c| c.full_text()).collect();
        assert_eq!(joined, section.value());
        assert_eq!(tree.root_node().child(1).unwrap().name(), "h");
    }

    #[test]
    fn unparsable_section_value_is_rejected() {
        let mut tree = parse("a {b:c}").unwrap();
        let a = first_section(&tree);
        assert!(matches!(tree.set_value(a, "x { y"), Err(TreeError::Parse(_))));
        assert_eq!(tree.to_string(), "a {b:c}");
        assert_eq!(tree.node(a).unwrap().property("b"), Some("c"));
    }

    #[test]
    fn first_child_takes_over_leading_comments() {
        let mut tree = parse("a {\n\t/* empty */\n}").unwrap();
        let a = first_section(&tree);
        let fragment = CssTree::fragment(NodeKind::Property, ["\n\t", "b", ": ", "c", ";"]).unwrap();
        let id = tree.insert(a, fragment, Position::Last).unwrap();
        assert_eq!(tree.to_string(), "a {\n\t/* empty */\n\tb: c;\n}");
        assert_eq!(tree.node(id).unwrap().before(), "\n\t/* empty */\n\t");
        assert_eq!(tree.node(a).unwrap().value(), "\n\t/* empty */\n\tb: c;");
    }

    #[test]
    fn styles_are_writable() {
        let mut tree = parse("a {b:c}").unwrap();
        let b = tree.root_node().child(0).unwrap().child(0).unwrap().id();
        tree.set_style(b, Style::Between, ": ").unwrap();
        tree.set_style(b, Style::Before, " ").unwrap();
        tree.replace_range(b, "after", "; ").unwrap();
        assert_eq!(tree.to_string(), "a { b: c; }");
    }

    #[test]
    fn root_and_derived_ranges_are_rejected() {
        let mut tree = parse("a {b:c}").unwrap();
        let root = tree.root();
        assert_eq!(
            tree.set_value(root, "x"),
            Err(TreeError::RootRange(RangeName::Value))
        );
        let a = first_section(&tree);
        assert_eq!(
            tree.replace_named(a, RangeName::Full, "x"),
            Err(TreeError::DerivedRange(RangeName::Full))
        );
        assert_eq!(
            tree.replace_range(a, "margin", "x"),
            Err(TreeError::UnknownRange("margin".into()))
        );
        assert_eq!(tree.to_string(), "a {b:c}");
    }

    // ── Insert, remove, clone ────────────────────────────────────────

    #[test]
    fn remove_property() {
        let mut tree = parse("a {b:c;d:e;f:g} h{}").unwrap();
        let d = tree.root_node().child(0).unwrap().child(1).unwrap().id();
        tree.remove(d).unwrap();
        assert_eq!(tree.to_string(), "a {b:c;f:g} h{}");
        assert!(!tree.contains(d));
        let h = tree.root_node().child(1).unwrap();
        assert_eq!(h.name(), "h");
        assert_nested(&tree);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut tree = parse("a {b:c}\nd {}").unwrap();
        let a = first_section(&tree);
        tree.remove(a).unwrap();
        let once = tree.to_string();
        tree.remove(a).unwrap();
        assert_eq!(tree.to_string(), once);
        tree.remove(tree.root()).unwrap();
        assert_eq!(tree.to_string(), once);
    }

    #[test]
    fn insert_fragment_first() {
        let mut tree = parse("a {b:c;}").unwrap();
        let a = first_section(&tree);
        let fragment = CssTree::fragment(NodeKind::Property, ["", "bam", ":", "baz", ";"]).unwrap();
        let id = tree.insert(a, fragment, Position::First).unwrap();
        assert_eq!(tree.to_string(), "a {bam:baz;b:c;}");
        assert_eq!(tree.node(id).unwrap().index(), Some(0));
        assert_eq!(tree.node(a).unwrap().property("b"), Some("c"));
    }

    #[test]
    fn insert_into_empty_section() {
        let mut tree = parse("a {}\nb {}").unwrap();
        let a = first_section(&tree);
        let fragment = CssTree::fragment(NodeKind::Property, ["", "x", ":", "y", ";"]).unwrap();
        tree.insert(a, fragment, Position::Last).unwrap();
        assert_eq!(tree.to_string(), "a {x:y;}\nb {}");
        assert_eq!(tree.root_node().child(1).unwrap().name(), "b");
        assert_nested(&tree);
    }

    #[test]
    fn insert_rejects_bad_targets() {
        let mut tree = parse("a {b:c}").unwrap();
        let b = tree.root_node().child(0).unwrap().child(0).unwrap().id();
        let fragment = CssTree::fragment(NodeKind::Property, ["", "x", ":", "y", ";"]).unwrap();
        assert_eq!(
            tree.insert(b, fragment.clone(), Position::Last),
            Err(TreeError::NotAContainer(NodeKind::Property))
        );
        let root = tree.root();
        assert_eq!(
            tree.insert(root, CssTree::empty(), Position::Last),
            Err(TreeError::InvalidFragment)
        );
        assert_eq!(
            tree.insert(root, fragment, Position::At(5)),
            Err(TreeError::IndexOutOfRange { index: 5, len: 1 })
        );
    }

    #[test]
    fn clone_and_reinsert() {
        let mut tree = parse("a {b:c}\n").unwrap();
        let a = first_section(&tree);
        let copy = tree.clone_node(a).unwrap();
        assert!(copy.is_fragment());
        assert_eq!(copy.to_string(), tree.node(a).unwrap().full_text());
        assert_eq!(copy.root_node().property("b"), Some("c"));

        let root = tree.root();
        tree.insert(root, copy, Position::Last).unwrap();
        assert_eq!(tree.root_node().child_count(), 2);
        assert_eq!(tree.root_node().child(1).unwrap().property("b"), Some("c"));
        assert_nested(&tree);
    }

    #[test]
    fn recorded_edits_replay() {
        let original = "a {b:c}\nd {e:f}";
        let mut tree = parse(original).unwrap();
        tree.start_recording();
        let a = first_section(&tree);
        tree.set_name(a, "foo").unwrap();
        let e = tree.root_node().child(1).unwrap().child(0).unwrap().id();
        tree.remove(e).unwrap();
        let changes = tree.changeset().unwrap();
        assert_eq!(changes.replay(original).unwrap(), tree.to_string());
    }

    #[test]
    fn fragment_parts_become_ranges() {
        let tree = CssTree::fragment(NodeKind::Section, ["", "a", " {", " ", "\n}\n"]).unwrap();
        let root = tree.root_node();
        assert_eq!(root.name(), "a");
        assert_eq!(root.between(), " {");
        assert_eq!(root.after(), "\n}\n");
        assert_eq!(tree.to_string(), "a { \n}\n");
        assert!(CssTree::fragment(NodeKind::Root, [""; 5]).is_err());
    }
}
