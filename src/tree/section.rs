//! High-level section editing: properties and child sections that copy the
//! formatting of their neighbours.
//!
//! A new node is cloned from a "donor" so that indentation, separators and
//! terminators look like the surrounding code. When no donor exists a
//! built-in template is used instead.

use super::arena::CssTree;
use crate::css::scanner::strip_comments;
use super::error::TreeError;
use super::node::{NodeId, NodeKind, Position, RangeName};
use super::view::NodeRef;

const PROPERTY_SEPARATOR: &str = ": ";
const PROPERTY_TEMPLATE: [&str; 5] = ["\n\t", "a", PROPERTY_SEPARATOR, "b", ";"];
const AT_PROPERTY_TEMPLATE: [&str; 5] = ["\n", "@import", " ", "url()", ";"];
const SECTION_TEMPLATE: [&str; 5] = ["", "a", " {", " ", "\n}\n"];

fn is_at_property(name: &str) -> bool {
    name == "@charset" || name == "@import"
}

fn starts_with(name: &str, dash: bool) -> bool {
    name.chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || (dash && c == '-'))
}

/// How well a property's formatting can be copied: 0 to 2.
fn candidate_score(node: &NodeRef<'_>) -> u8 {
    if node.value().is_empty() || !starts_with(node.name(), true) {
        return 0;
    }
    u8::from(!node.between().is_empty()) + u8::from(!node.after().is_empty())
}

fn leading_space(text: &str) -> &str {
    &text[..text.len() - text.trim_start().len()]
}

fn trailing_space(text: &str) -> &str {
    &text[text.trim_end().len()..]
}

fn with_leading_space(text: &str, space: &str) -> String {
    format!("{space}{}", text.trim_start())
}

fn with_trailing_space(text: &str, space: &str) -> String {
    format!("{}{space}", text.trim_end())
}

/// The part of a donor's `after` worth copying. A property keeps its own line;
/// a section keeps the line holding its `}` and the line break ending it.
fn donor_after(kind: NodeKind, after: &str) -> &str {
    if kind != NodeKind::Section {
        return after.find(['\n', '\r']).map_or(after, |p| &after[..p]);
    }
    let masked = strip_comments(after, Some(' ')).unwrap_or_else(|_| after.to_owned());
    let Some(brace) = masked.find('}') else {
        return after;
    };
    let mut from = after[..brace].rfind(['\n', '\r']).unwrap_or(0);
    if after[..from].ends_with('\r') && after[from..].starts_with('\n') {
        from -= 1;
    }
    let end = match after[brace..].find(['\n', '\r']).map(|p| brace + p) {
        Some(p) if after[p..].starts_with("\r\n") => p + 2,
        Some(p) => p + 1,
        None => after.len(),
    };
    &after[from..end]
}

impl CssTree {
    /// The property whose formatting a new property of `container` should copy.
    fn property_donor(&self, container: NodeId) -> Option<NodeId> {
        let node = self.node(container)?;
        let mut local: Vec<(u8, NodeRef<'_>)> = node
            .properties()
            .into_iter()
            .map(|p| (candidate_score(&p), p))
            .filter(|(score, _)| *score > 0)
            .collect();
        local.sort_by(|a, b| b.0.cmp(&a.0));

        if let Some((score, best)) = local.first() {
            if *score > 1 {
                return Some(best.id());
            }
        }
        self.root_node()
            .all()
            .into_iter()
            .find(|n| n.is_property() && starts_with(n.name(), false) && candidate_score(n) >= 1)
            .or_else(|| local.first().map(|(_, p)| *p))
            .map(|p| p.id())
    }

    /// The section a new child section of `container` should copy.
    fn section_donor(&self, container: NodeId) -> Option<NodeId> {
        match self.kind(container)? {
            NodeKind::Section => Some(container),
            _ => self.root_node().sections().last().map(|s| s.id()),
        }
    }

    /// Put a `;` right after a property's value when its `after` has none.
    fn ensure_terminator(&mut self, id: NodeId) -> Result<(), TreeError> {
        let Some(node) = self.node(id) else {
            return Ok(());
        };
        if node.is_property() && !node.after().contains(';') {
            let after = format!(";{}", node.after());
            self.replace_named(id, RangeName::After, &after)?;
        }
        Ok(())
    }

    /// A detached copy of `donor` whose `after` holds no text from later lines.
    fn clone_donor(&self, donor: NodeId) -> Result<CssTree, TreeError> {
        let mut fragment = self.clone_node(donor)?;
        let root = fragment.root();
        let after = fragment.range_text(root, RangeName::After);
        let trimmed = donor_after(fragment.nodes[root].kind, after);
        if trimmed != after {
            let trimmed = trimmed.to_owned();
            fragment.replace_named(root, RangeName::After, &trimmed)?;
        }
        Ok(fragment)
    }

    fn container_kind(&self, id: NodeId) -> Result<NodeKind, TreeError> {
        let kind = self.kind(id).ok_or(TreeError::NodeNotFound)?;
        if !kind.is_container() {
            return Err(TreeError::NotAContainer(kind));
        }
        Ok(kind)
    }

    /// Set the value of the last property `name` of `container`, or add the
    /// property at `position` when there is none. Returns the property's id.
    pub fn set_property(
        &mut self,
        container: NodeId,
        name: &str,
        value: &str,
        position: Position,
    ) -> Result<NodeId, TreeError> {
        self.container_kind(container)?;
        let existing = self
            .node(container)
            .and_then(|n| n.property_node(name))
            .map(|p| (p.id(), p.between().is_empty()));

        let Some((id, no_separator)) = existing else {
            return self.add_property(container, name, value, position);
        };
        if no_separator {
            let separator = self
                .property_donor(container)
                .map(|donor| self.range_text(donor, RangeName::Between).to_owned())
                .filter(|between| !between.is_empty())
                .unwrap_or_else(|| PROPERTY_SEPARATOR.to_owned());
            self.replace_named(id, RangeName::Between, &separator)?;
        }
        self.replace_named(id, RangeName::Value, value)?;
        self.ensure_terminator(id)?;
        Ok(id)
    }

    /// Add a new property to `container`, formatted like its best donor.
    pub fn add_property(
        &mut self,
        container: NodeId,
        name: &str,
        value: &str,
        position: Position,
    ) -> Result<NodeId, TreeError> {
        self.container_kind(container)?;
        let index = position.resolve(self.children(container).len())?;

        let mut fragment = match self.property_donor(container) {
            _ if is_at_property(name) => CssTree::fragment(NodeKind::Property, AT_PROPERTY_TEMPLATE)?,
            Some(donor) => self.clone_donor(donor)?,
            None => CssTree::fragment(NodeKind::Property, PROPERTY_TEMPLATE)?,
        };
        let root = fragment.root();
        fragment.replace_named(root, RangeName::Value, value)?;
        fragment.replace_named(root, RangeName::Name, name)?;
        fragment.ensure_terminator(root)?;

        if index > 0 {
            let previous = self.children(container)[index - 1];
            self.ensure_terminator(previous)?;
        }
        self.insert(container, fragment, Position::At(index as isize))
    }

    /// Add an empty child section named `name` to `container`.
    ///
    /// The section is cloned from `container` itself, or for the root from its
    /// last section, and blank lines between sections are kept consistent.
    pub fn add_section(&mut self, container: NodeId, name: &str, position: Position) -> Result<NodeId, TreeError> {
        self.container_kind(container)?;
        let donor = self.section_donor(container);
        let mut fragment = match donor {
            Some(donor) => self.clone_donor(donor)?,
            None => CssTree::fragment(NodeKind::Section, SECTION_TEMPLATE)?,
        };
        let root = fragment.root();
        fragment.replace_named(root, RangeName::Value, "")?;
        fragment.replace_named(root, RangeName::Name, name)?;

        let id = self.insert(container, fragment, position)?;
        let index = self.index_of(id).unwrap_or(0);

        if index > 0 {
            let previous = self.children(container)[index - 1];
            let needs_break = self.kind(previous) == Some(NodeKind::Section)
                && self.range_text(id, RangeName::After).contains('\n')
                && !trailing_space(self.range_text(previous, RangeName::After)).contains('\n');
            if needs_break {
                let after = format!("{}\n", self.range_text(previous, RangeName::After));
                self.replace_named(previous, RangeName::After, &after)?;
            }
        } else if let Some(donor) = donor.filter(|&d| self.parent(d) == Some(container)) {
            // The new section took the first slot: it inherits the old first
            // section's outer spacing, which in turn takes the donor's.
            let Some(&old_first) = self.children(container).get(1) else {
                return Ok(id);
            };
            self.copy_spacing(old_first, id)?;
            self.copy_spacing(donor, old_first)?;
        }
        Ok(id)
    }

    /// Give `target` the leading space of `source`'s before and the trailing
    /// space of its after.
    fn copy_spacing(&mut self, source: NodeId, target: NodeId) -> Result<(), TreeError> {
        let before = with_leading_space(
            self.range_text(target, RangeName::Before),
            leading_space(self.range_text(source, RangeName::Before)),
        );
        self.replace_named(target, RangeName::Before, &before)?;
        let after = with_trailing_space(
            self.range_text(target, RangeName::After),
            trailing_space(self.range_text(source, RangeName::After)),
        );
        self.replace_named(target, RangeName::After, &after)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use pretty_assertions::assert_eq;

    fn section_id(tree: &CssTree, name: &str) -> NodeId {
        tree.root_node().get(name).unwrap().id()
    }

    /// Children of every container must spell out the container's value.
    fn assert_partitioned(tree: &CssTree) {
        let root = tree.root_node();
        let top: String = root.children().map(|c| c.full_text()).collect();
        assert_eq!(top, tree.text());
        for node in root.all().into_iter().filter(|n| n.child_count() > 0) {
            let joined: String = node.children().map(|c| c.full_text()).collect();
            assert_eq!(joined, node.value(), "children of {:?}", node.name());
        }
    }

    // ── Donors ───────────────────────────────────────────────────────

    #[test]
    fn scoring() {
        let tree = parse("a {b: c; -x:y\n@v: 1; d:}").unwrap();
        let scores: Vec<u8> = tree
            .root_node()
            .child(0)
            .unwrap()
            .children()
            .map(|p| candidate_score(&p))
            .collect();
        assert_eq!(scores, vec![2, 1, 0, 0]);
    }

    #[test]
    fn local_donor_with_full_formatting_wins() {
        let tree = parse("x {p: q;}\na {b:c\n d: e;}").unwrap();
        let a = section_id(&tree, "a");
        let donor = tree.property_donor(a).unwrap();
        assert_eq!(tree.node(donor).unwrap().name(), "d");
    }

    #[test]
    fn falls_back_to_any_property_in_the_tree() {
        let tree = parse("x {p: q;}\na {b:c}").unwrap();
        let a = section_id(&tree, "a");
        let donor = tree.property_donor(a).unwrap();
        assert_eq!(tree.node(donor).unwrap().name(), "p");
    }

    #[test]
    fn no_donor_in_empty_tree() {
        let tree = parse("a {}").unwrap();
        assert_eq!(tree.property_donor(section_id(&tree, "a")), None);
    }

    // ── Properties ───────────────────────────────────────────────────

    #[test]
    fn add_properties() {
        let mut tree = parse("a {b:c;} d{}").unwrap();
        let a = section_id(&tree, "a");
        tree.set_property(a, "b", "ddd", Position::Last).unwrap();
        tree.set_property(a, "foo", "bar", Position::Last).unwrap();
        tree.set_property(a, "bam", "baz", Position::At(0)).unwrap();

        let section = tree.node(a).unwrap();
        assert_eq!(section.child_count(), 3);
        assert_eq!(section.property("b"), Some("ddd"));
        assert_eq!(section.property("foo"), Some("bar"));
        assert_eq!(section.property("bam"), Some("baz"));
        assert_eq!(tree.to_string(), "a {bam:baz;b:ddd;foo:bar;} d{}");
    }

    #[test]
    fn add_then_remove() {
        let mut tree = parse("a {b:c;} h{}").unwrap();
        let a = section_id(&tree, "a");
        tree.set_property(a, "foo", "bar", Position::Last).unwrap();
        let b = tree.node(a).unwrap().get("b").unwrap().id();
        tree.remove(b).unwrap();
        assert_eq!(tree.node(a).unwrap().property("foo"), Some("bar"));
        assert_eq!(tree.to_string(), "a {foo:bar;} h{}");
    }

    #[test]
    fn previous_property_gets_a_terminator() {
        let mut tree = parse("a {b:c}").unwrap();
        let a = section_id(&tree, "a");
        tree.set_property(a, "foo", "bar", Position::Last).unwrap();
        assert_eq!(tree.node(a).unwrap().property("b"), Some("c"));
        assert_eq!(tree.to_string(), "a {b:c;foo:bar;}");
    }

    #[test]
    fn template_property_without_donor() {
        let mut tree = parse("a {}").unwrap();
        let a = section_id(&tree, "a");
        tree.add_property(a, "color", "red", Position::Last).unwrap();
        assert_eq!(tree.to_string(), "a {\n\tcolor: red;}");
    }

    #[test]
    fn at_property_template() {
        let mut tree = parse("a {b: c;}").unwrap();
        let root = tree.root();
        tree.add_property(root, "@import", "url(x.css)", Position::First)
            .unwrap();
        assert_eq!(tree.to_string(), "\n@import url(x.css);a {b: c;}");
    }

    #[test]
    fn missing_separator_is_added() {
        let mut tree = parse("a {b\nc: d;}").unwrap();
        let a = section_id(&tree, "a");
        tree.set_property(a, "b", "x", Position::Last).unwrap();
        assert_eq!(tree.node(a).unwrap().property("b"), Some("x"));
        assert_eq!(tree.to_string(), "a {b: x;\nc: d;}");
    }

    #[test]
    fn properties_need_a_container() {
        let mut tree = parse("a {b:c}").unwrap();
        let b = tree.root_node().child(0).unwrap().child(0).unwrap().id();
        assert_eq!(
            tree.add_property(b, "x", "y", Position::Last),
            Err(TreeError::NotAContainer(NodeKind::Property))
        );
    }

    #[test]
    fn trailing_comment_is_not_copied() {
        let mut tree = parse("a {\n\tb: c;\n\t/* keep */\n}").unwrap();
        let a = section_id(&tree, "a");
        tree.add_property(a, "foo", "bar", Position::Last).unwrap();
        assert_eq!(tree.to_string(), "a {\n\tb: c;\n\tfoo: bar;\n\t/* keep */\n}");
        assert_partitioned(&tree);

        let b = tree.node(a).unwrap().get("b").unwrap().id();
        tree.remove(b).unwrap();
        assert_eq!(tree.to_string(), "a {\n\tfoo: bar;\n\t/* keep */\n}");
        assert_partitioned(&tree);
    }

    #[test]
    fn removing_the_last_property_keeps_comments() {
        let mut tree = parse("a {\n\tb: c;\n\t/* keep */\n}").unwrap();
        let b = tree.root_node().child(0).unwrap().child(0).unwrap().id();
        tree.remove(b).unwrap();
        assert_eq!(tree.to_string(), "a {\n\t/* keep */\n}");
        assert_partitioned(&tree);
    }

    #[test]
    fn terminator_follows_the_value() {
        let mut tree = parse("x: y\n").unwrap();
        let root = tree.root();
        tree.add_property(root, "foo", "bar", Position::Last).unwrap();
        assert_eq!(tree.to_string(), "x: y;\nfoo: bar;");
        assert_partitioned(&tree);

        let mut tree = parse("a {\n\tb: c\n\t/* note */\n}").unwrap();
        let a = section_id(&tree, "a");
        tree.add_property(a, "foo", "bar", Position::Last).unwrap();
        assert_eq!(tree.to_string(), "a {\n\tb: c;\n\tfoo: bar;\n\t/* note */\n}");
        assert_partitioned(&tree);
    }

    #[test]
    fn property_after_value_replacement() {
        let mut tree = parse("a {b:c}").unwrap();
        let a = section_id(&tree, "a");
        tree.set_value(a, "x:y;").unwrap();
        tree.add_property(a, "foo", "bar", Position::Last).unwrap();
        assert_eq!(tree.to_string(), "a {x:y;foo:bar;}");
        assert_eq!(tree.node(a).unwrap().property("x"), Some("y"));
        assert_partitioned(&tree);
    }

    #[test]
    fn donor_after_stops_at_its_line() {
        assert_eq!(donor_after(NodeKind::Property, ";\n\t/* c */"), ";");
        assert_eq!(donor_after(NodeKind::Property, "; /* c */"), "; /* c */");
        assert_eq!(donor_after(NodeKind::Section, "\n}\n/* footer */\n"), "\n}\n");
        assert_eq!(donor_after(NodeKind::Section, " }\r\n\r\n"), " }\r\n");
        assert_eq!(donor_after(NodeKind::Section, "\n}"), "\n}");
        assert_eq!(donor_after(NodeKind::Section, "\n\n\t/* x */\n}\n/* y */"), "\n}\n");
        assert_eq!(donor_after(NodeKind::Section, "\n\t/* } */\r\n}"), "\r\n}");
    }

    // ── Sections ─────────────────────────────────────────────────────

    #[test]
    fn footer_comment_is_not_copied() {
        let mut tree = parse("a {\n\tb: c;\n}\n/* footer */\n").unwrap();
        let root = tree.root();
        tree.add_section(root, "d", Position::Last).unwrap();
        assert_eq!(tree.to_string(), "a {\n\tb: c;\n}\n/* footer */\nd {\n}\n");
        assert_partitioned(&tree);
    }

    #[test]
    fn add_section_to_empty_stylesheet() {
        let mut tree = parse("").unwrap();
        let root = tree.root();
        let id = tree.add_section(root, "a", Position::Last).unwrap();
        assert_eq!(tree.to_string(), "a {\n}\n");
        assert_eq!(tree.node(id).unwrap().name(), "a");
    }

    #[test]
    fn add_section_copies_last_section() {
        let mut tree = parse("a {\n\tb: c;\n}\n").unwrap();
        let root = tree.root();
        tree.add_section(root, "d", Position::Last).unwrap();
        assert_eq!(tree.to_string(), "a {\n\tb: c;\n}\nd {\n}\n");
        let d = tree.root_node().section("d", None).unwrap();
        assert_eq!(d.child_count(), 0);
    }

    #[test]
    fn add_section_separates_from_previous() {
        let mut tree = parse("a {b: c;}").unwrap();
        let root = tree.root();
        tree.add_section(root, "x", Position::Last).unwrap();
        tree.add_section(root, "y", Position::Last).unwrap();
        let names: Vec<_> = tree.root_node().sections().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["a", "x", "y"]);
        assert_eq!(tree.root_node().section("y", None).unwrap().value(), "");
    }

    #[test]
    fn nested_section_clones_its_container() {
        let mut tree = parse("@media print {\n\ta {b: c;}\n}").unwrap();
        let media = section_id(&tree, "@media print");
        let id = tree.add_section(media, "d", Position::Last).unwrap();
        let node = tree.node(id).unwrap();
        assert_eq!(node.name(), "d");
        assert_eq!(node.value(), "");
        assert_eq!(tree.node(media).unwrap().sections().len(), 2);
    }

    #[test]
    fn section_lookup_by_index() {
        let tree = parse("a {x: 1;}\nb {}\na {x: 2;}").unwrap();
        let root = tree.root_node();
        assert_eq!(root.section("a", Some(0)).unwrap().property("x"), Some("1"));
        assert_eq!(root.section("a", None).unwrap().property("x"), Some("2"));
        assert!(root.section("a", Some(5)).is_none());
    }
}
