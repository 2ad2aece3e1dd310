//! Plain-text dumps of a tree, used for debugging and snapshot tests.

use std::fmt::Write;

use super::arena::CssTree;
use super::node::RangeName;
use super::view::NodeRef;

impl CssTree {
    /// A normalized outline: one tab per level, `name: value;` for properties
    /// and `name {` ... `}` for sections. Original formatting is ignored.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        let root = self.root_node();
        if self.is_fragment() {
            write_node(&mut out, root, 0);
        } else {
            for child in root.children() {
                write_node(&mut out, child, 0);
            }
        }
        out
    }
}

fn write_node(out: &mut String, node: NodeRef<'_>, depth: usize) {
    let indent = "\t".repeat(depth);
    if node.is_property() {
        let _ = writeln!(out, "{indent}{}: {};", node.name(), node.value());
        return;
    }
    let _ = writeln!(out, "{indent}{} {{", node.name());
    for child in node.children() {
        write_node(out, child, depth + 1);
    }
    let _ = writeln!(out, "{indent}}}");
}

impl NodeRef<'_> {
    /// Every stored range with its offsets and text, one per line.
    pub fn dump_ranges(&self) -> String {
        let mut out = String::new();
        for name in RangeName::STORED {
            let range = self.range(name);
            let _ = writeln!(out, "{name} ({}:{}) {:?}", range.start, range.end, self.text(name));
        }
        out
    }
}
