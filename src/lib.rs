//! # css-edit-tree
//!
//! A tolerant CSS, LESS and SCSS parser that builds an editable tree whose nodes
//! stay attached to byte ranges of the original text.
//!
//! Untouched formatting, comments and indentation survive every edit verbatim:
//! renaming a selector or changing a value rewrites only that span of the buffer.
//!
//! ## Core Systems
//!
//! - **[`source`]**: byte ranges, the shared text buffer and its changeset log
//! - **[`css`]**: tokenizer, section scanner, declaration extractor, tree builder, selectors
//! - **[`tree`]**: slotmap-backed node arena with range derivation and structural edits
//! - **[`config`]**: parse options
//!
//! ## Example
//!
//! ```
//! use css_edit_tree::{parse, Position};
//!
//! let mut tree = parse("a {b:c;d:e}").unwrap();
//! let a = tree.root_node().section("a", None).unwrap().id();
//! tree.set_property(a, "b", "foo", Position::Last).unwrap();
//! tree.remove(tree.root_node().child(0).unwrap().child(1).unwrap().id()).unwrap();
//! assert_eq!(tree.to_string(), "a {b:foo;}");
//! ```

pub mod config;
pub mod css;
pub mod error;
pub mod source;
pub mod tree;

pub use config::ParseOptions;
pub use css::{ParseError, SelectorDeclaration};
pub use error::Error;
pub use source::{Changeset, Range, Source};
pub use tree::{
    CssTree, NodeId, NodeKind, NodeRef, Position, RangeName, SerializedNode, Style, TreeError,
};

/// Anything [`parse`] accepts: raw text, a serialized tree, or a tree.
pub trait IntoCssTree {
    fn into_css_tree(self, options: &ParseOptions) -> Result<CssTree, Error>;
}

impl IntoCssTree for &str {
    fn into_css_tree(self, options: &ParseOptions) -> Result<CssTree, Error> {
        Ok(css::build(self, options)?)
    }
}

impl IntoCssTree for String {
    fn into_css_tree(self, options: &ParseOptions) -> Result<CssTree, Error> {
        self.as_str().into_css_tree(options)
    }
}

impl IntoCssTree for &String {
    fn into_css_tree(self, options: &ParseOptions) -> Result<CssTree, Error> {
        self.as_str().into_css_tree(options)
    }
}

impl IntoCssTree for &SerializedNode {
    fn into_css_tree(self, options: &ParseOptions) -> Result<CssTree, Error> {
        let mut tree = CssTree::from_serialized(self)?;
        if options.record_changes {
            tree.start_recording();
        }
        Ok(tree)
    }
}

impl IntoCssTree for SerializedNode {
    fn into_css_tree(self, options: &ParseOptions) -> Result<CssTree, Error> {
        (&self).into_css_tree(options)
    }
}

/// Already-built trees pass through unchanged.
impl IntoCssTree for CssTree {
    fn into_css_tree(self, _options: &ParseOptions) -> Result<CssTree, Error> {
        Ok(self)
    }
}

/// Parse with default options.
pub fn parse(input: impl IntoCssTree) -> Result<CssTree, Error> {
    parse_with(input, &ParseOptions::default())
}

pub fn parse_with(input: impl IntoCssTree, options: &ParseOptions) -> Result<CssTree, Error> {
    input.into_css_tree(options)
}

/// Split a selector declaration such as `a > b, .c:hover`. Parsing happens on first access.
pub fn parse_selector(selector: &str) -> SelectorDeclaration {
    SelectorDeclaration::new(selector)
}
