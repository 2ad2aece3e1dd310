//! Node types: NodeId, NodeKind, range names and stored node data.

use std::cell::OnceCell;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use super::error::TreeError;
use crate::css::selector::SelectorDeclaration;
use crate::source::Range;

new_key_type! {
    /// Unique identifier for a tree node. Copy, lightweight (u64).
    pub struct NodeId;
}

/// What a node represents.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// The whole stylesheet.
    Root,
    /// A rule: `selector { ... }`.
    Section,
    /// A declaration: `name: value;`.
    Property,
}

impl NodeKind {
    /// Whether nodes of this kind may hold children.
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::Section)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Root => "root",
            NodeKind::Section => "section",
            NodeKind::Property => "property",
        })
    }
}

// ---------------------------------------------------------------------------
// Range names
// ---------------------------------------------------------------------------

/// Named ranges of a node.
///
/// The first five are stored; `Full` (before start to after end) and `Own`
/// (name start to after end, spelled `"self"`) are always derived.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RangeName {
    Before,
    Name,
    Between,
    Value,
    After,
    Full,
    Own,
}

impl RangeName {
    /// Stored ranges in document order.
    pub const STORED: [RangeName; 5] = [
        RangeName::Before,
        RangeName::Name,
        RangeName::Between,
        RangeName::Value,
        RangeName::After,
    ];

    pub fn is_stored(self) -> bool {
        !matches!(self, RangeName::Full | RangeName::Own)
    }

    /// Position in document order, `None` for derived ranges.
    pub fn order(self) -> Option<usize> {
        Self::STORED.iter().position(|&n| n == self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RangeName::Before => "before",
            RangeName::Name => "name",
            RangeName::Between => "between",
            RangeName::Value => "value",
            RangeName::After => "after",
            RangeName::Full => "full",
            RangeName::Own => "self",
        }
    }
}

impl FromStr for RangeName {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(RangeName::Before),
            "name" => Ok(RangeName::Name),
            "between" => Ok(RangeName::Between),
            "value" => Ok(RangeName::Value),
            "after" => Ok(RangeName::After),
            "full" => Ok(RangeName::Full),
            "self" => Ok(RangeName::Own),
            other => Err(TreeError::UnknownRange(other.to_owned())),
        }
    }
}

impl fmt::Display for RangeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formatting ranges of a node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Style {
    Before,
    Between,
    After,
}

impl Style {
    pub fn range_name(self) -> RangeName {
        match self {
            Style::Before => RangeName::Before,
            Style::Between => RangeName::Between,
            Style::After => RangeName::After,
        }
    }
}

impl FromStr for Style {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Style::Before),
            "between" => Ok(Style::Between),
            "after" => Ok(Style::After),
            other => Err(TreeError::UnknownStyle(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Insertion position
// ---------------------------------------------------------------------------

/// Where to insert a child.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Position {
    First,
    Last,
    /// Explicit index. Negative values count from the end, so `-1` is before the last child.
    At(isize),
}

impl Position {
    /// Resolve to a concrete index in `0..=len`.
    pub fn resolve(self, len: usize) -> Result<usize, TreeError> {
        let index = match self {
            Position::First => return Ok(0),
            Position::Last => return Ok(len),
            Position::At(i) => i,
        };
        let resolved = if index < 0 {
            len as isize + index
        } else {
            index
        };
        if resolved < 0 || resolved as usize > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        Ok(resolved as usize)
    }
}

// ---------------------------------------------------------------------------
// Stored data
// ---------------------------------------------------------------------------

/// The stored ranges of a node. `name` is always present for non-root nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeSet {
    pub before: Option<Range>,
    pub name: Range,
    pub between: Option<Range>,
    pub value: Option<Range>,
    pub after: Option<Range>,
}

impl RangeSet {
    pub fn get(&self, name: RangeName) -> Option<Range> {
        match name {
            RangeName::Before => self.before,
            RangeName::Name => Some(self.name),
            RangeName::Between => self.between,
            RangeName::Value => self.value,
            RangeName::After => self.after,
            RangeName::Full | RangeName::Own => None,
        }
    }

    /// Store `range` under `name`. Derived names are ignored.
    pub fn set(&mut self, name: RangeName, range: Range) {
        match name {
            RangeName::Before => self.before = Some(range),
            RangeName::Name => self.name = range,
            RangeName::Between => self.between = Some(range),
            RangeName::Value => self.value = Some(range),
            RangeName::After => self.after = Some(range),
            RangeName::Full | RangeName::Own => {}
        }
    }

    pub fn is_complete(&self) -> bool {
        self.before.is_some() && self.between.is_some() && self.value.is_some() && self.after.is_some()
    }

    /// Shift the stored range `name`, if present.
    pub fn shift(&mut self, name: RangeName, delta: isize) {
        if let Some(mut range) = self.get(name) {
            range.shift(delta);
            self.set(name, range);
        }
    }

    pub fn shift_all(&mut self, delta: isize) {
        for name in RangeName::STORED {
            self.shift(name, delta);
        }
    }
}

/// Data associated with a single tree node.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub ranges: RangeSet,
    /// Parsed selector of a section, built on first access and reset on rename.
    pub(crate) selector: OnceCell<SelectorDeclaration>,
}

impl NodeData {
    pub fn new(kind: NodeKind, ranges: RangeSet) -> Self {
        Self {
            kind,
            ranges,
            selector: OnceCell::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(NodeKind::Root, RangeSet::default())
    }

    pub(crate) fn invalidate_selector(&mut self) {
        self.selector = OnceCell::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_names_parse() {
        assert_eq!("self".parse::<RangeName>().unwrap(), RangeName::Own);
        assert_eq!("between".parse::<RangeName>().unwrap(), RangeName::Between);
        assert_eq!(
            "margin".parse::<RangeName>(),
            Err(TreeError::UnknownRange("margin".into()))
        );
    }

    #[test]
    fn styles_parse() {
        assert_eq!("after".parse::<Style>().unwrap(), Style::After);
        assert_eq!(
            "name".parse::<Style>(),
            Err(TreeError::UnknownStyle("name".into()))
        );
    }

    #[test]
    fn stored_order() {
        assert_eq!(RangeName::Before.order(), Some(0));
        assert_eq!(RangeName::After.order(), Some(4));
        assert_eq!(RangeName::Full.order(), None);
    }

    #[test]
    fn position_resolution() {
        assert_eq!(Position::First.resolve(3), Ok(0));
        assert_eq!(Position::Last.resolve(3), Ok(3));
        assert_eq!(Position::At(2).resolve(3), Ok(2));
        assert_eq!(Position::At(-1).resolve(3), Ok(2));
        assert_eq!(Position::At(-3).resolve(3), Ok(0));
        assert_eq!(
            Position::At(4).resolve(3),
            Err(TreeError::IndexOutOfRange { index: 4, len: 3 })
        );
        assert_eq!(
            Position::At(-4).resolve(3),
            Err(TreeError::IndexOutOfRange { index: -4, len: 3 })
        );
    }

    #[test]
    fn range_set_shift() {
        let mut set = RangeSet {
            name: Range::new(2, 3),
            value: Some(Range::new(4, 6)),
            ..RangeSet::default()
        };
        set.shift_all(2);
        assert_eq!(set.name, Range::new(4, 5));
        assert_eq!(set.value, Some(Range::new(6, 8)));
        assert_eq!(set.after, None);
        assert!(!set.is_complete());
    }
}
