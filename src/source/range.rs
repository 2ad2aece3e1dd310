//! Half-open byte intervals into a source buffer.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A half-open byte interval `[start, end)`.
///
/// Construction normalizes swapped bounds, so `start <= end` always holds.
/// Serialized as a two-element array `[start, end]`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    /// Create a range, swapping the bounds if they are reversed.
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// Create a range from a start offset and a length.
    #[inline]
    pub const fn with_len(start: usize, len: usize) -> Self {
        Self { start, end: start + len }
    }

    /// A zero-length range positioned at `at`.
    #[inline]
    pub const fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `other` lies entirely inside this range (bounds inclusive).
    #[inline]
    pub fn contains(&self, other: Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether byte offset `pos` falls inside `[start, end)`.
    #[inline]
    pub fn contains_offset(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Whether the two ranges share at least one byte.
    pub fn overlaps(&self, other: Range) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The shared part of two ranges, if any.
    pub fn intersection(&self, other: Range) -> Option<Range> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Range { start, end })
    }

    /// The smallest range covering both, defined only when they overlap.
    pub fn union(&self, other: Range) -> Option<Range> {
        self.overlaps(other).then(|| Range {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        })
    }

    /// Move both bounds by `delta` bytes.
    #[inline]
    pub fn shift(&mut self, delta: isize) {
        self.start = self.start.saturating_add_signed(delta);
        self.end = self.end.saturating_add_signed(delta);
    }

    /// Return a copy moved by `delta` bytes.
    #[inline]
    pub fn shifted(mut self, delta: isize) -> Range {
        self.shift(delta);
        self
    }

    /// Move only the end bound by `delta` bytes.
    #[inline]
    pub fn grow(&mut self, delta: isize) {
        self.end = self.end.saturating_add_signed(delta).max(self.start);
    }

    /// Slice `text` by this range. Returns `""` when the range does not fit the text.
    pub fn substring<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.start..self.end).unwrap_or("")
    }

    #[inline]
    pub const fn to_array(&self) -> [usize; 2] {
        [self.start, self.end]
    }
}

impl From<[usize; 2]> for Range {
    fn from([start, end]: [usize; 2]) -> Self {
        Range::new(start, end)
    }
}

impl From<Range> for [usize; 2] {
    fn from(range: Range) -> Self {
        range.to_array()
    }
}

impl From<std::ops::Range<usize>> for Range {
    fn from(range: std::ops::Range<usize>) -> Self {
        Range::new(range.start, range.end)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Sort ranges by start ascending; on equal starts the longer range comes first.
pub fn sort_ranges(ranges: &mut [Range]) {
    ranges.sort_by(|a, b| match a.start.cmp(&b.start) {
        Ordering::Equal => b.end.cmp(&a.end),
        other => other,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_swapped_bounds() {
        let r = Range::new(10, 4);
        assert_eq!(r, Range { start: 4, end: 10 });
        assert_eq!(r.len(), 6);
    }

    #[test]
    fn empty_range() {
        let r = Range::empty(3);
        assert!(r.is_empty());
        assert_eq!(r.substring("abcdef"), "");
    }

    #[test]
    fn containment_is_inclusive() {
        let outer = Range::new(2, 8);
        assert!(outer.contains(Range::new(2, 8)));
        assert!(outer.contains(Range::new(3, 5)));
        assert!(!outer.contains(Range::new(1, 5)));
        assert!(outer.contains_offset(2));
        assert!(!outer.contains_offset(8));
    }

    #[test]
    fn intersection_and_union() {
        let a = Range::new(0, 5);
        let b = Range::new(3, 9);
        assert_eq!(a.intersection(b), Some(Range::new(3, 5)));
        assert_eq!(a.union(b), Some(Range::new(0, 9)));

        let c = Range::new(5, 7);
        assert_eq!(a.intersection(c), None);
        assert_eq!(a.union(c), None);
    }

    #[test]
    fn shift_and_grow() {
        let mut r = Range::new(4, 6);
        r.shift(3);
        assert_eq!(r, Range::new(7, 9));
        r.shift(-7);
        assert_eq!(r, Range::new(0, 2));
        r.grow(-5);
        assert_eq!(r, Range::empty(0));
    }

    #[test]
    fn substring_out_of_bounds_is_empty() {
        assert_eq!(Range::new(1, 3).substring("abcd"), "bc");
        assert_eq!(Range::new(2, 30).substring("abcd"), "");
    }

    #[test]
    fn sort_prefers_longer_on_ties() {
        let mut ranges = vec![Range::new(4, 5), Range::new(0, 2), Range::new(0, 9)];
        sort_ranges(&mut ranges);
        assert_eq!(ranges, vec![Range::new(0, 9), Range::new(0, 2), Range::new(4, 5)]);
    }

    #[test]
    fn serializes_as_pair() {
        let json = serde_json::to_string(&Range::new(3, 7)).unwrap();
        assert_eq!(json, "[3,7]");
        let back: Range = serde_json::from_str("[7,3]").unwrap();
        assert_eq!(back, Range::new(3, 7));
    }
}
