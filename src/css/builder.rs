//! Tree builder: nests scanned sections by containment and fills every body
//! and every gap between sections with extracted declarations.

use super::error::ParseError;
use super::extract::extract_declarations;
use super::scanner::{scan_sections, SectionSpan};
use crate::config::ParseOptions;
use crate::source::{Range, Source};
use crate::tree::{CssTree, NodeData, NodeId, NodeKind, RangeName, RangeSet};

/// Ranges of a scanned section. The body's trailing whitespace goes to `after`.
fn section_ranges(text: &str, span: &SectionSpan) -> RangeSet {
    let body_start = span.content_start + 1;
    let close = span.end.saturating_sub(1).max(body_start);
    let body = Range::new(body_start, close).substring(text);
    let value_end = body_start + body.trim_end().len();

    RangeSet {
        before: None,
        name: Range::new(span.start, span.selector_end),
        between: Some(Range::new(span.selector_end, body_start)),
        value: Some(Range::new(body_start, value_end)),
        after: Some(Range::new(value_end, span.end)),
    }
}

/// The region a container's children partition.
fn container_range(tree: &CssTree, id: NodeId) -> Range {
    match tree.kind(id) {
        Some(NodeKind::Root) | None => Range::new(0, tree.text().len()),
        Some(_) => tree.nodes[id].ranges.value.unwrap_or_default(),
    }
}

/// Place every section under the innermost section that contains it, starting from `container`.
fn nest_sections(tree: &mut CssTree, container: NodeId, spans: &[SectionSpan]) {
    let mut last = container;
    for span in spans {
        let ranges = section_ranges(tree.text(), span);
        let own = Range::new(span.start, span.end);
        let mut parent = last;
        while parent != container && !tree.range(parent, RangeName::Own).contains(own) {
            parent = tree.parent(parent).unwrap_or(container);
        }
        last = tree.push_child(parent, NodeData::new(NodeKind::Section, ranges));
    }
}

/// Extract declarations from a leaf body, or from the gaps around child sections.
fn populate(tree: &mut CssTree, id: NodeId, limit: usize) -> Result<usize, ParseError> {
    let sections = tree.children(id).to_vec();
    let container = container_range(tree, id);
    let mut count = 0;

    let mut gaps = Vec::with_capacity(sections.len() + 1);
    let mut start = container.start;
    for &section in &sections {
        count += populate(tree, section, limit)?;
        let own = tree.range(section, RangeName::Own);
        gaps.push(Range::new(start, own.start.max(start)));
        start = own.end;
    }
    gaps.push(Range::new(start, container.end.max(start)));

    for gap in gaps.into_iter().filter(|g| !g.is_empty()) {
        for declaration in extract_declarations(tree.text(), gap, limit)? {
            let ranges = RangeSet {
                before: None,
                name: declaration.name,
                between: Some(declaration.between()),
                value: Some(declaration.value),
                after: Some(declaration.after()),
            };
            tree.push_child(id, NodeData::new(NodeKind::Property, ranges));
            count += 1;
        }
    }
    tree.sort_children_by(id, |data| data.ranges.name.start);
    Ok(count)
}

/// Close the gap between the last child and the end of its container.
///
/// At the top level the last child's `after` takes everything up to the end of
/// the buffer. Inside a section it stops at the first line break, and the
/// section's `value` ends there too: trailing comment lines and the indentation
/// of the closing brace belong to the section's own `after`.
fn close_gaps(tree: &mut CssTree, start: NodeId) {
    for id in tree.walk_depth_first(start) {
        let Some(&last) = tree.children(id).last() else {
            continue;
        };
        let end = container_range(tree, id).end;
        let Some(after) = tree.nodes[last].ranges.after else {
            continue;
        };
        if after.end >= end {
            continue;
        }
        if tree.kind(id) == Some(NodeKind::Root) {
            tree.nodes[last].ranges.after = Some(Range::new(after.start, end));
            continue;
        }

        let cut = Range::new(after.end, end)
            .substring(tree.text())
            .find(['\n', '\r'])
            .map_or(end, |p| after.end + p);
        tree.nodes[last].ranges.after = Some(Range::new(after.start, cut));
        let ranges = &mut tree.nodes[id].ranges;
        if let Some(value) = ranges.value.as_mut() {
            value.end = cut;
        }
        if let Some(outer) = ranges.after.as_mut() {
            outer.start = cut;
        }
    }
}

/// Scan the value of `container` for sections and declarations and attach
/// them as its children. Returns the number of properties found.
pub(crate) fn populate_container(
    tree: &mut CssTree,
    container: NodeId,
    limit: usize,
) -> Result<usize, ParseError> {
    let body = container_range(tree, container);
    let spans: Vec<SectionSpan> = scan_sections(body.substring(tree.text()), limit)?
        .into_iter()
        .map(|span| span.shifted(body.start))
        .collect();
    nest_sections(tree, container, &spans);
    let properties = populate(tree, container, limit)?;
    close_gaps(tree, container);
    tree.materialize();
    Ok(properties)
}

/// Parse `text` into a fully materialized tree.
pub fn build(text: &str, options: &ParseOptions) -> Result<CssTree, ParseError> {
    let mut tree = CssTree::with_root(Source::new(text), NodeData::root());
    let root = tree.root();
    let properties = populate_container(&mut tree, root, options.iteration_limit)?;

    if options.record_changes {
        tree.start_recording();
    }
    log::debug!(
        "parsed {} bytes: {} nodes, {properties} properties",
        text.len(),
        tree.len() - 1
    );
    Ok(tree)
}
