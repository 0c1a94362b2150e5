//! Flattening: order the record map's blocks and concatenate their fragments.
//!
//! Two orderings are available (see [`BlockOrdering`]):
//!
//! * **DepthFirst**: start from the root blocks (those no present block
//!   lists as a child) in record-map order, emit each block, then recurse
//!   into its `content` children in authored order. Every block is emitted
//!   exactly once; blocks only reachable through a cycle are appended at the
//!   end in map order.
//!
//! * **Legacy**: the pairwise comparator `pos(b in a.content) - pos(a in
//!   b.content)` (−1 when absent) applied as a stable sort over the map
//!   order. It never recurses and only relates direct parent/child pairs;
//!   unrelated pairs compare equal and keep their map order. Under this
//!   comparator a parent ranks *after* its direct children.
//!
//! The legacy comparator is not a total order, so it is applied with a
//! plain stable insertion sort instead of `slice::sort_by`, which is allowed
//! to panic on inconsistent comparators.

use crate::config::BlockOrdering;
use crate::document::{BlockRecord, Document};
use crate::pipeline::render::render_record;
use std::collections::HashSet;
use tracing::debug;

/// Render the whole document to Markdown, trimmed of surrounding whitespace.
pub fn flatten(doc: &Document, ordering: BlockOrdering) -> String {
    let ordered = order_blocks(doc, ordering);
    debug!("Ordered {} blocks ({:?})", ordered.len(), ordering);

    let markdown: String = ordered.into_iter().map(render_record).collect();
    markdown.trim().to_string()
}

/// Put the document's records in rendering order.
pub fn order_blocks(doc: &Document, ordering: BlockOrdering) -> Vec<&BlockRecord> {
    match ordering {
        BlockOrdering::DepthFirst => depth_first(doc),
        BlockOrdering::Legacy => legacy_sort(doc),
    }
}

// ── Depth-first ──────────────────────────────────────────────────────────

fn depth_first(doc: &Document) -> Vec<&BlockRecord> {
    let referenced: HashSet<&str> = doc
        .iter()
        .filter_map(|(_, record)| record.value.as_ref())
        .flat_map(|block| block.content.iter().map(String::as_str))
        .filter(|child| doc.contains(child))
        .collect();

    let mut visited: HashSet<&str> = HashSet::with_capacity(doc.len());
    let mut out = Vec::with_capacity(doc.len());

    for (id, _) in doc.iter().filter(|(id, _)| !referenced.contains(id)) {
        visit(doc, id, &mut visited, &mut out);
    }

    // Cycles have no root; keep their blocks rather than dropping them.
    for (id, _) in doc.iter() {
        visit(doc, id, &mut visited, &mut out);
    }

    out
}

fn visit<'a>(
    doc: &'a Document,
    root: &'a str,
    visited: &mut HashSet<&'a str>,
    out: &mut Vec<&'a BlockRecord>,
) {
    // Explicit stack: deep pages must not overflow the call stack.
    let mut stack: Vec<&'a str> = vec![root];

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(record) = doc.get(id) else {
            continue;
        };
        out.push(record);

        if let Some(block) = &record.value {
            for child in block.content.iter().rev() {
                if doc.contains(child) && !visited.contains(child.as_str()) {
                    stack.push(child.as_str());
                }
            }
        }
    }
}

// ── Legacy comparator ────────────────────────────────────────────────────

/// Position of `needle`'s block id inside `haystack`'s `content`, or −1.
fn child_position(haystack: &BlockRecord, needle: &BlockRecord) -> isize {
    let (Some(parent), Some(child)) = (&haystack.value, &needle.value) else {
        return -1;
    };
    parent
        .content
        .iter()
        .position(|id| *id == child.id)
        .map_or(-1, |p| p as isize)
}

fn legacy_compare(a: &BlockRecord, b: &BlockRecord) -> isize {
    child_position(a, b) - child_position(b, a)
}

fn legacy_sort(doc: &Document) -> Vec<&BlockRecord> {
    let mut records: Vec<&BlockRecord> = doc.iter().map(|(_, r)| r).collect();

    for i in 1..records.len() {
        let mut j = i;
        while j > 0 && legacy_compare(records[j - 1], records[j]) > 0 {
            records.swap(j - 1, j);
            j -= 1;
        }
    }

    records
}
