//! Line-level three-way merge of a single section body.
//!
//! Both sides are diffed against the base. Each side's changes become hunks
//! over base line ranges; two hunks from different sides may only coexist
//! when their ranges neither overlap nor touch. Anything else is a conflict:
//! a false conflict costs the user a manual edit, a false merge loses text.

use std::ops::Range;

use similar::{capture_diff_slices, Algorithm, DiffTag};

#[derive(Clone, Debug, PartialEq, Eq)]
struct Hunk<'a> {
    base: Range<usize>,
    replacement: Vec<&'a str>,
}

fn hunks<'a>(base: &[&'a str], side: &[&'a str]) -> Vec<Hunk<'a>> {
    let mut out: Vec<Hunk<'a>> = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, base, side) {
        let (tag, old, new) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            continue;
        }
        match out.last_mut() {
            // Coalesce a delete immediately followed by an insert.
            Some(last) if last.base.end == old.start => {
                last.base.end = old.end;
                last.replacement.extend_from_slice(&side[new]);
            }
            _ => out.push(Hunk {
                base: old,
                replacement: side[new].to_vec(),
            }),
        }
    }
    out
}

fn touches(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start <= b.end && b.start <= a.end
}

/// Merge two edited versions of `base`, line by line.
///
/// Returns `None` when the edits overlap or touch. Identical edits made on
/// both sides are applied once.
pub fn merge_lines(base: &str, current: &str, incoming: &str) -> Option<String> {
    let base_lines: Vec<&str> = base.split('\n').collect();
    let current_lines: Vec<&str> = current.split('\n').collect();
    let incoming_lines: Vec<&str> = incoming.split('\n').collect();

    let ours = hunks(&base_lines, &current_lines);
    let theirs = hunks(&base_lines, &incoming_lines);

    let mut combined: Vec<Hunk<'_>> = ours.clone();
    for hunk in theirs {
        if ours.contains(&hunk) {
            continue;
        }
        if ours.iter().any(|o| touches(&o.base, &hunk.base)) {
            return None;
        }
        combined.push(hunk);
    }
    combined.sort_by_key(|h| (h.base.start, h.base.end));

    let mut merged: Vec<&str> = Vec::with_capacity(base_lines.len());
    let mut cursor = 0;
    for hunk in &combined {
        merged.extend_from_slice(&base_lines[cursor..hunk.base.start]);
        merged.extend_from_slice(&hunk.replacement);
        cursor = hunk.base.end;
    }
    merged.extend_from_slice(&base_lines[cursor..]);
    Some(merged.join("\n"))
}
