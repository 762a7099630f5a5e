//! Line-section diff: changed regions with context, plus what lies between.
//!
//! Uses `similar`'s grouped ops the same way a unified diff does: each
//! group is a run of changes padded with up to `context` equal lines on
//! either side, and changes separated by at most `2 * context` equal lines
//! share one group.
//!
//! Myers runs in time proportional to the input size times the edit
//! distance, so large dissimilar inputs are cut off by a deadline and
//! reported as [`DiffError::Timeout`] rather than diffed approximately.

use std::fmt;
use std::ops::Range;
use std::time::{Duration, Instant};

use similar::{Algorithm, TextDiff};
use tracing::debug;

use crate::config::ReportConfig;
use crate::error::{DiffError, DiffResult};

/// A 1-based inclusive line range. Empty when `end < start`; an empty span
/// sits after line `end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    fn from_range(range: Range<usize>) -> Self {
        Self {
            start: range.start + 1,
            end: range.end,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn len(&self) -> usize {
        (self.end + 1).saturating_sub(self.start)
    }
}

impl fmt::Display for LineSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            if self.end == 0 {
                write!(f, "none (at start)")
            } else {
                write!(f, "none (after line {})", self.end)
            }
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A changed region, context included, on both sides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffSection {
    pub current: LineSpan,
    pub incoming: LineSpan,
    pub current_lines: Vec<String>,
    pub incoming_lines: Vec<String>,
}

/// A region identical on both sides and outside every [`DiffSection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnchangedRange {
    pub current: LineSpan,
    pub incoming: LineSpan,
}

/// Result of [`line_sections`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineDiff {
    pub sections: Vec<DiffSection>,
    pub unchanged: Vec<UnchangedRange>,
    pub current_total: usize,
    pub incoming_total: usize,
}

impl LineDiff {
    /// Returns `true` if the two sides have the same lines.
    pub fn is_identical(&self) -> bool {
        self.sections.is_empty()
    }
}

fn check_input(text: &str, lines: usize, limit: usize) -> DiffResult<()> {
    if text.contains('\0') {
        return Err(DiffError::Binary);
    }
    if lines > limit {
        return Err(DiffError::TooLarge { lines, limit });
    }
    Ok(())
}

/// Diff `current` against `incoming` by line and group the changes.
pub fn line_sections(current: &str, incoming: &str, config: &ReportConfig) -> DiffResult<LineDiff> {
    let old: Vec<&str> = current.lines().collect();
    let new: Vec<&str> = incoming.lines().collect();
    check_input(current, old.len(), config.max_diff_lines)?;
    check_input(incoming, new.len(), config.max_diff_lines)?;

    let budget = Duration::from_millis(config.diff_timeout_ms);
    let started = Instant::now();
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .timeout(budget)
        .diff_slices(&old, &new);
    // Past the deadline `similar` returns a coarse diff; do not report it.
    if started.elapsed() >= budget {
        debug!(current = old.len(), incoming = new.len(), ms = config.diff_timeout_ms, "diff timed out");
        return Err(DiffError::Timeout {
            ms: config.diff_timeout_ms,
        });
    }
    let mut sections = Vec::new();
    let mut unchanged = Vec::new();
    let (mut old_cursor, mut new_cursor) = (0, 0);

    for group in diff.grouped_ops(config.context_lines) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;

        if old_range.start > old_cursor {
            unchanged.push(UnchangedRange {
                current: LineSpan::from_range(old_cursor..old_range.start),
                incoming: LineSpan::from_range(new_cursor..new_range.start),
            });
        }
        sections.push(DiffSection {
            current: LineSpan::from_range(old_range.clone()),
            incoming: LineSpan::from_range(new_range.clone()),
            current_lines: old[old_range.clone()].iter().map(|l| l.to_string()).collect(),
            incoming_lines: new[new_range.clone()].iter().map(|l| l.to_string()).collect(),
        });
        old_cursor = old_range.end;
        new_cursor = new_range.end;
    }
    if old_cursor < old.len() {
        unchanged.push(UnchangedRange {
            current: LineSpan::from_range(old_cursor..old.len()),
            incoming: LineSpan::from_range(new_cursor..new.len()),
        });
    }

    Ok(LineDiff {
        sections,
        unchanged,
        current_total: old.len(),
        incoming_total: new.len(),
    })
}
