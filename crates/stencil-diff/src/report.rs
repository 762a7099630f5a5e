//! Markdown rendering of a line-section diff.

use std::fmt::Write as _;

use stencil_merge::NO_BASE_PLACEHOLDER;

use crate::sections::{LineDiff, UnchangedRange};

/// A conflict report for one file, ready to render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictReport {
    /// Path of the conflicted file, as shown to the user.
    pub path: String,
    pub base_label: String,
    pub incoming_label: String,
    /// `false` when no base version is known for the file.
    pub base_known: bool,
    pub diff: LineDiff,
}

/// Shortest backtick fence longer than any backtick run in `lines`.
fn fence_for(lines: &[String]) -> String {
    let longest = lines
        .iter()
        .flat_map(|line| line.split(|c: char| c != '`'))
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat((longest + 1).max(3))
}

fn push_block(out: &mut String, heading: &str, lines: &[String]) {
    let _ = writeln!(out, "{heading}:\n");
    if lines.is_empty() {
        out.push_str("_(no lines)_\n\n");
        return;
    }
    let fence = fence_for(lines);
    let _ = writeln!(out, "{fence}text");
    for line in lines {
        let _ = writeln!(out, "{line}");
    }
    let _ = writeln!(out, "{fence}\n");
}

fn unchanged_line(range: &UnchangedRange) -> String {
    format!(
        "- Lines {} (current) / {} (incoming), {} lines",
        range.current,
        range.incoming,
        range.current.len()
    )
}

impl ConflictReport {
    /// Number of changed sections.
    pub fn section_count(&self) -> usize {
        self.diff.sections.len()
    }

    /// Render as a markdown document.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Conflict report: {}\n", self.path);
        let _ = writeln!(
            out,
            "Comparing your current file (based on **{}**) with incoming **{}**.",
            self.base_label, self.incoming_label
        );
        if !self.base_known {
            let _ = writeln!(out, "Base: {NO_BASE_PLACEHOLDER}.");
        }
        let _ = writeln!(
            out,
            "The current file has {} lines, the incoming file has {}. \
             {} changed section(s) are listed below; the file itself was not modified.\n",
            self.diff.current_total,
            self.diff.incoming_total,
            self.section_count()
        );

        out.push_str("## Changed sections\n\n");
        if self.diff.sections.is_empty() {
            out.push_str("None.\n\n");
        }
        for (n, section) in self.diff.sections.iter().enumerate() {
            let _ = writeln!(
                out,
                "### {}. Lines {} (current) / {} (incoming)\n",
                n + 1,
                section.current,
                section.incoming
            );
            push_block(&mut out, "Current", &section.current_lines);
            push_block(&mut out, "Incoming", &section.incoming_lines);
        }

        out.push_str("## Unchanged ranges\n\n");
        if self.diff.unchanged.is_empty() {
            out.push_str("None.\n");
        }
        for range in &self.diff.unchanged {
            let _ = writeln!(out, "{}", unchanged_line(range));
        }
        out
    }
}
