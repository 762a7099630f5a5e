//! Section-aware three-way merge of markdown documents.
//!
//! The incoming document is the skeleton: its sections, in its order, make
//! up the result. Each incoming section is paired with a current and a base
//! section and resolved on its own. Local sections that nothing upstream
//! knows about are carried along at the end.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use stencil_hash::normalize;

use crate::config::MergeConfig;
use crate::error::ParseResult;
use crate::markers::render_conflict_block;
use crate::matching::{match_sections, match_sections_excluding};
use crate::section::{parse_sections, MarkdownSection};
use crate::three_way::merge_lines;

/// How one section was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    /// Incoming copied verbatim: nothing local to keep.
    Clean,
    /// Current kept: upstream did not touch this section.
    Preserved,
    /// Independent edits from both sides combined.
    AutoMerged,
    /// Both sides changed the same content; a marker block was emitted.
    Conflict,
}

/// Resolution of one section, for reporting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionResolution {
    pub title: String,
    pub level: u8,
    pub outcome: MergeOutcome,
}

/// Result of a structural merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOutput {
    pub merged_text: String,
    /// Number of sections resolved as [`MergeOutcome::Conflict`].
    pub conflict_count: usize,
    /// Incoming sections with no counterpart in current or base.
    pub new_section_count: usize,
    pub sections: Vec<SectionResolution>,
}

impl MergeOutput {
    /// Returns `true` if no section needs manual attention.
    pub fn is_clean(&self) -> bool {
        self.conflict_count == 0
    }

    /// Number of sections with the given outcome.
    pub fn count(&self, outcome: MergeOutcome) -> usize {
        self.sections.iter().filter(|s| s.outcome == outcome).count()
    }

    fn from_parts(merged_text: String, sections: Vec<SectionResolution>, new_sections: usize) -> Self {
        let conflict_count = sections
            .iter()
            .filter(|s| s.outcome == MergeOutcome::Conflict)
            .count();
        Self {
            merged_text,
            conflict_count,
            new_section_count: new_sections,
            sections,
        }
    }
}

/// Normalized heading and body of a section, for equality checks.
#[derive(PartialEq, Eq)]
struct Canonical {
    header: String,
    body: String,
}

impl Canonical {
    fn of(section: &MarkdownSection) -> Self {
        Self {
            header: canonical_line_block(&section.header_line),
            body: canonical_line_block(&section.body_content()),
        }
    }
}

/// Normalize a block of lines cut out of a larger document.
///
/// The block has lost its final line break, so a CRLF document leaves a
/// bare `\r` on the last line; restore the break before normalizing.
fn canonical_line_block(text: &str) -> String {
    let mut canonical = normalize(&format!("{text}\n"));
    canonical.pop();
    canonical
}

fn resolution(section: &MarkdownSection, outcome: MergeOutcome) -> SectionResolution {
    SectionResolution {
        title: section.title.clone(),
        level: section.level,
        outcome,
    }
}

/// A section's heading line (if any), content and trailing blank lines.
fn layout(header: Option<&str>, content: &str, trailing_blank: usize) -> String {
    let mut lines: Vec<&str> = Vec::new();
    if let Some(header) = header {
        lines.push(header);
    }
    if !content.is_empty() {
        lines.push(content);
    }
    lines.extend(std::iter::repeat("").take(trailing_blank));
    lines.join("\n")
}

fn header_of(section: &MarkdownSection) -> Option<&str> {
    (!section.is_preamble()).then_some(section.header_line.as_str())
}

/// Heading plus body content, for whole-section conflict blocks.
fn full_content(section: &MarkdownSection) -> String {
    layout(header_of(section), &section.body_content(), 0)
}

/// Output chunks and section resolutions, in document order.
#[derive(Default)]
struct Placed {
    chunks: Vec<String>,
    sections: Vec<SectionResolution>,
}

impl Placed {
    fn push(&mut self, chunk: Option<String>, section: SectionResolution) {
        self.chunks.extend(chunk);
        self.sections.push(section);
    }

    fn extend(&mut self, other: Placed) {
        self.chunks.extend(other.chunks);
        self.sections.extend(other.sections);
    }
}

/// Section-aware three-way merger.
#[derive(Clone, Debug, Default)]
pub struct StructuralMerger {
    config: MergeConfig,
}

struct Labels<'a> {
    base: &'a str,
    incoming: &'a str,
}

impl StructuralMerger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Merge `current` and `incoming`, both descended from `base`.
    ///
    /// `base` is `None` when the common ancestor is unknown; every section
    /// both sides have and disagree on then becomes a conflict whose base
    /// side reads "(no base version)". Labels name the versions in conflict
    /// markers. Fails only when a document cannot be segmented.
    pub fn merge(
        &self,
        base: Option<&str>,
        current: &str,
        incoming: &str,
        base_label: &str,
        incoming_label: &str,
    ) -> ParseResult<MergeOutput> {
        let current_secs = parse_sections(current)?;
        let incoming_secs = parse_sections(incoming)?;
        let base_secs = base.map(parse_sections).transpose()?;

        let canonical_current = normalize(current);
        let canonical_incoming = normalize(incoming);

        if let (Some(base_text), Some(base_secs)) = (base, base_secs.as_deref()) {
            let canonical_base = normalize(base_text);
            if canonical_current == canonical_base {
                debug!("current matches base, taking incoming");
                let new_sections = match_sections(&incoming_secs, base_secs, &self.config)
                    .iter()
                    .filter(|m| m.is_none())
                    .count();
                let sections = incoming_secs
                    .iter()
                    .map(|s| resolution(s, MergeOutcome::Clean))
                    .collect();
                return Ok(MergeOutput::from_parts(
                    incoming.to_string(),
                    sections,
                    new_sections,
                ));
            }
            if canonical_incoming == canonical_base {
                debug!("incoming matches base, keeping current");
                let sections = current_secs
                    .iter()
                    .map(|s| resolution(s, MergeOutcome::Preserved))
                    .collect();
                return Ok(MergeOutput::from_parts(current.to_string(), sections, 0));
            }
        }
        if canonical_current == canonical_incoming {
            debug!("current already matches incoming");
            let sections = incoming_secs
                .iter()
                .map(|s| resolution(s, MergeOutcome::Clean))
                .collect();
            return Ok(MergeOutput::from_parts(incoming.to_string(), sections, 0));
        }

        let labels = Labels {
            base: base_label,
            incoming: incoming_label,
        };
        let output = self.merge_sections(
            base_secs.as_deref(),
            &current_secs,
            &incoming_secs,
            &labels,
        );
        info!(
            sections = output.sections.len(),
            conflicts = output.conflict_count,
            new_sections = output.new_section_count,
            auto_merged = output.count(MergeOutcome::AutoMerged),
            "structural merge complete"
        );
        Ok(output)
    }

    fn merge_sections(
        &self,
        base: Option<&[MarkdownSection]>,
        current: &[MarkdownSection],
        incoming: &[MarkdownSection],
        labels: &Labels<'_>,
    ) -> MergeOutput {
        let base_secs = base.unwrap_or(&[]);
        let mut base_used = vec![false; base_secs.len()];

        let incoming_to_current = match_sections(incoming, current, &self.config);
        let incoming_to_base =
            match_sections_excluding(incoming, base_secs, &mut base_used, &self.config);

        let mut current_claimed = vec![false; current.len()];
        for c in incoming_to_current.iter().flatten() {
            current_claimed[*c] = true;
        }
        let leftover: Vec<usize> = (0..current.len()).filter(|c| !current_claimed[*c]).collect();
        let leftover_secs: Vec<MarkdownSection> =
            leftover.iter().map(|c| current[*c].clone()).collect();
        let leftover_to_base =
            match_sections_excluding(&leftover_secs, base_secs, &mut base_used, &self.config);

        // Local-only sections upstream does not have: a preamble stays in
        // front, everything else goes after the incoming sections.
        let mut head = Placed::default();
        let mut tail = Placed::default();
        for (k, section) in leftover_secs.iter().enumerate() {
            let place = if section.is_preamble() { &mut head } else { &mut tail };
            match leftover_to_base[k] {
                Some(b) => {
                    let base_sec = &base_secs[b];
                    if Canonical::of(section) == Canonical::of(base_sec) {
                        debug!(title = %section.title, "upstream removed unedited section");
                        place.push(None, resolution(section, MergeOutcome::Clean));
                    } else {
                        debug!(title = %section.title, "upstream removed edited section");
                        let block = render_conflict_block(
                            &section.body_content(),
                            Some(&base_sec.body_content()),
                            "",
                            labels.base,
                            labels.incoming,
                        );
                        let chunk = layout(header_of(section), &block, section.trailing_blank_lines());
                        place.push(Some(chunk), resolution(section, MergeOutcome::Conflict));
                    }
                }
                None => {
                    debug!(title = %section.title, "keeping local section");
                    place.push(Some(section.render()), resolution(section, MergeOutcome::Preserved));
                }
            }
        }

        let mut body = Placed::default();
        let mut new_sections = 0;
        for (i, inc) in incoming.iter().enumerate() {
            let cur = incoming_to_current[i].map(|c| &current[c]);
            let base_sec = incoming_to_base[i].map(|b| &base_secs[b]);
            let (chunk, outcome) = match (cur, base_sec) {
                (None, None) => {
                    new_sections += 1;
                    (Some(inc.render()), MergeOutcome::Clean)
                }
                (Some(cur), Some(base_sec)) => self.resolve_three(base_sec, cur, inc, labels),
                (Some(cur), None) => {
                    let base_side = if base.is_some() { Some("") } else { None };
                    resolve_two(cur, inc, base_side, labels)
                }
                (None, Some(base_sec)) => resolve_deleted(base_sec, inc, labels),
            };
            debug!(title = %inc.title, ?outcome, "section resolved");
            body.push(chunk, resolution(inc, outcome));
        }

        let mut all = head;
        all.extend(body);
        all.extend(tail);
        MergeOutput::from_parts(all.chunks.join("\n"), all.sections, new_sections)
    }

    /// Both sides have the section and a base exists.
    fn resolve_three(
        &self,
        base: &MarkdownSection,
        current: &MarkdownSection,
        incoming: &MarkdownSection,
        labels: &Labels<'_>,
    ) -> (Option<String>, MergeOutcome) {
        let (b, c, i) = (
            Canonical::of(base),
            Canonical::of(current),
            Canonical::of(incoming),
        );
        if c == b || c == i {
            return (Some(incoming.render()), MergeOutcome::Clean);
        }
        let trailing = incoming.trailing_blank_lines();
        if i == b {
            let body = current.body_content();
            return (
                Some(layout(header_of(current), &body, trailing)),
                MergeOutcome::Preserved,
            );
        }

        let header = if c.header == b.header {
            Some(header_of(incoming))
        } else if i.header == b.header || i.header == c.header {
            Some(header_of(current))
        } else {
            None
        };
        let Some(header) = header else {
            // Both renamed the heading differently: keep everything.
            let block = render_conflict_block(
                &full_content(current),
                Some(&full_content(base)),
                &full_content(incoming),
                labels.base,
                labels.incoming,
            );
            return (Some(layout(None, &block, trailing)), MergeOutcome::Conflict);
        };

        let body = if c.body == b.body {
            Some(i.body.clone())
        } else if i.body == b.body || i.body == c.body {
            Some(c.body.clone())
        } else {
            merge_lines(&b.body, &c.body, &i.body)
        };
        match body {
            Some(body) => (
                Some(layout(header, &body, trailing)),
                MergeOutcome::AutoMerged,
            ),
            None => {
                let block = render_conflict_block(
                    &current.body_content(),
                    Some(&base.body_content()),
                    &incoming.body_content(),
                    labels.base,
                    labels.incoming,
                );
                (Some(layout(header, &block, trailing)), MergeOutcome::Conflict)
            }
        }
    }
}

/// Both sides have the section but the base does not.
fn resolve_two(
    current: &MarkdownSection,
    incoming: &MarkdownSection,
    base_side: Option<&str>,
    labels: &Labels<'_>,
) -> (Option<String>, MergeOutcome) {
    let (c, i) = (Canonical::of(current), Canonical::of(incoming));
    if c == i {
        return (Some(incoming.render()), MergeOutcome::Clean);
    }
    let trailing = incoming.trailing_blank_lines();
    let chunk = if c.header == i.header {
        let block = render_conflict_block(
            &current.body_content(),
            base_side,
            &incoming.body_content(),
            labels.base,
            labels.incoming,
        );
        layout(header_of(incoming), &block, trailing)
    } else {
        let block = render_conflict_block(
            &full_content(current),
            base_side,
            &full_content(incoming),
            labels.base,
            labels.incoming,
        );
        layout(None, &block, trailing)
    };
    (Some(chunk), MergeOutcome::Conflict)
}

/// The user deleted a section that upstream still has.
fn resolve_deleted(
    base: &MarkdownSection,
    incoming: &MarkdownSection,
    labels: &Labels<'_>,
) -> (Option<String>, MergeOutcome) {
    if Canonical::of(base) == Canonical::of(incoming) {
        return (None, MergeOutcome::Preserved);
    }
    let block = render_conflict_block(
        "",
        Some(&base.body_content()),
        &incoming.body_content(),
        labels.base,
        labels.incoming,
    );
    (
        Some(layout(
            header_of(incoming),
            &block,
            incoming.trailing_blank_lines(),
        )),
        MergeOutcome::Conflict,
    )
}

/// Merge with the default [`MergeConfig`].
pub fn merge(
    base: Option<&str>,
    current: &str,
    incoming: &str,
    base_label: &str,
    incoming_label: &str,
) -> ParseResult<MergeOutput> {
    StructuralMerger::default().merge(base, current, incoming, base_label, incoming_label)
}
