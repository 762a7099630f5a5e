//! Similarity scores used for fuzzy section matching.
//!
//! Scores are `similar`'s diff ratio (`2 * matches / total length`), which
//! behaves like a normalized edit distance: 1.0 for identical inputs, 0.0
//! for inputs with nothing in common.

use similar::TextDiff;

use crate::config::MergeConfig;
use crate::section::MarkdownSection;

/// Character-level similarity of two short strings (headings).
pub fn text_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Line-level similarity of two section bodies.
///
/// Bodies are compared by line rather than by character: they can be
/// hundreds of lines long, and a changed line is the unit users edit.
pub fn body_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    f64::from(TextDiff::from_lines(a, b).ratio())
}

/// Weighted similarity of two sections.
///
/// `heading_weight * heading + (1 - heading_weight) * body`, with headings
/// compared case-insensitively.
pub fn section_similarity(a: &MarkdownSection, b: &MarkdownSection, config: &MergeConfig) -> f64 {
    let heading = text_similarity(&a.match_key(), &b.match_key());
    let body = body_similarity(
        &stencil_hash::normalize(&a.body_content()),
        &stencil_hash::normalize(&b.body_content()),
    );
    config.heading_weight * heading + config.body_weight() * body
}
