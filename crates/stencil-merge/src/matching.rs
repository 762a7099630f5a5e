//! Greedy one-to-one pairing of sections between two documents.
//!
//! Two passes, both first-come in document order:
//!
//! 1. exact: same level and same case-folded heading text;
//! 2. fuzzy: the best-scoring unused candidate whose weighted similarity
//!    reaches the configured threshold.
//!
//! A preamble only pairs with a preamble. Once a section is claimed it is
//! never rematched.

use crate::config::MergeConfig;
use crate::section::MarkdownSection;
use crate::similarity::section_similarity;

/// For every section of `from`, the index of its partner in `to`.
pub fn match_sections(
    from: &[MarkdownSection],
    to: &[MarkdownSection],
    config: &MergeConfig,
) -> Vec<Option<usize>> {
    let mut used = vec![false; to.len()];
    match_sections_excluding(from, to, &mut used, config)
}

/// Like [`match_sections`], but `used` marks `to` sections that are
/// already claimed and is updated with the new claims.
pub fn match_sections_excluding(
    from: &[MarkdownSection],
    to: &[MarkdownSection],
    used: &mut [bool],
    config: &MergeConfig,
) -> Vec<Option<usize>> {
    let mut pairs = vec![None; from.len()];

    for (i, section) in from.iter().enumerate() {
        let key = section.match_key();
        let found = to.iter().enumerate().position(|(j, candidate)| {
            !used[j]
                && candidate.is_preamble() == section.is_preamble()
                && candidate.level == section.level
                && candidate.match_key() == key
        });
        if let Some(j) = found {
            used[j] = true;
            pairs[i] = Some(j);
        }
    }

    for (i, section) in from.iter().enumerate() {
        if pairs[i].is_some() || section.is_preamble() {
            continue;
        }
        let mut best: Option<(usize, f64)> = None;
        for (j, candidate) in to.iter().enumerate() {
            if used[j] || candidate.is_preamble() {
                continue;
            }
            let score = section_similarity(section, candidate, config);
            if score >= config.similarity_threshold && best.map_or(true, |(_, s)| score > s) {
                best = Some((j, score));
            }
        }
        if let Some((j, _)) = best {
            used[j] = true;
            pairs[i] = Some(j);
        }
    }

    pairs
}
