//! Merge engine for Stencil.
//!
//! Splits markdown documents into heading-delimited sections, pairs up the
//! sections of the base, current and incoming versions with fuzzy matching,
//! and resolves each pair as clean, preserved, auto-merged or conflicting.
//! Conflicts are rendered as three-part marker blocks that line-oriented
//! tools can find without parsing markdown.
//!
//! # Key Types
//!
//! - [`StructuralMerger`] / [`merge`] -- Section-aware three-way merge
//! - [`MergeOutput`] / [`MergeOutcome`] -- Merged text and per-section resolutions
//! - [`MarkdownSection`] / [`parse_sections`] -- Document segmentation
//! - [`render_conflict_block`] / [`scan_conflict_blocks`] -- Marker format
//! - [`MergeConfig`] -- Matching threshold and heading weight

pub mod config;
pub mod error;
pub mod markers;
pub mod matching;
pub mod section;
pub mod similarity;
pub mod structural;
pub mod three_way;

pub use config::MergeConfig;
pub use error::{ParseError, ParseResult};
pub use markers::{
    has_conflict_markers, render_conflict_block, scan_conflict_blocks, ConflictBlock,
    BASE_MARKER, CURRENT_MARKER, INCOMING_MARKER, NO_BASE_PLACEHOLDER, SEPARATOR_MARKER,
};
pub use section::{parse_sections, render_sections, MarkdownSection};
pub use structural::{merge, MergeOutcome, MergeOutput, SectionResolution, StructuralMerger};
pub use three_way::merge_lines;
