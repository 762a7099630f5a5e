//! Conflict reporting for Stencil.
//!
//! Small files get inline three-part marker blocks. Large files get a
//! markdown report listing only the changed line sections, so the user does
//! not have to scroll through two copies of a long file to find a handful
//! of edits. [`ConflictResolver`] chains the structural merger in front of
//! both, falling back one tier at a time.
//!
//! # Key Types
//!
//! - [`ConflictResolver`] -- Structural merge, then size-adaptive reporting
//! - [`ConflictReporter`] -- Inline markers or diff report by line count
//! - [`Resolution`] / [`ResolutionArtifact`] / [`Fallback`] -- What was produced and why
//! - [`LineDiff`] / [`DiffSection`] / [`UnchangedRange`] -- Padded line sections
//! - [`ConflictReport`] -- Markdown rendering of a [`LineDiff`]
//! - [`ReportConfig`] -- Size limit, context padding and report naming

pub mod config;
pub mod error;
pub mod report;
pub mod resolve;
pub mod sections;

pub use config::ReportConfig;
pub use error::{DiffError, DiffResult};
pub use report::ConflictReport;
pub use resolve::{
    inline_markers, is_markdown, ConflictReporter, ConflictResolver, Fallback, Resolution,
    ResolutionArtifact,
};
pub use sections::{line_sections, DiffSection, LineDiff, LineSpan, UnchangedRange};
