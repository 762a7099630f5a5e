//! Tracked-file lifecycle for Stencil.
//!
//! Keeps the manifest of files a project received from upstream, derives
//! which of them the user has customized, and turns the file list of a new
//! upstream release into a plan of adds, updates, removals and merges.
//!
//! # Key Types
//!
//! - [`Manifest`] -- Persistent record of tracked and custom files
//! - [`TrackedFile`] / [`OriginalHash`] -- One upstream-governed file
//! - [`ReconcilePlan`] / [`reconcile`] -- Per-cycle decisions
//! - [`CycleSummary`] / [`HistoryEntry`] -- What each cycle did

pub mod entry;
pub mod error;
pub mod manifest;
pub mod reconcile;

pub use entry::{classify, OriginalHash, TrackedFile};
pub use error::{IndexError, IndexResult};
pub use manifest::{
    AppliedCycle, CycleKind, CycleSummary, HistoryEntry, Manifest, MANIFEST_SCHEMA_VERSION,
};
pub use reconcile::{reconcile, MergeBase, ReconcilePlan};
