//! High-level SDK for Stencil.
//!
//! Provides the update cycle that ties the other crates together: detect
//! or bootstrap the project's manifest, reconcile it against a release,
//! apply the decisions, and record the result. This is the main entry
//! point for applications embedding Stencil.
//!
//! # Key Types
//!
//! - [`Updater`] -- Runs one update cycle for a project root
//! - [`UpdateReport`] / [`FileReport`] -- Per-file outcome of a cycle
//! - [`UpstreamProvider`] -- Boundary to wherever releases come from
//! - [`DirectoryProvider`] / [`InMemoryProvider`] -- Provided implementations
//! - [`ListingCache`] -- Memoized release listings
//! - [`UpdaterConfig`] -- Paths, algorithm and tuning, loadable from TOML

pub mod cache;
pub mod config;
pub mod error;
pub mod provider;
pub mod report;
pub mod updater;

pub use cache::ListingCache;
pub use config::UpdaterConfig;
pub use error::{ProviderError, ProviderResult, SdkError, SdkResult};
pub use provider::{DirectoryProvider, InMemoryProvider, UpstreamProvider};
pub use report::{FileAction, FileReport, FileStatus, UpdateReport};
pub use updater::Updater;

// Re-export key types
pub use stencil_diff::{ConflictResolver, ReportConfig};
pub use stencil_fingerprint::{Confidence, FingerprintDatabase, VersionMatch};
pub use stencil_index::{CycleSummary, Manifest, ReconcilePlan};
pub use stencil_merge::MergeConfig;
pub use stencil_types::{HashAlgorithm, NormalizedHash, ReleaseVersion, UpstreamVersion};
