//! Version fingerprinting for Stencil.
//!
//! Matches the hashes of a project's tracked files against a database of
//! per-release signatures to infer which upstream release the project was
//! installed from, and which tracked files were edited since.
//!
//! # Key Types
//!
//! - [`FingerprintDatabase`] -- Per-release path hashes plus the signature subset
//! - [`detect_version`] -- Pure matcher over precomputed hash maps
//! - [`VersionMatch`] / [`Confidence`] -- Detection outcome
//! - [`HashCache`] -- Caller-owned memo of local file hashes

pub mod cache;
pub mod database;
pub mod error;
pub mod matcher;

pub use cache::HashCache;
pub use database::{FingerprintDatabase, DATABASE_SCHEMA_VERSION};
pub use error::{FingerprintError, FingerprintResult};
pub use matcher::{detect_version, Confidence, VersionMatch};
