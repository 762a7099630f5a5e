//! Error types for the fingerprint crate.

use std::path::PathBuf;

/// Errors that halt version detection.
///
/// Unlike an inconclusive match, none of these has a safe default: without
/// a trustworthy database there is nothing to compare against.
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// The database file is missing or unreadable.
    #[error("fingerprint database unavailable at {}: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The database could not be parsed or failed validation.
    #[error("fingerprint database is corrupt: {0}")]
    Corrupt(String),

    /// The database was written with a schema this build does not know.
    #[error("unsupported fingerprint database schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    /// The database contains no releases.
    #[error("fingerprint database contains no releases")]
    Empty,
}

/// Convenience alias for fingerprint results.
pub type FingerprintResult<T> = Result<T, FingerprintError>;
