//! Error types for the index crate.

use std::path::PathBuf;

/// Errors that can occur while reading, writing or mutating the manifest.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The manifest was written with a schema this build does not know.
    /// It is never migrated silently.
    #[error("unsupported manifest schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    /// Reading or writing the manifest file failed.
    #[error("manifest I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A path would be both tracked and custom.
    #[error("path is both tracked and custom: {0}")]
    Overlap(String),

    /// The specified path is not tracked.
    #[error("path not tracked: {0}")]
    PathNotFound(String),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
