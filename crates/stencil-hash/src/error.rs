//! Error types for the hash crate.

use std::path::PathBuf;

/// Errors that can occur while hashing files.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// The file could not be read (missing, locked, permission denied).
    #[error("cannot hash {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// The path whose hash could not be computed.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Read { path, .. } => path,
        }
    }
}

/// Convenience alias for hash results.
pub type HashResult<T> = Result<T, HashError>;
