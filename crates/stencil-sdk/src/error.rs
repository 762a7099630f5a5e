use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by an [`UpstreamProvider`](crate::UpstreamProvider).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("release not found: {0}")]
    VersionNotFound(String),

    #[error("cannot read upstream file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot list upstream release at {}: {message}", path.display())]
    Listing { path: PathBuf, message: String },

    #[error("upstream path escapes the project root: {0}")]
    InvalidPath(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("hash error: {0}")]
    Hash(#[from] stencil_hash::HashError),

    #[error("fingerprint error: {0}")]
    Fingerprint(#[from] stencil_fingerprint::FingerprintError),

    #[error("manifest error: {0}")]
    Index(#[from] stencil_index::IndexError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest not found at {}", .0.display())]
    NotInitialized(PathBuf),

    #[error("no fingerprint database configured; cannot detect the installed release")]
    NoDatabase,
}

pub type SdkResult<T> = Result<T, SdkError>;
