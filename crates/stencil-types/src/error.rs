use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex digest: {0}")]
    InvalidHex(String),

    #[error("invalid digest length for {algorithm}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        algorithm: String,
        expected: usize,
        actual: usize,
    },

    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("malformed hash string (expected ALGORITHM:HEX): {0}")]
    MalformedHash(String),

    #[error("empty release version")]
    EmptyVersion,
}
