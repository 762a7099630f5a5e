//! Error types for the diff crate.

/// Reasons a line-section diff cannot be computed.
///
/// Every variant is recoverable: the reporter falls back to inline markers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// One side has more lines than the configured diff limit.
    #[error("input too large to diff: {lines} lines (limit {limit})")]
    TooLarge { lines: usize, limit: usize },

    /// The diff did not finish within the configured time budget.
    #[error("diff did not finish within {ms} ms")]
    Timeout { ms: u64 },

    /// One side contains NUL bytes and is not line-oriented text.
    #[error("binary content cannot be diffed by line")]
    Binary,
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
