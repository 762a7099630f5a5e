//! Error types for the merge crate.

/// A document could not be segmented into sections.
///
/// Recoverable: callers fall back to whole-file conflict handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A fenced code block opened at `line` (1-based) is never closed, so
    /// heading boundaries after it cannot be trusted.
    #[error("unterminated code fence opened at line {line}")]
    UnterminatedFence { line: usize },
}

/// Convenience alias for parse results.
pub type ParseResult<T> = Result<T, ParseError>;
