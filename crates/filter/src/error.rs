//! Filter parse errors

use thiserror::Error;

/// Malformed filter text
///
/// `line` is 1-based and `column` 0-based, both measured in the text as
/// the parser sees it: input that does not start with the `WHERE` keyword
/// is read as if prefixed by `"WHERE "`, so a column points 6 characters
/// past the same position in the raw input. Errors are plain values and
/// are cached alongside successful parses, so the same malformed text
/// always produces an equal error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Line: {line}:{column}, Error: {message}")]
pub struct FilterParseError {
    /// Line of the offending token (1-based)
    pub line: usize,
    /// Column of the offending token (0-based)
    pub column: usize,
    /// Human-readable description
    pub message: String,
}

impl FilterParseError {
    pub(crate) fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Result type alias for filter parsing
pub type FilterResult<T> = Result<T, FilterParseError>;
