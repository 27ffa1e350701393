//! Error types.

use thiserror::Error;

/// Failure reported by a [`LineFormatter`](crate::LineFormatter).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The formatter failed on its own terms.
    #[error("formatter failed: {0}")]
    Failed(String),

    /// The returned pieces do not spell out the line.
    #[error("pieces cover {actual} chars but the line has {expected}")]
    Coverage {
        /// Line length in chars.
        expected: usize,
        /// Total length of the returned pieces in chars.
        actual: usize,
    },
}

/// Errors surfaced by the [`Editor`](crate::Editor).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    /// A caller broke an API contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A formatter error the exception reporter did not mark handled.
    #[error(transparent)]
    Format(#[from] FormatError),
}
