//! Error types for the slice pipeline.
//!
//! Data problems (missing fields, malformed rows, empty slices) are not
//! errors here: they travel as [`Diagnostic`](crate::records::Diagnostic)
//! values next to the data. Only caller mistakes and structurally invalid
//! datasets surface as `Err`.

use thiserror::Error;

/// Result type alias for navigation operations.
pub type Result<T> = std::result::Result<T, NavigationError>;

/// Errors raised by the time navigator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// The dataset has no periods at all, so there is nothing to navigate.
    #[error("dataset contains no periods")]
    NoPeriods,

    /// A period label that is not part of the sorted period sequence.
    #[error("unknown period: {0}")]
    UnknownPeriod(String),
}
