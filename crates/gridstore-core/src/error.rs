//! Error types for gridstore-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the gridstore storage layer
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell reference format
    #[error("Invalid cell reference: {0}")]
    InvalidAddress(String),

    /// Invalid cell range format
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u16, u16),

    /// Invalid label name
    #[error("Invalid label name: {0}")]
    InvalidName(String),

    /// A generic store operation that has no meaning for this store
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Saving a label mapping would create a resolution cycle
    #[error("Cycle detected in label resolution: {}", chain.join(" -> "))]
    CycleDetected {
        /// The label hops that close the cycle, in walk order
        chain: Vec<String>,
    },

    /// Resolution or `load_or_fail` on an absent label
    #[error("Label not found: {0}")]
    LabelNotFound(String),
}

impl Error {
    /// Create a cycle error from the chain of label names that closes it
    pub fn cycle<I, S>(chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Error::CycleDetected {
            chain: chain.into_iter().map(Into::into).collect(),
        }
    }
}
