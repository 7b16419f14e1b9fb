//! Core error types for the quillc-util crate.

use thiserror::Error;

/// Error type for symbol interning operations.
#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("failed to intern symbol: {0}")]
    InternFailed(String),

    #[error("symbol not found: index {index}")]
    NotFound { index: u32 },
}

/// Error type for index vector operations.
#[derive(Debug, Error)]
pub enum IndexVecError {
    #[error("index out of bounds: index {index}, length {length}")]
    OutOfBounds { index: usize, length: usize },

    #[error("invalid index: {0}")]
    InvalidIndex(String),
}

/// Result type alias for symbol operations.
pub type SymbolResult<T> = std::result::Result<T, SymbolError>;

/// Result type alias for index vector operations.
pub type IndexVecResult<T> = std::result::Result<T, IndexVecError>;
