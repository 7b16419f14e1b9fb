//! Error handling for the `quillt` CLI.
//!
//! Mirrors `faxt::error`'s shape: one `thiserror` enum with `#[from]`
//! conversions for the IO/serialization boundaries the CLI actually
//! crosses.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuilltError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("program file error: {0}")]
    ProgramFile(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("the program raised an unhandled error: {0}")]
    Unhandled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QuilltError>;
