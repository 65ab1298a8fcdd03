//! Error types for sqlsplice.
//!
//! Only caller-facing failures live here. Broken internal invariants
//! (a placeholder that cannot resolve, an edit splitting a placeholder)
//! panic instead, since no public operation can produce them.

use thiserror::Error;

/// The main error type for sqlsplice operations.
#[derive(Debug, Error)]
pub enum SpliceError {
    /// Malformed format string handed to [`Template::format`](crate::Template::format).
    #[error("Format error at position {position}: {message}")]
    Format { position: usize, message: String },

    /// A format string references an argument that was not supplied.
    #[error("Missing argument {index} (only {available} supplied)")]
    MissingArgument { index: usize, available: usize },

    /// An argument was supplied but never referenced.
    #[error("Argument {0} is never used")]
    UnusedArgument(usize),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpliceError {
    /// Create a format error at the given position.
    pub fn format(position: usize, message: impl Into<String>) -> Self {
        Self::Format {
            position,
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for SpliceError {
    fn from(e: toml::de::Error) -> Self {
        SpliceError::Config(e.to_string())
    }
}

/// Result type alias for sqlsplice operations.
pub type SpliceResult<T> = Result<T, SpliceError>;
