//! Error types for AVMedia
//!
//! This module defines the error type shared by the playback core, the
//! backend adapters and the dispatch layer. We use thiserror for the library
//! error type and anyhow only at the binary's top level.

use thiserror::Error;

/// Main error type for AVMedia
#[derive(Error, Debug)]
pub enum AvMediaError {
    /// Malformed source locator, surfaced before any state change
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// Decode/open failure reported by the media backend
    #[error("Backend error: {0}")]
    Backend(String),

    /// Command referenced an unknown or disposed session
    #[error("Session not found: {0}")]
    NotFound(i64),

    /// Invalid command argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Method name not understood by the dispatcher
    #[error("Method not implemented: {0}")]
    NotImplemented(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// Malformed method call or event payload
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AvMediaError {
    /// Create a backend error from string
    pub fn backend_error<S: Into<String>>(msg: S) -> Self {
        AvMediaError::Backend(msg.into())
    }

    /// Whether the error was caused by caller input rather than the backend
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AvMediaError::InvalidSource(_) | AvMediaError::InvalidInput(_) | AvMediaError::NotFound(_)
        )
    }
}

/// Convenience type alias for Results in AVMedia
pub type Result<T> = std::result::Result<T, AvMediaError>;

/// Extension trait for converting other errors to AvMediaError
pub trait IntoMediaError<T> {
    /// Convert this error into a configuration error with the given context
    fn config_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoMediaError<T> for std::result::Result<T, E> {
    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| AvMediaError::Config(format!("{}: {}", context, e)))
    }
}
