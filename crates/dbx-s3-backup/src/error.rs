//! Error types for the backup library.

use thiserror::Error;

/// Main error type for backup operations.
#[derive(Error, Debug)]
pub enum BackupError {
    /// Configuration error (missing environment variable, invalid value, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source storage listing or download error
    #[error("Source error for '{path}': {message}")]
    Source { path: String, message: String },

    /// Destination storage probe or write error
    #[error("Destination error for '{key}': {message}")]
    Destination { key: String, message: String },

    /// Transfer failed for a specific object after all strategies
    #[error("Transfer failed for '{path}': {message}")]
    Transfer { path: String, message: String },

    /// Malformed schedule expression
    #[error("Invalid schedule expression: {0}")]
    Schedule(String),

    /// A bounded network call exceeded its deadline
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// Notification delivery error
    #[error("Notification error: {0}")]
    Notify(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error (staging file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackupError {
    /// Create a Source error for a remote path.
    pub fn source(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        BackupError::Source {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a Destination error for an object key.
    pub fn destination(key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        BackupError::Destination {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Create a Transfer error for a remote path.
    pub fn transfer(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        BackupError::Transfer {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a Timeout error for a named operation.
    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        BackupError::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for backup operations.
pub type Result<T> = std::result::Result<T, BackupError>;
