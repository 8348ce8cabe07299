//! Error types for the I/O edges of the crate
//!
//! The engine itself never fails; these errors cover reading workout files,
//! loading configuration and parsing athlete settings.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for trainload operations
#[derive(Debug, Error)]
pub enum TrainLoadError {
    /// Workout import errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reader errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timezone setting could not be parsed
    #[error("Invalid timezone offset: {0}")]
    InvalidTimezone(String),
}

/// Workout import errors
#[derive(Debug, Error)]
pub enum ImportError {
    /// File not found at specified path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// File extension not recognised
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// CSV header lacks a required column
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    /// Whole document could not be read
    #[error("Invalid document: {reason}")]
    InvalidDocument { reason: String },
}

/// Result type alias for trainload operations
pub type Result<T> = std::result::Result<T, TrainLoadError>;

impl TrainLoadError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TrainLoadError::Import(ImportError::FileNotFound { .. }) => ErrorSeverity::Warning,
            TrainLoadError::InvalidTimezone(_) => ErrorSeverity::Warning,
            TrainLoadError::Configuration(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            TrainLoadError::Import(ImportError::FileNotFound { path }) => {
                format!("Could not find workout file: {}", path.display())
            }
            TrainLoadError::Import(ImportError::UnsupportedFormat { format }) => {
                format!("Workout files must be .json or .csv, got '{}'", format)
            }
            TrainLoadError::Import(ImportError::MissingColumn { column }) => {
                format!("The workout CSV needs a '{}' column", column)
            }
            TrainLoadError::InvalidTimezone(value) => {
                format!("'{}' is not a UTC offset. Use a value like +02:00 or -05:30", value)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Critical,
    Error,
    Warning,
}
