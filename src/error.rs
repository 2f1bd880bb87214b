//! Unified error hierarchy for atdsrs
//!
//! Provides a structured error type system with context preservation and
//! integration with the tracing system.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all atdsrs operations
#[derive(Debug, Error)]
pub enum AtdsError {
    /// Recording import errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Result export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV (de)serialization errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Recording import specific errors
#[derive(Debug, Error)]
pub enum ImportError {
    /// File not found at specified path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Unsupported recording format
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// Format-specific parsing error
    #[error("Parse error in {format}: {reason}")]
    ParseError { format: String, reason: String },

    /// File parsed but contained no usable intervals
    #[error("No valid RR intervals in {path}")]
    NoValidSamples { path: PathBuf },

    /// Missing required data
    #[error("Missing required data: {field}")]
    MissingData { field: String },

    /// Invalid data structure
    #[error("Invalid data structure: {reason}")]
    InvalidStructure { reason: String },
}

/// Result export errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// Unsupported format
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// Export failed
    #[error("Export failed to {path}: {reason}")]
    ExportFailed { path: PathBuf, reason: String },

    /// Nothing to export
    #[error("No data to export: {reason}")]
    NoData { reason: String },
}

/// Result type alias for atdsrs operations
pub type Result<T> = std::result::Result<T, AtdsError>;

impl AtdsError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AtdsError::Import(ImportError::FileNotFound { .. }) => ErrorSeverity::Warning,
            AtdsError::Import(ImportError::NoValidSamples { .. }) => ErrorSeverity::Warning,
            AtdsError::Validation(_) => ErrorSeverity::Warning,
            AtdsError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AtdsError::Import(ImportError::FileNotFound { path }) => {
                format!("Could not find recording file: {}", path.display())
            }
            AtdsError::Import(ImportError::NoValidSamples { path }) => {
                format!(
                    "No usable RR intervals found in {}. Check that the file contains interval data in milliseconds.",
                    path.display()
                )
            }
            AtdsError::Import(ImportError::UnsupportedFormat { format }) => {
                format!(
                    "The format '{}' is not supported. Supported formats: txt, csv, atds.",
                    format
                )
            }
            AtdsError::Configuration(reason) => {
                format!("Configuration problem: {}. Try 'config init' to recreate it.", reason)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
