//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the legal QA engine, providing structured
//! error types and conversion utilities for all system components.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from various system components
//! - **Output**: Structured error types with context and error chains
//! - **Error Categories**: Validation, Corpus, Storage, Matching, Fallback, Configuration
//!
//! ## Key Features
//! - Clear split between caller-input errors and internal failures
//! - Automatic error conversion and chaining
//! - User-friendly error messages for API responses
//! - Structured logging integration

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, QaError>;

/// Error types for the legal QA engine
#[derive(Debug, Error)]
pub enum QaError {
    /// Rejected caller input on the question-answering path
    #[error("Invalid question: {reason}")]
    InvalidQuestion { reason: String },

    /// Generic caller-input validation failure
    #[error("Validation failed for field '{field}': {reason}")]
    ValidationFailed { field: String, reason: String },

    /// Malformed stored corpus detected at load time
    #[error("Corpus integrity error: {details}")]
    CorpusIntegrity { details: String },

    /// Persistence backend failed to save the corpus
    #[error("Persistence failed ({backend}): {details}")]
    PersistenceFailed { backend: String, details: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Database open/access errors
    #[error("Database connection failed: {db_path} - {reason}")]
    DatabaseConnectionFailed { db_path: String, reason: String },

    /// Serialization/deserialization errors
    #[error("Serialization failed: {message}")]
    SerializationFailed { message: String },

    /// Network-related errors (generative fallback)
    #[error("Network error: {details}")]
    NetworkError { details: String },

    /// Response payload from an external collaborator could not be parsed
    #[error("Failed to parse data from {origin}: {details}")]
    DataParsing { origin: String, details: String },

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl QaError {
    /// Whether the error is caused by caller input (maps to HTTP 400)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            QaError::InvalidQuestion { .. } | QaError::ValidationFailed { .. }
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            QaError::InvalidQuestion { .. } | QaError::ValidationFailed { .. } => "validation",
            QaError::CorpusIntegrity { .. } => "corpus",
            QaError::PersistenceFailed { .. }
            | QaError::DatabaseConnectionFailed { .. }
            | QaError::Database(_)
            | QaError::SerializationFailed { .. } => "storage",
            QaError::NetworkError { .. } | QaError::DataParsing { .. } => "fallback",
            QaError::Config { .. } | QaError::Toml(_) => "configuration",
            QaError::Internal { .. } => "generic",
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for QaError {
    fn from(err: std::io::Error) -> Self {
        QaError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<serde_json::Error> for QaError {
    fn from(err: serde_json::Error) -> Self {
        QaError::SerializationFailed {
            message: format!("JSON serialization error: {}", err),
        }
    }
}

impl From<bincode::Error> for QaError {
    fn from(err: bincode::Error) -> Self {
        QaError::SerializationFailed {
            message: format!("Binary serialization error: {}", err),
        }
    }
}

impl From<reqwest::Error> for QaError {
    fn from(err: reqwest::Error) -> Self {
        QaError::NetworkError {
            details: err.to_string(),
        }
    }
}

// Helper macros for common error patterns
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::errors::QaError::Internal {
            message: $msg.to_string(),
        }
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::errors::QaError::Internal {
            message: format!($fmt, $($arg)*),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($field:expr, $reason:expr) => {
        $crate::errors::QaError::ValidationFailed {
            field: $field.to_string(),
            reason: $reason.to_string(),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_flagged() {
        let err = QaError::InvalidQuestion {
            reason: "empty".to_string(),
        };
        assert!(err.is_client_error());
        assert_eq!(err.category(), "validation");

        let err = QaError::CorpusIntegrity {
            details: "missing question".to_string(),
        };
        assert!(!err.is_client_error());
        assert_eq!(err.category(), "corpus");
    }

    #[test]
    fn data_parsing_origin_is_plain_data() {
        let err = QaError::DataParsing {
            origin: "fallback endpoint".to_string(),
            details: "missing choices".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to parse data from fallback endpoint: missing choices"
        );
        assert_eq!(err.category(), "fallback");
        // The origin labels the collaborator; there is no underlying
        // error value to chain.
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn validation_macro_builds_variant() {
        let err = validation_error!("limit", "must be between 1 and 100");
        assert!(matches!(err, QaError::ValidationFailed { .. }));
        assert!(err.to_string().contains("limit"));
    }
}
