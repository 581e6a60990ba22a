//! Error handling for EventHub
//!
//! This module defines the main error type used throughout the crate
//! and provides a unified error handling strategy. Stores surface only the
//! rendered message of an error; callers of store operations receive the
//! typed value.

use thiserror::Error;

/// Main error type for EventHub
#[derive(Error, Debug)]
pub enum EventHubError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{message}")]
    Remote { status: Option<u16>, message: String },

    #[error("Record not found in {table}: {id}")]
    NotFound { table: String, id: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Change feed closed")]
    FeedClosed,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Result type alias for EventHub operations
pub type Result<T> = std::result::Result<T, EventHubError>;

impl EventHubError {
    /// Build a remote failure without an HTTP status (in-process backends)
    pub fn remote(message: impl Into<String>) -> Self {
        EventHubError::Remote {
            status: None,
            message: message.into(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            EventHubError::Http(_) => true,
            EventHubError::Serialization(_) => false,
            EventHubError::Io(_) => true,
            EventHubError::UrlParse(_) => false,
            EventHubError::ConfigLoad(_) => false,
            EventHubError::Config(_) => false,
            EventHubError::Remote { status, .. } => matches!(status, None | Some(500..=599)),
            EventHubError::NotFound { .. } => false,
            EventHubError::Authentication(_) => false,
            EventHubError::PermissionDenied(_) => false,
            EventHubError::InvalidInput(_) => false,
            EventHubError::FeedClosed => true,
            EventHubError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EventHubError::ConfigLoad(_) => ErrorSeverity::Critical,
            EventHubError::Config(_) => ErrorSeverity::Critical,
            EventHubError::PermissionDenied(_) => ErrorSeverity::Warning,
            EventHubError::Authentication(_) => ErrorSeverity::Warning,
            EventHubError::NotFound { .. } => ErrorSeverity::Warning,
            EventHubError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Whether the error was raised locally before any remote call was made
    pub fn is_local(&self) -> bool {
        matches!(self, EventHubError::InvalidInput(_) | EventHubError::PermissionDenied(_))
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_renders_message_only() {
        let err = EventHubError::Remote {
            status: Some(400),
            message: "duplicate key value".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate key value");
    }

    #[test]
    fn test_recoverability() {
        assert!(EventHubError::remote("timeout").is_recoverable());
        assert!(EventHubError::Remote { status: Some(503), message: "down".into() }.is_recoverable());
        assert!(!EventHubError::Remote { status: Some(403), message: "rls".into() }.is_recoverable());
        assert!(!EventHubError::InvalidInput("empty".into()).is_recoverable());
    }

    #[test]
    fn test_severity() {
        assert_eq!(EventHubError::Config("x".into()).severity(), ErrorSeverity::Critical);
        assert_eq!(EventHubError::InvalidInput("x".into()).severity(), ErrorSeverity::Info);
        assert_eq!(EventHubError::FeedClosed.severity(), ErrorSeverity::Error);
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
    }
}
