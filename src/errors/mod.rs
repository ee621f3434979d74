//! Domain-specific error types for the fleet load driver
//!
//! This module provides structured error types using `thiserror` for
//! precise and ergonomic error handling throughout the application.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the load driver
#[derive(Error, Debug)]
pub enum LoadError {
    /// Configuration-related errors (CLI parsing, validation, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network transport errors (connection, protocol, etc.)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The control plane answered with a non-success status
    #[error("Control plane returned {status}: {body}")]
    Api { status: u16, body: String },

    /// A snapshot lacks a field the flow cannot continue without
    #[error("Resource snapshot is missing field '{0}'")]
    MissingField(&'static str),

    /// A poller deadline elapsed before the predicate held
    #[error("Timed out after {elapsed:?} waiting for {what}")]
    Timeout { what: String, elapsed: Duration },

    /// Metrics sink failures (collector unreachable, write errors)
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization errors
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// Socket and other I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type using LoadError
pub type Result<T> = std::result::Result<T, LoadError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_config_context(self, msg: &str) -> Result<T>;
    fn with_transport_context(self, msg: &str) -> Result<T>;
    fn with_telemetry_context(self, msg: &str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn with_config_context(self, msg: &str) -> Result<T> {
        self.map_err(|e| LoadError::Config(format!("{}: {}", msg, e)))
    }

    fn with_transport_context(self, msg: &str) -> Result<T> {
        self.map_err(|e| LoadError::Transport(format!("{}: {}", msg, e)))
    }

    fn with_telemetry_context(self, msg: &str) -> Result<T> {
        self.map_err(|e| LoadError::Telemetry(format!("{}: {}", msg, e)))
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn with_config_context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| LoadError::Config(msg.to_string()))
    }

    fn with_transport_context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| LoadError::Transport(msg.to_string()))
    }

    fn with_telemetry_context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| LoadError::Telemetry(msg.to_string()))
    }
}

// Convenience constructors
impl LoadError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        LoadError::Config(msg.into())
    }

    pub fn timeout<S: Into<String>>(what: S, elapsed: Duration) -> Self {
        LoadError::Timeout {
            what: what.into(),
            elapsed,
        }
    }

    /// Whether the error came from a poller deadline
    #[cfg(test)]
    pub fn is_timeout(&self) -> bool {
        matches!(self, LoadError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_context_maps_to_variant() {
        let missing: Option<u32> = None;
        let err = missing.with_telemetry_context("no collector").unwrap_err();
        assert!(matches!(err, LoadError::Telemetry(ref m) if m == "no collector"));
    }

    #[test]
    fn test_result_context_keeps_source_message() {
        let failed: std::result::Result<(), &str> = Err("refused");
        let err = failed.with_transport_context("connect").unwrap_err();
        assert_eq!(err.to_string(), "Transport error: connect: refused");
    }

    #[test]
    fn test_timeout_is_distinguishable() {
        let err = LoadError::timeout("fleet readiness", Duration::from_secs(3));
        assert!(err.is_timeout());
        assert!(!LoadError::config("x").is_timeout());
    }
}
