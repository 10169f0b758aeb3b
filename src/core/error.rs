//! Error types for the logger system

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Transport name matched neither a built-in sink nor a registered module
    #[error("unable to load logging module {name}: {message}")]
    UnknownTransport { name: String, message: String },

    /// Sink constructor rejected its configuration
    #[error("failed to construct transport '{name}': {message}")]
    SinkConstruction { name: String, message: String },

    /// Sink failed while writing a record
    #[error("transport '{name}' failed to write: {message}")]
    SinkWrite { name: String, message: String },

    /// Sink panicked inside the isolation boundary
    #[error("transport '{name}' panicked during {operation}: {message}")]
    SinkPanicked {
        name: String,
        operation: String,
        message: String,
    },

    /// Level name outside the severity table
    #[error("unknown severity level: '{0}'")]
    UnknownSeverity(String),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML configuration error
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create a resolution error for an unknown transport
    pub fn unknown_transport(name: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::UnknownTransport {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a sink construction error
    pub fn construction(name: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkConstruction {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a sink write error
    pub fn write(name: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkWrite {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn panicked(
        name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LoggerError::SinkPanicked {
            name: name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Short kind label used in error events
    pub fn kind(&self) -> &'static str {
        match self {
            LoggerError::UnknownTransport { .. } => "InvalidLogType",
            LoggerError::SinkConstruction { .. } => "SinkConstructionError",
            LoggerError::SinkWrite { .. } => "SinkWriteError",
            LoggerError::SinkPanicked { .. } => "SinkPanic",
            LoggerError::UnknownSeverity(_) => "UnknownSeverityError",
            LoggerError::InvalidConfiguration { .. } => "ConfigurationError",
            LoggerError::IoOperation { .. } | LoggerError::IoError(_) => "IoError",
            LoggerError::JsonError(_) => "JsonError",
            LoggerError::TomlError(_) => "TomlError",
            LoggerError::Other(_) => "Error",
        }
    }
}

/// Notification published on the error channel when a transport misbehaves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportErrorEvent {
    /// Transport name the failure belongs to
    pub name: String,
    pub message: String,
    /// Error kind followed by its `source()` chain, one cause per line
    pub stack: String,
}

impl TransportErrorEvent {
    pub fn new(name: impl Into<String>, error: &LoggerError) -> Self {
        let mut stack = format!("{}: {}", error.kind(), error);
        let mut cause = error.source();
        while let Some(inner) = cause {
            stack.push_str("\n    caused by: ");
            stack.push_str(&inner.to_string());
            cause = inner.source();
        }

        Self {
            name: name.into(),
            message: error.to_string(),
            stack,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::unknown_transport("bogus", "no built-in sink");
        assert!(matches!(err, LoggerError::UnknownTransport { .. }));

        let err = LoggerError::config("file", "missing filename");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::write("stdout", "broken pipe");
        assert!(matches!(err, LoggerError::SinkWrite { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::unknown_transport("bogus", "no built-in sink or module");
        assert_eq!(
            err.to_string(),
            "unable to load logging module bogus: no built-in sink or module"
        );

        let err = LoggerError::UnknownSeverity("loud".to_string());
        assert_eq!(err.to_string(), "unknown severity level: 'loud'");

        let err = LoggerError::panicked("file", "write", "boom");
        assert_eq!(
            err.to_string(),
            "transport 'file' panicked during write: boom"
        );
    }

    #[test]
    fn test_event_carries_source_chain() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = LoggerError::io_operation("opening log file", "cannot open", io_err);

        let event = TransportErrorEvent::new("file", &err);
        assert_eq!(event.name, "file");
        assert!(event.message.contains("opening log file"));
        assert!(event.stack.starts_with("IoError:"));
        assert!(event.stack.contains("caused by: access denied"));
    }
}
