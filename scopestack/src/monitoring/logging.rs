//! Structured logging infrastructure for scopestack.
//!
//! Log entries carry a component, an operation label and arbitrary JSON
//! fields, and are emitted through `tracing` as a single JSON payload so
//! every lifecycle record has the same shape.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::Level;

/// Log level enumeration for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Very fine-grained records
    Trace,
    /// Lifecycle steps
    Debug,
    /// Notable events
    Info,
    /// Observed failures
    Warn,
    /// Failures that could not be reported any other way
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Structured log entry with consistent format
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Timestamp of the log entry
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Component that generated the log
    pub component: String,
    /// Operation being performed
    pub operation: String,
    /// Structured fields
    pub fields: BTreeMap<String, Value>,
    /// Error information if applicable
    pub error: Option<String>,
}

impl LogEntry {
    /// Creates a new log entry
    pub fn new(level: LogLevel, message: &str, component: &str, operation: &str) -> Self {
        Self {
            level,
            message: message.to_string(),
            timestamp: chrono::Utc::now(),
            component: component.to_string(),
            operation: operation.to_string(),
            fields: BTreeMap::new(),
            error: None,
        }
    }

    /// Adds a field to the log entry
    #[must_use]
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Adds error information
    #[must_use]
    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Converts to JSON for structured output
    pub fn to_json(&self) -> Value {
        let mut json_obj = json!({
            "level": format!("{:?}", self.level).to_lowercase(),
            "message": self.message,
            "timestamp": self.timestamp.to_rfc3339(),
            "component": self.component,
            "operation": self.operation,
            "fields": self.fields
        });

        if let Some(error) = &self.error {
            json_obj["error"] = json!(error);
        }

        json_obj
    }

    /// Logs the entry using tracing
    #[allow(clippy::cognitive_complexity)]
    pub fn log(&self) {
        let json_str = self.to_json().to_string();

        match self.level {
            LogLevel::Trace => tracing::trace!("{}", json_str),
            LogLevel::Debug => tracing::debug!("{}", json_str),
            LogLevel::Info => tracing::info!("{}", json_str),
            LogLevel::Warn => tracing::warn!("{}", json_str),
            LogLevel::Error => tracing::error!("{}", json_str),
        }
    }
}

/// Structured logger for one component
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    component: String,
    default_fields: BTreeMap<String, Value>,
}

impl StructuredLogger {
    /// Creates a new structured logger for a component
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            default_fields: BTreeMap::new(),
        }
    }

    /// Adds a default field that will be included in all log entries
    #[must_use]
    pub fn with_default_field(mut self, key: &str, value: Value) -> Self {
        self.default_fields.insert(key.to_string(), value);
        self
    }

    /// Component name
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Creates a log entry with default fields, without emitting it
    pub fn entry(&self, level: LogLevel, operation: &str, message: &str) -> LogEntry {
        let mut entry = LogEntry::new(level, message, &self.component, operation);

        for (key, value) in &self.default_fields {
            entry = entry.with_field(key, value.clone());
        }

        entry
    }

    /// Debug-level entry, to be completed and emitted by the caller
    pub fn debug_entry(&self, operation: &str, message: &str) -> LogEntry {
        self.entry(LogLevel::Debug, operation, message)
    }

    /// Info-level entry, to be completed and emitted by the caller
    pub fn info_entry(&self, operation: &str, message: &str) -> LogEntry {
        self.entry(LogLevel::Info, operation, message)
    }

    /// Warn-level entry, to be completed and emitted by the caller
    pub fn warn_entry(&self, operation: &str, message: &str) -> LogEntry {
        self.entry(LogLevel::Warn, operation, message)
    }

    /// Error-level entry, to be completed and emitted by the caller
    pub fn error_entry(&self, operation: &str, message: &str) -> LogEntry {
        self.entry(LogLevel::Error, operation, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_creation() {
        let entry = LogEntry::new(LogLevel::Info, "resource acquired", "scopestack", "acquire");

        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.message, "resource acquired");
        assert_eq!(entry.component, "scopestack");
        assert_eq!(entry.operation, "acquire");
        assert!(entry.fields.is_empty());
        assert!(entry.error.is_none());
    }

    #[test]
    fn test_log_entry_json_serialization() {
        let entry = LogEntry::new(LogLevel::Warn, "resource release failed", "scopestack", "release_failed")
            .with_field("resource", json!("journal"))
            .with_error("disk full");

        let json = entry.to_json();
        assert_eq!(json["level"], "warn");
        assert_eq!(json["operation"], "release_failed");
        assert_eq!(json["fields"]["resource"], "journal");
        assert_eq!(json["error"], "disk full");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_structured_logger_default_fields() {
        let logger = StructuredLogger::new("batch").with_default_field("scenario", json!("C"));
        let entry = logger.warn_entry("scope_exit", "scope exited with a failure");

        assert_eq!(logger.component(), "batch");
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.fields.get("scenario"), Some(&json!("C")));
    }

    #[test]
    fn test_level_conversion() {
        assert_eq!(Level::from(LogLevel::Debug), Level::DEBUG);
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
    }
}
