//! Collaborator interfaces for the two destination services

use crate::errors::Result;
use crate::severity::Severity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// One entry for the log ingestion service.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub payload: String,
    pub labels: HashMap<String, String>,
}

/// The error carried by a report. Only its text is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportedError {
    message: String,
}

impl ReportedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ReportedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ReportedError {}

/// One report for the error aggregation service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorReport {
    pub error: ReportedError,
    pub stack_trace: String,
    /// Identifier of the affected user, empty when unknown
    pub user: String,
}

impl ErrorReport {
    pub fn error_text(&self) -> String {
        self.error.to_string()
    }
}

/// Accepts log entries. Implementations own transport, batching and retries.
pub trait LogSink: Send + Sync {
    fn submit(&self, entry: LogEntry) -> Result<()>;
}

/// Accepts error reports. Implementations own transport, batching and retries.
pub trait ErrorSink: Send + Sync {
    fn submit(&self, report: ErrorReport) -> Result<()>;
}
