//! Hooks that relay log events to the logging and error reporting sinks

use crate::errors::Result;
use crate::event::{FieldValue, LogEvent, SeverityLevel};
use crate::severity::{DEFAULT_ERROR_LEVELS, DEFAULT_LOG_LEVELS, SeverityFilter, severity_for};
use crate::sink::{ErrorReport, ErrorSink, LogEntry, LogSink, ReportedError};
use crate::stack::{BacktraceCapture, StackCapture, StackSanitizer};
use std::collections::HashMap;
use std::sync::Arc;

/// Field holding the affected user's identifier
pub const USER_FIELD: &str = "user";

/// Plugin point called by a pipeline for every emitted event.
///
/// The pipeline calls `accept` first and only calls `handle` when it
/// returns true. Errors from `handle` belong to the pipeline.
pub trait Hook: Send + Sync {
    /// Short name used when reporting failures
    fn name(&self) -> &'static str;

    fn filter(&self) -> &SeverityFilter;

    fn levels(&self) -> Vec<SeverityLevel> {
        self.filter().levels()
    }

    fn accept(&self, event: &LogEvent) -> bool {
        self.filter().accepts(event.level)
    }

    fn handle(&self, event: &LogEvent) -> Result<()>;
}

/// Destination sink plus the levels forwarded to it.
pub struct ForwarderConfig<K: ?Sized> {
    pub sink: Arc<K>,
    pub filter: SeverityFilter,
}

impl<K: ?Sized> ForwarderConfig<K> {
    pub fn new(sink: Arc<K>, filter: SeverityFilter) -> Self {
        Self { sink, filter }
    }
}

/// Sends events to the log ingestion service.
pub struct LogForwarder {
    config: ForwarderConfig<dyn LogSink>,
}

impl LogForwarder {
    /// Forward warn and info events.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self::with_levels(sink, Vec::new())
    }

    /// Forward `levels`, or the defaults when `levels` is empty.
    pub fn with_levels(sink: Arc<dyn LogSink>, levels: Vec<SeverityLevel>) -> Self {
        Self {
            config: ForwarderConfig::new(
                sink,
                SeverityFilter::or_default(Some(levels), &DEFAULT_LOG_LEVELS),
            ),
        }
    }

    /// Map an event to the entry the log sink receives.
    pub fn to_entry(&self, event: &LogEvent) -> LogEntry {
        LogEntry {
            timestamp: event.timestamp,
            severity: severity_for(event.level),
            payload: event.message.clone(),
            labels: labels_for(&event.fields),
        }
    }

    /// Submit the event's entry to the log sink.
    pub fn forward(&self, event: &LogEvent) -> Result<()> {
        self.config.sink.submit(self.to_entry(event))
    }
}

impl Hook for LogForwarder {
    fn name(&self) -> &'static str {
        "log"
    }

    fn filter(&self) -> &SeverityFilter {
        &self.config.filter
    }

    fn handle(&self, event: &LogEvent) -> Result<()> {
        self.forward(event)
    }
}

/// Sends events to the error aggregation service with a trimmed stack.
pub struct ErrorForwarder {
    config: ForwarderConfig<dyn ErrorSink>,
    capture: Box<dyn StackCapture>,
    sanitizer: StackSanitizer,
}

impl ErrorForwarder {
    /// Forward panic, fatal and error events.
    pub fn new(sink: Arc<dyn ErrorSink>) -> Self {
        Self::with_levels(sink, Vec::new())
    }

    /// Forward `levels`, or the defaults when `levels` is empty.
    pub fn with_levels(sink: Arc<dyn ErrorSink>, levels: Vec<SeverityLevel>) -> Self {
        Self {
            config: ForwarderConfig::new(
                sink,
                SeverityFilter::or_default(Some(levels), &DEFAULT_ERROR_LEVELS),
            ),
            capture: Box::new(BacktraceCapture),
            sanitizer: StackSanitizer::default(),
        }
    }

    /// Replace the backtrace capture, e.g. with a fixed trace in tests.
    pub fn with_capture(mut self, capture: impl StackCapture + 'static) -> Self {
        self.capture = Box::new(capture);
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: StackSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Capture and trim the current stack, then submit a report carrying the
    /// event message and its `user` field.
    pub fn forward(&self, event: &LogEvent) -> Result<()> {
        let raw = self.capture.capture();
        let stack_trace = self.sanitizer.sanitize_lines(&raw);

        self.config.sink.submit(ErrorReport {
            error: ReportedError::new(event.message.clone()),
            stack_trace,
            user: user_identifier(event),
        })
    }
}

impl Hook for ErrorForwarder {
    fn name(&self) -> &'static str {
        "error_report"
    }

    fn filter(&self) -> &SeverityFilter {
        &self.config.filter
    }

    fn handle(&self, event: &LogEvent) -> Result<()> {
        self.forward(event)
    }
}

/// Text labels for every event field.
pub fn labels_for(fields: &HashMap<String, FieldValue>) -> HashMap<String, String> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), value.to_text()))
        .collect()
}

/// The `user` field as text, or an empty string.
pub fn user_identifier(event: &LogEvent) -> String {
    event
        .field(USER_FIELD)
        .map(FieldValue::to_text)
        .unwrap_or_default()
}
