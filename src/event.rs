//! Log events as seen by the hooks

use crate::errors::HookError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Severity of an emitted log event, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl SeverityLevel {
    pub const ALL: [SeverityLevel; 7] = [
        SeverityLevel::Trace,
        SeverityLevel::Debug,
        SeverityLevel::Info,
        SeverityLevel::Warn,
        SeverityLevel::Error,
        SeverityLevel::Fatal,
        SeverityLevel::Panic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Trace => "trace",
            SeverityLevel::Debug => "debug",
            SeverityLevel::Info => "info",
            SeverityLevel::Warn => "warn",
            SeverityLevel::Error => "error",
            SeverityLevel::Fatal => "fatal",
            SeverityLevel::Panic => "panic",
        }
    }
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeverityLevel {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(SeverityLevel::Trace),
            "debug" => Ok(SeverityLevel::Debug),
            "info" => Ok(SeverityLevel::Info),
            "warn" | "warning" => Ok(SeverityLevel::Warn),
            "error" => Ok(SeverityLevel::Error),
            "fatal" => Ok(SeverityLevel::Fatal),
            "panic" => Ok(SeverityLevel::Panic),
            other => Err(HookError::Config(format!("unknown severity level: {}", other))),
        }
    }
}

impl From<&tracing::Level> for SeverityLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => SeverityLevel::Trace,
            tracing::Level::DEBUG => SeverityLevel::Debug,
            tracing::Level::INFO => SeverityLevel::Info,
            tracing::Level::WARN => SeverityLevel::Warn,
            _ => SeverityLevel::Error,
        }
    }
}

/// A contextual field value attached to an event.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Anything else, already rendered with its debug representation
    Other(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Other(s) => f.write_str(s),
        }
    }
}

impl FieldValue {
    /// Text form used for labels and user identifiers.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => FieldValue::Integer(v),
            Err(_) => FieldValue::Other(value.to_string()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// One log call as seen by the hooks.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: SeverityLevel,
    pub message: String,
    pub fields: HashMap<String, FieldValue>,
}

impl LogEvent {
    /// An event stamped with the current time and no fields.
    pub fn new(level: SeverityLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            fields: HashMap::new(),
        }
    }

    /// Replace the timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Add or replace a field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Value of the field named `key`, if present.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}
