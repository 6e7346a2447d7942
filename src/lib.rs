//! Stackdriver Logging and Error Reporting hooks
//!
//! This library forwards application log events to a log ingestion service
//! and, with a trimmed stack trace, to an error aggregation service. Hooks
//! are registered explicitly on a [`HookPipeline`], which plugs into
//! `tracing` through [`HookLayer`].

pub mod config;
pub mod errors;
pub mod event;
pub mod forwarder;
pub mod layer;
pub mod pipeline;
pub mod severity;
pub mod sink;
pub mod stack;
pub mod transport;

pub use config::Config;
pub use errors::{HookError, Result};
pub use event::{FieldValue, LogEvent, SeverityLevel};
pub use forwarder::{ErrorForwarder, ForwarderConfig, Hook, LogForwarder};
pub use layer::HookLayer;
pub use pipeline::{HookFailure, HookPipeline};
pub use severity::{Severity, SeverityFilter, severity_for};
pub use sink::{ErrorReport, ErrorSink, LogEntry, LogSink};
pub use stack::{BacktraceCapture, CallSite, StackCapture, StackSanitizer, first_call_site};
pub use transport::{CloudLoggingSink, ErrorReportingSink, HttpTransport, ServiceContext};
