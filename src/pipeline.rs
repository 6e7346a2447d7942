//! Explicit registry of hooks and per-event dispatch

use crate::errors::HookError;
use crate::event::LogEvent;
use crate::forwarder::Hook;
use std::fmt;

/// A failed `handle` call, tagged with the hook that produced it.
#[derive(Debug)]
pub struct HookFailure {
    pub hook: &'static str,
    pub error: HookError,
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hook: {}", self.hook, self.error)
    }
}

/// Hooks invoked in registration order for every dispatched event.
#[derive(Default)]
pub struct HookPipeline {
    hooks: Vec<Box<dyn Hook>>,
}

impl HookPipeline {
    /// An empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook; hooks run in registration order.
    pub fn register(&mut self, hook: impl Hook + 'static) -> &mut Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn with_hook(mut self, hook: impl Hook + 'static) -> Self {
        self.register(hook);
        self
    }

    /// Run every accepting hook. A failing hook does not stop the others.
    pub fn dispatch(&self, event: &LogEvent) -> Vec<HookFailure> {
        // plain loop: handle() runs under the capture, keep adapter frames out of it
        let mut failures = Vec::new();
        for hook in &self.hooks {
            if !hook.accept(event) {
                continue;
            }
            if let Err(error) = hook.handle(event) {
                failures.push(HookFailure {
                    hook: hook.name(),
                    error,
                });
            }
        }
        failures
    }

    /// True when at least one hook would handle `event`.
    pub fn accepts(&self, event: &LogEvent) -> bool {
        self.hooks.iter().any(|hook| hook.accept(event))
    }

    /// Names of the registered hooks, in registration order.
    pub fn hook_names(&self) -> Vec<&'static str> {
        self.hooks.iter().map(|hook| hook.name()).collect()
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SeverityLevel;
    use crate::forwarder::tests::{FailingSink, RecordingErrorSink, RecordingLogSink, fake_stack};
    use crate::forwarder::{ErrorForwarder, LogForwarder};
    use crate::severity::Severity;
    use std::sync::Arc;

    fn pipeline() -> (HookPipeline, Arc<RecordingLogSink>, Arc<RecordingErrorSink>) {
        let logs = Arc::new(RecordingLogSink::default());
        let errors = Arc::new(RecordingErrorSink::default());
        let pipeline = HookPipeline::new()
            .with_hook(LogForwarder::new(logs.clone()))
            .with_hook(ErrorForwarder::new(errors.clone()).with_capture(fake_stack));
        (pipeline, logs, errors)
    }

    #[test]
    fn test_error_event_reaches_error_sink_only() {
        let (pipeline, logs, errors) = pipeline();
        let event = LogEvent::new(SeverityLevel::Error, "send user err: do bar: do foo")
            .with_field("user", "howard");

        assert!(pipeline.dispatch(&event).is_empty());

        assert!(logs.entries.lock().unwrap().is_empty());
        let reports = errors.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].user, "howard");
        assert_eq!(reports[0].error_text(), "send user err: do bar: do foo");
    }

    #[test]
    fn test_warning_reaches_log_sink_only() {
        let (pipeline, logs, errors) = pipeline();
        let event = LogEvent::new(SeverityLevel::Warn, "a warning will be sent");

        assert!(pipeline.dispatch(&event).is_empty());

        let entries = logs.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Warning);
        assert_eq!(entries[0].payload, "a warning will be sent");
        assert!(errors.reports.lock().unwrap().is_empty());
    }

    #[test]
    fn test_debug_event_is_not_forwarded() {
        let (pipeline, logs, errors) = pipeline();
        let event = LogEvent::new(SeverityLevel::Debug, "this is a debug line");

        assert!(!pipeline.accepts(&event));
        assert!(pipeline.dispatch(&event).is_empty());
        assert!(logs.entries.lock().unwrap().is_empty());
        assert!(errors.reports.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failures_are_collected_per_hook() {
        let logs = Arc::new(RecordingLogSink::default());
        let failing = ErrorForwarder::with_levels(Arc::new(FailingSink), vec![SeverityLevel::Warn])
            .with_capture(fake_stack);
        let pipeline = HookPipeline::new()
            .with_hook(failing)
            .with_hook(LogForwarder::new(logs.clone()));

        let failures = pipeline.dispatch(&LogEvent::new(SeverityLevel::Warn, "w"));

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].hook, "error_report");
        assert_eq!(failures[0].to_string(), "error_report hook: Sink error: unauthenticated");
        // the log hook still ran
        assert_eq!(logs.entries.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_registration_order() {
        let mut pipeline = HookPipeline::new();
        assert!(pipeline.is_empty());

        pipeline
            .register(LogForwarder::new(Arc::new(RecordingLogSink::default())))
            .register(ErrorForwarder::new(Arc::new(RecordingErrorSink::default())));

        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.hook_names(), vec!["log", "error_report"]);
    }
}
