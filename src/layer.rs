//! `tracing` integration: feeds every event through a [`HookPipeline`]

use crate::event::{FieldValue, LogEvent, SeverityLevel};
use crate::pipeline::{HookFailure, HookPipeline};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Field that overrides the level taken from the tracing macro
pub const SEVERITY_FIELD: &str = "severity";

const MESSAGE_FIELD: &str = "message";

/// Targets whose events would loop back through the sinks' own transport
pub const DEFAULT_IGNORED_TARGETS: [&str; 6] = [
    "stackdriver_hook",
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
];

type FailureHandler = Arc<dyn Fn(&HookFailure) + Send + Sync>;

pub struct HookLayer {
    pipeline: Arc<HookPipeline>,
    ignored_targets: Vec<String>,
    on_failure: FailureHandler,
}

impl HookLayer {
    pub fn new(pipeline: Arc<HookPipeline>) -> Self {
        Self {
            pipeline,
            ignored_targets: DEFAULT_IGNORED_TARGETS.iter().map(|t| t.to_string()).collect(),
            on_failure: Arc::new(|failure: &HookFailure| eprintln!("Failed to fire hook: {}", failure)),
        }
    }

    pub fn with_ignored_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the stderr reporting of hook failures.
    ///
    /// The handler runs inside the subscriber; emitting tracing events from
    /// it re-enters this layer.
    pub fn with_failure_handler(
        mut self,
        handler: impl Fn(&HookFailure) + Send + Sync + 'static,
    ) -> Self {
        self.on_failure = Arc::new(handler);
        self
    }

    fn is_ignored(&self, target: &str) -> bool {
        self.ignored_targets.iter().any(|ignored| {
            target == ignored
                || target
                    .strip_prefix(ignored.as_str())
                    .is_some_and(|rest| rest.starts_with("::"))
        })
    }
}

impl<S: Subscriber> Layer<S> for HookLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if self.is_ignored(metadata.target()) {
            return;
        }

        let log_event = to_log_event(event);
        for failure in self.pipeline.dispatch(&log_event) {
            (self.on_failure)(&failure);
        }
    }
}

/// Convert a tracing event, applying the `severity` override if present.
pub fn to_log_event(event: &Event<'_>) -> LogEvent {
    let mut visitor = FieldVisitor::default();
    event.record(&mut visitor);

    let mut level = SeverityLevel::from(event.metadata().level());
    let overridden = match visitor.fields.get(SEVERITY_FIELD) {
        Some(FieldValue::Text(name)) => name.parse::<SeverityLevel>().ok(),
        _ => None,
    };
    if let Some(parsed) = overridden {
        level = parsed;
        visitor.fields.remove(SEVERITY_FIELD);
    }

    LogEvent {
        timestamp: Utc::now(),
        level,
        message: visitor.message.unwrap_or_default(),
        fields: visitor.fields,
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: HashMap<String, FieldValue>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: FieldValue) {
        if field.name() == MESSAGE_FIELD {
            self.message = Some(value.to_text());
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, FieldValue::Other(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, FieldValue::Text(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, FieldValue::Integer(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, FieldValue::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, FieldValue::Float(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, FieldValue::Bool(value));
    }
}
