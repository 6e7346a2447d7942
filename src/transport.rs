//! HTTP sinks for the Cloud Logging and Error Reporting REST APIs

use crate::errors::{HookError, Result};
use crate::severity::Severity;
use crate::sink::{ErrorReport, ErrorSink, LogEntry, LogSink};
use crate::stack::first_call_site;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

type ErrorCallback = Arc<dyn Fn(&HookError) + Send + Sync>;

/// Shared HTTP client that fires one request per submission.
///
/// `submit` on the sinks never waits for the network: the request is spawned
/// on the runtime captured at construction and its outcome goes to the
/// error callback. Use [`HttpTransport::flush`] to wait for pending requests.
pub struct HttpTransport {
    client: Client,
    access_token: Option<String>,
    runtime: Handle,
    in_flight: Mutex<JoinSet<()>>,
    on_error: ErrorCallback,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("has_access_token", &self.access_token.is_some())
            .field("in_flight", &self.pending())
            .finish()
    }
}

impl HttpTransport {
    /// Must be called from within a tokio runtime.
    pub fn new(http_timeout: Duration, access_token: Option<String>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            HookError::Config(format!("HTTP sinks require a tokio runtime: {}", e))
        })?;

        let client = Client::builder()
            .timeout(http_timeout)
            .user_agent(format!("stackdriver_hook/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(HookError::Http)?;

        Ok(Self {
            client,
            access_token,
            runtime,
            in_flight: Mutex::new(JoinSet::new()),
            on_error: Arc::new(|err: &HookError| {
                warn!(target: "stackdriver_hook::transport", "Failed to deliver submission: {}", err)
            }),
        })
    }

    pub fn with_error_handler(mut self, handler: impl Fn(&HookError) + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(handler);
        self
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of requests spawned and not yet joined.
    pub fn pending(&self) -> usize {
        self.tasks().len()
    }

    fn request(&self, url: &str, body: Vec<u8>) -> RequestBuilder {
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Single attempt, awaited by the caller.
    pub async fn post(&self, url: &str, body: Vec<u8>) -> Result<()> {
        let response = self.request(url, body).send().await.map_err(HookError::Http)?;
        handle_response(response, url).await
    }

    /// Spawn a single attempt on the transport's runtime.
    pub fn spawn_post(&self, url: &str, body: Vec<u8>) {
        let request = self.request(url, body);
        let url = url.to_string();
        let on_error = Arc::clone(&self.on_error);

        let mut tasks = self.tasks();
        while tasks.try_join_next().is_some() {}

        tasks.spawn_on(
            async move {
                let outcome = match request.send().await {
                    Ok(response) => handle_response(response, &url).await,
                    Err(err) => Err(HookError::Http(err)),
                };
                if let Err(err) = outcome {
                    on_error(&err);
                }
            },
            &self.runtime,
        );
    }

    /// Wait until every spawned request has completed.
    pub async fn flush(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks());
        debug!(target: "stackdriver_hook::transport", "Flushing {} pending submissions", tasks.len());

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                (self.on_error)(&HookError::Other(format!("submission task failed: {}", err)));
            }
        }
    }
}

/// Map a non-2xx response onto a sink error.
async fn handle_response(response: Response, url: &str) -> Result<()> {
    let status = response.status();

    if status.is_success() {
        debug!(target: "stackdriver_hook::transport", "Submission accepted by {}", url);
        return Ok(());
    }

    let error_body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

    let error_message = match status.as_u16() {
        400 => format!("Bad request to {}: {}", url, error_body),
        401 => format!("Unauthorized for {}: {}", url, error_body),
        403 => format!("Forbidden for {}: {}", url, error_body),
        404 => format!("Endpoint not found {}: {}", url, error_body),
        429 => format!("Quota exceeded for {}: {}", url, error_body),
        500..=599 => format!("Server error {} from {}: {}", status, url, error_body),
        _ => format!("Unexpected response {} from {}: {}", status, url, error_body),
    };

    Err(HookError::Sink(error_message))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteEntriesRequest {
    pub log_name: String,
    pub resource: MonitoredResource,
    pub entries: Vec<WireLogEntry>,
}

#[derive(Debug, Serialize)]
pub struct MonitoredResource {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLogEntry {
    pub insert_id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub text_payload: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

/// Writes entries through `entries:write`.
#[derive(Debug)]
pub struct CloudLoggingSink {
    transport: Arc<HttpTransport>,
    url: String,
    log_name: String,
}

impl CloudLoggingSink {
    pub fn new(transport: Arc<HttpTransport>, endpoint: &str, project_id: &str, log_id: &str) -> Self {
        Self {
            transport,
            url: format!("{}/v2/entries:write", endpoint.trim_end_matches('/')),
            log_name: format!("projects/{}/logs/{}", project_id, log_id),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn write_request(&self, entry: LogEntry) -> WriteEntriesRequest {
        WriteEntriesRequest {
            log_name: self.log_name.clone(),
            resource: MonitoredResource {
                kind: "global".to_string(),
            },
            entries: vec![WireLogEntry {
                insert_id: Uuid::new_v4().to_string(),
                timestamp: entry.timestamp,
                severity: entry.severity,
                text_payload: entry.payload,
                labels: entry.labels,
            }],
        }
    }
}

impl LogSink for CloudLoggingSink {
    fn submit(&self, entry: LogEntry) -> Result<()> {
        let body = serde_json::to_vec(&self.write_request(entry))?;
        self.transport.spawn_post(&self.url, body);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedErrorEvent {
    pub event_time: DateTime<Utc>,
    pub service_context: ServiceContext,
    pub message: String,
    pub context: ErrorContext,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceContext {
    pub service: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub report_location: SourceLocation,
}

/// Where the error was reported, taken from the first frame of the trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub file_path: String,
    pub line_number: u32,
    pub function_name: String,
}

impl SourceLocation {
    fn from_trace(stack_trace: &str) -> Self {
        match first_call_site(stack_trace) {
            Some(site) => Self {
                file_path: site.file,
                line_number: site.line,
                function_name: site.function,
            },
            None => Self {
                file_path: "<unknown>".to_string(),
                line_number: 0,
                function_name: "<unknown>".to_string(),
            },
        }
    }
}

/// Reports errors through `events:report`.
#[derive(Debug)]
pub struct ErrorReportingSink {
    transport: Arc<HttpTransport>,
    url: String,
    service_context: ServiceContext,
}

impl ErrorReportingSink {
    pub fn new(
        transport: Arc<HttpTransport>,
        endpoint: &str,
        project_id: &str,
        service_context: ServiceContext,
    ) -> Self {
        Self {
            transport,
            url: format!(
                "{}/v1beta1/projects/{}/events:report",
                endpoint.trim_end_matches('/'),
                project_id
            ),
            service_context,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn report_event(&self, report: ErrorReport) -> ReportedErrorEvent {
        let context = ErrorContext {
            report_location: SourceLocation::from_trace(&report.stack_trace),
            user: Some(report.user).filter(|user| !user.is_empty()),
        };

        ReportedErrorEvent {
            event_time: Utc::now(),
            service_context: self.service_context.clone(),
            message: format!("{}\n{}", report.error, report.stack_trace),
            context,
        }
    }
}

impl ErrorSink for ErrorReportingSink {
    fn submit(&self, report: ErrorReport) -> Result<()> {
        let body = serde_json::to_vec(&self.report_event(report))?;
        self.transport.spawn_post(&self.url, body);
        Ok(())
    }
}
