//! Demo: forwards a few events to Cloud Logging and Error Reporting

use stackdriver_hook::{
    CloudLoggingSink, Config, ErrorForwarder, ErrorReportingSink, HookError, HookLayer,
    HookPipeline, HttpTransport, LogForwarder, Result, ServiceContext,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    let transport = Arc::new(HttpTransport::new(
        config.http_timeout,
        config.access_token.clone(),
    )?);

    let log_sink = CloudLoggingSink::new(
        Arc::clone(&transport),
        &config.logging_endpoint,
        &config.project_id,
        &config.log_name,
    );
    let error_sink = ErrorReportingSink::new(
        Arc::clone(&transport),
        &config.error_reporting_endpoint,
        &config.project_id,
        ServiceContext {
            service: config.service_name.clone(),
            version: config.service_version.clone(),
        },
    );

    let pipeline = HookPipeline::new()
        .with_hook(LogForwarder::with_levels(Arc::new(log_sink), config.log_levels.clone()))
        .with_hook(ErrorForwarder::with_levels(
            Arc::new(error_sink),
            config.error_levels.clone(),
        ));

    initialize_tracing(HookLayer::new(Arc::new(pipeline)))?;

    info!(
        project = %config.project_id,
        log_name = %config.log_name,
        "Forwarding hooks installed"
    );

    emit_sample_events();

    transport.flush().await;
    Ok(())
}

fn emit_sample_events() {
    let cause = "do bar: do foo";
    error!(user = "howard", "send user err: {}", cause);

    warn!("a warning will be sent");
    info!("an info will be sent");

    debug!("this is a debug line, should not be sent to logging service");
}

/// Initialize structured logging with the forwarding hooks attached
fn initialize_tracing(hooks: HookLayer) -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .map_err(|e| HookError::Config(format!("invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(hooks)
        .try_init()
        .map_err(|e| HookError::Other(format!("failed to install subscriber: {}", e)))
}
