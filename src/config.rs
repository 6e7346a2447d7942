//! Configuration for the forwarding hooks and their HTTP sinks

use crate::errors::{HookError, Result};
use crate::event::SeverityLevel;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_LOGGING_ENDPOINT: &str = "https://logging.googleapis.com";
pub const DEFAULT_ERROR_REPORTING_ENDPOINT: &str = "https://clouderrorreporting.googleapis.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project receiving logs and error reports
    pub project_id: String,

    /// Service name attached to error reports
    pub service_name: String,

    /// Service version attached to error reports
    pub service_version: String,

    /// Log id entries are written under
    pub log_name: String,

    /// OAuth bearer token for both APIs
    pub access_token: Option<String>,

    /// Base URL of the logging API
    pub logging_endpoint: String,

    /// Base URL of the error reporting API
    pub error_reporting_endpoint: String,

    /// HTTP timeout for sink requests
    pub http_timeout: Duration,

    /// Levels sent to the log collector, empty for the defaults
    pub log_levels: Vec<SeverityLevel>,

    /// Levels sent to error reporting, empty for the defaults
    pub error_levels: Vec<SeverityLevel>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            service_name: "stackdriver-hook".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_name: "sdhook".to_string(),
            access_token: None,
            logging_endpoint: DEFAULT_LOGGING_ENDPOINT.to_string(),
            error_reporting_endpoint: DEFAULT_ERROR_REPORTING_ENDPOINT.to_string(),
            http_timeout: Duration::from_secs(10),
            log_levels: Vec::new(),
            error_levels: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(project_id) = lookup("PROJECT_ID") {
            config.project_id = project_id;
        }

        if let Some(service_name) = lookup("SERVICE_NAME") {
            config.service_name = service_name;
        }

        if let Some(service_version) = lookup("SERVICE_VERSION") {
            config.service_version = service_version;
        }

        if let Some(log_name) = lookup("LOG_NAME") {
            config.log_name = log_name;
        }

        if let Some(token) = lookup("ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                config.access_token = Some(token.trim().to_string());
            }
        }

        if let Some(endpoint) = lookup("LOGGING_ENDPOINT") {
            config.logging_endpoint = endpoint;
        }

        if let Some(endpoint) = lookup("ERROR_REPORTING_ENDPOINT") {
            config.error_reporting_endpoint = endpoint;
        }

        if let Some(timeout) = lookup("HTTP_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.http_timeout = Duration::from_secs(seconds);
            }
        }

        if let Some(levels) = lookup("LOG_LEVELS") {
            config.log_levels = parse_levels(&levels)?;
        }

        if let Some(levels) = lookup("ERROR_LEVELS") {
            config.error_levels = parse_levels(&levels)?;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.project_id.is_empty() {
            return Err("PROJECT_ID is not set".to_string());
        }

        if self.service_name.is_empty() {
            return Err("service_name cannot be empty".to_string());
        }

        if self.log_name.is_empty() {
            return Err("log_name cannot be empty".to_string());
        }

        if self.logging_endpoint.is_empty() || self.error_reporting_endpoint.is_empty() {
            return Err("sink endpoints cannot be empty".to_string());
        }

        if self.http_timeout.is_zero() {
            return Err("http_timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Parse a comma separated level list, e.g. `panic,fatal,error`.
pub fn parse_levels(list: &str) -> Result<Vec<SeverityLevel>> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            name.parse::<SeverityLevel>()
                .map_err(|_| HookError::Config(format!("invalid level '{}' in '{}'", name, list)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.log_name, "sdhook");
        assert_eq!(config.logging_endpoint, DEFAULT_LOGGING_ENDPOINT);
        assert!(config.log_levels.is_empty());
        assert!(config.access_token.is_none());
        assert_eq!(config.validate().unwrap_err(), "PROJECT_ID is not set");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PROJECT_ID", "my-project"),
            ("SERVICE_NAME", "billing"),
            ("ACCESS_TOKEN", " ya29.token \n"),
            ("HTTP_TIMEOUT_SECONDS", "3"),
            ("LOG_LEVELS", "warn, info,debug"),
            ("ERROR_LEVELS", "panic,fatal"),
        ]))
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.project_id, "my-project");
        assert_eq!(config.service_name, "billing");
        assert_eq!(config.access_token.as_deref(), Some("ya29.token"));
        assert_eq!(config.http_timeout, Duration::from_secs(3));
        assert_eq!(
            config.log_levels,
            vec![SeverityLevel::Warn, SeverityLevel::Info, SeverityLevel::Debug]
        );
        assert_eq!(config.error_levels, vec![SeverityLevel::Panic, SeverityLevel::Fatal]);
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let err = Config::from_lookup(lookup(&[("ERROR_LEVELS", "error,loud")])).unwrap_err();
        assert!(matches!(err, HookError::Config(ref msg) if msg.contains("'loud'")));
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let mut config = Config::default();
        config.project_id = "p".to_string();
        config.http_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_levels_skips_blanks() {
        assert_eq!(parse_levels(" , ").unwrap(), Vec::<SeverityLevel>::new());
        assert_eq!(parse_levels("ERROR").unwrap(), vec![SeverityLevel::Error]);
    }
}
