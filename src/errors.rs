//! Error types for the forwarding hooks

use std::fmt;

pub type Result<T> = std::result::Result<T, HookError>;

#[derive(Debug)]
pub enum HookError {
    /// IO operation failed
    Io(std::io::Error),

    /// HTTP request to a sink failed
    Http(reqwest::Error),

    /// JSON serialization of a sink payload failed
    Json(serde_json::Error),

    /// Configuration error
    Config(String),

    /// A sink rejected or could not transmit a submission
    Sink(String),

    /// Generic error with message
    Other(String),
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookError::Io(err) => write!(f, "IO error: {}", err),
            HookError::Http(err) => write!(f, "HTTP error: {}", err),
            HookError::Json(err) => write!(f, "JSON error: {}", err),
            HookError::Config(msg) => write!(f, "Configuration error: {}", msg),
            HookError::Sink(msg) => write!(f, "Sink error: {}", msg),
            HookError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for HookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HookError::Io(err) => Some(err),
            HookError::Http(err) => Some(err),
            HookError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HookError {
    fn from(err: std::io::Error) -> Self {
        HookError::Io(err)
    }
}

impl From<reqwest::Error> for HookError {
    fn from(err: reqwest::Error) -> Self {
        HookError::Http(err)
    }
}

impl From<serde_json::Error> for HookError {
    fn from(err: serde_json::Error) -> Self {
        HookError::Json(err)
    }
}
