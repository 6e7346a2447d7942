//! Destination severities and per-hook level filters

use crate::event::SeverityLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Levels forwarded to error reporting when none are configured
pub const DEFAULT_ERROR_LEVELS: [SeverityLevel; 3] = [
    SeverityLevel::Panic,
    SeverityLevel::Fatal,
    SeverityLevel::Error,
];

/// Levels forwarded to the log collector when none are configured
pub const DEFAULT_LOG_LEVELS: [SeverityLevel; 2] = [SeverityLevel::Warn, SeverityLevel::Info];

/// Severity as understood by the logging service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Default,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Default => "DEFAULT",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Alert => "ALERT",
            Severity::Emergency => "EMERGENCY",
        };
        f.write_str(name)
    }
}

impl From<SeverityLevel> for Severity {
    fn from(level: SeverityLevel) -> Self {
        severity_for(level)
    }
}

/// Map an event level onto the destination severity.
pub fn severity_for(level: SeverityLevel) -> Severity {
    match level {
        SeverityLevel::Info => Severity::Info,
        SeverityLevel::Warn => Severity::Warning,
        SeverityLevel::Error => Severity::Error,
        SeverityLevel::Panic | SeverityLevel::Fatal => Severity::Critical,
        _ => Severity::Default,
    }
}

/// The set of levels a hook acts on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeverityFilter {
    levels: BTreeSet<SeverityLevel>,
}

impl SeverityFilter {
    pub fn new(levels: impl IntoIterator<Item = SeverityLevel>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
        }
    }

    /// Use `levels` when given and non-empty, `defaults` otherwise.
    pub fn or_default(levels: Option<Vec<SeverityLevel>>, defaults: &[SeverityLevel]) -> Self {
        match levels {
            Some(levels) if !levels.is_empty() => Self::new(levels),
            _ => Self::new(defaults.iter().copied()),
        }
    }

    pub fn error_defaults() -> Self {
        Self::new(DEFAULT_ERROR_LEVELS)
    }

    pub fn log_defaults() -> Self {
        Self::new(DEFAULT_LOG_LEVELS)
    }

    pub fn accepts(&self, level: SeverityLevel) -> bool {
        self.levels.contains(&level)
    }

    /// Configured levels, most severe first.
    pub fn levels(&self) -> Vec<SeverityLevel> {
        self.levels.iter().rev().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(severity_for(SeverityLevel::Info), Severity::Info);
        assert_eq!(severity_for(SeverityLevel::Warn), Severity::Warning);
        assert_eq!(severity_for(SeverityLevel::Error), Severity::Error);
        assert_eq!(severity_for(SeverityLevel::Fatal), Severity::Critical);
        assert_eq!(severity_for(SeverityLevel::Panic), Severity::Critical);
        assert_eq!(severity_for(SeverityLevel::Debug), Severity::Default);
        assert_eq!(severity_for(SeverityLevel::Trace), Severity::Default);
    }

    #[test]
    fn test_severity_mapping_is_total() {
        for level in SeverityLevel::ALL {
            // every level lands on one of the five values the table produces
            let severity = Severity::from(level);
            assert!(matches!(
                severity,
                Severity::Default
                    | Severity::Info
                    | Severity::Warning
                    | Severity::Error
                    | Severity::Critical
            ));
        }
    }

    #[test]
    fn test_severity_serializes_as_wire_name() {
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"WARNING\"");
        assert_eq!(serde_json::to_string(&Severity::Default).unwrap(), "\"DEFAULT\"");
        assert_eq!(Severity::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn test_filter_membership() {
        let filter = SeverityFilter::new([SeverityLevel::Warn, SeverityLevel::Debug]);
        for level in SeverityLevel::ALL {
            let expected = level == SeverityLevel::Warn || level == SeverityLevel::Debug;
            assert_eq!(filter.accepts(level), expected, "level {}", level);
        }
    }

    #[test]
    fn test_default_filters() {
        let errors = SeverityFilter::error_defaults();
        assert_eq!(
            errors.levels(),
            vec![SeverityLevel::Panic, SeverityLevel::Fatal, SeverityLevel::Error]
        );

        let logs = SeverityFilter::log_defaults();
        assert_eq!(logs.levels(), vec![SeverityLevel::Warn, SeverityLevel::Info]);
        assert!(!logs.accepts(SeverityLevel::Debug));
        assert!(!errors.accepts(SeverityLevel::Debug));
    }

    #[test]
    fn test_empty_levels_fall_back_to_defaults() {
        let filter = SeverityFilter::or_default(Some(vec![]), &DEFAULT_LOG_LEVELS);
        assert_eq!(filter, SeverityFilter::log_defaults());

        let filter = SeverityFilter::or_default(None, &DEFAULT_ERROR_LEVELS);
        assert_eq!(filter, SeverityFilter::error_defaults());

        let filter = SeverityFilter::or_default(Some(vec![SeverityLevel::Debug]), &DEFAULT_LOG_LEVELS);
        assert_eq!(filter.levels(), vec![SeverityLevel::Debug]);
    }
}
