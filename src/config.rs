//! Configuration
//!
//! Everything has a default; hosts override individual fields from JSON.

use std::time::Duration;

use serde::Deserialize;

use crate::errors::{MapError, MapResult};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::result_cache::CachePolicy;

/// Serialized form of a [`CachePolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CachePolicySetting {
    Permanent,
    TimeSpan { millis: u64 },
    RepeatedRequestLimit { limit: u32 },
}

impl From<CachePolicySetting> for CachePolicy {
    fn from(setting: CachePolicySetting) -> Self {
        match setting {
            CachePolicySetting::Permanent => CachePolicy::Permanent,
            CachePolicySetting::TimeSpan { millis } => CachePolicy::TimeSpan(Duration::from_millis(millis)),
            CachePolicySetting::RepeatedRequestLimit { limit } => CachePolicy::RepeatedRequestLimit(limit),
        }
    }
}

/// Runtime configuration for caches and logging
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RowcastConfig {
    /// Whether compiled row-mappers are retained by fingerprint
    pub compile_cache_enabled: bool,
    /// Result cache policy for processors that do not choose one.
    /// `None` leaves such processors uncached.
    pub default_cache_policy: Option<CachePolicySetting>,
    /// Upper bound on entries per result cache
    pub result_cache_max_entries: usize,
    /// Minimum severity written by the logger
    pub log_level: Severity,
}

impl Default for RowcastConfig {
    fn default() -> Self {
        Self {
            compile_cache_enabled: true,
            default_cache_policy: None,
            result_cache_max_entries: 1024,
            log_level: Severity::Info,
        }
    }
}

impl RowcastConfig {
    /// Parse configuration from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> MapResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| MapError::configuration(format!("invalid rowcast configuration: {}", e)))?;
        Ok(config)
    }

    /// Default result cache policy, if any
    pub fn default_policy(&self) -> Option<CachePolicy> {
        self.default_cache_policy.map(CachePolicy::from)
    }

    /// Apply the log level to the process-wide logger
    pub fn apply(&self) {
        Logger::set_min_severity(self.log_level);
        let max_entries = self.result_cache_max_entries.to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("compile_cache_enabled", if self.compile_cache_enabled { "true" } else { "false" }),
                ("log_level", self.log_level.as_str()),
                ("result_cache_max_entries", &max_entries),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RowcastConfig::default();
        assert!(config.compile_cache_enabled);
        assert_eq!(config.default_policy(), None);
        assert_eq!(config.result_cache_max_entries, 1024);
        assert_eq!(config.log_level, Severity::Info);
    }

    #[test]
    fn test_from_json_partial() {
        let config = RowcastConfig::from_json(r#"{"compile_cache_enabled": false}"#).unwrap();
        assert!(!config.compile_cache_enabled);
        assert_eq!(config.result_cache_max_entries, 1024);
    }

    #[test]
    fn test_policy_settings() {
        let config = RowcastConfig::from_json(
            r#"{"default_cache_policy": {"mode": "time_span", "millis": 1500}, "log_level": "trace"}"#,
        )
        .unwrap();
        assert_eq!(
            config.default_policy(),
            Some(CachePolicy::TimeSpan(Duration::from_millis(1500)))
        );
        assert_eq!(config.log_level, Severity::Trace);

        let config = RowcastConfig::from_json(
            r#"{"default_cache_policy": {"mode": "repeated_request_limit", "limit": 4}}"#,
        )
        .unwrap();
        assert_eq!(config.default_policy(), Some(CachePolicy::RepeatedRequestLimit(4)));
    }

    #[test]
    fn test_invalid_json_is_configuration_error() {
        let err = RowcastConfig::from_json(r#"{"default_cache_policy": {"mode": "forever"}}"#).unwrap_err();
        assert!(err.is_configuration());
    }
}
