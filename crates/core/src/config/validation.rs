//! Configuration validation rules.
//!
//! This module provides validation logic for `WorkerConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::WorkerConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

/// `MAJOR.MINOR.PATCH`, digits only.
fn is_semver(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

impl WorkerConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `app_name` is empty or contains whitespace
    /// - `version` is not `MAJOR.MINOR.PATCH`
    /// - `origin` is not an absolute http(s) URL
    /// - a manifest entry or path prefix does not start with `/`
    /// - `max_dynamic_entries` is 0
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_name.is_empty() || self.app_name.chars().any(char::is_whitespace) {
            return Err(invalid("app_name", "must be non-empty without whitespace"));
        }

        if !is_semver(&self.version) {
            return Err(invalid("version", format!("expected MAJOR.MINOR.PATCH, got {:?}", self.version)));
        }

        self.origin_url()?;

        if let Some(entry) = self.static_manifest.iter().find(|e| !e.starts_with('/')) {
            return Err(invalid("static_manifest", format!("{entry:?} must be an origin-relative path")));
        }

        if !self.static_prefix.starts_with('/') {
            return Err(invalid("static_prefix", "must start with '/'"));
        }

        for (field, prefixes) in [("dynamic_api_prefixes", &self.dynamic_api_prefixes), ("bypass_prefixes", &self.bypass_prefixes)] {
            if let Some(prefix) = prefixes.iter().find(|p| !p.starts_with('/')) {
                return Err(invalid(field, format!("{prefix:?} must start with '/'")));
            }
        }

        if let Some(page) = &self.offline_page
            && !page.starts_with('/')
        {
            return Err(invalid("offline_page", "must start with '/'"));
        }

        if self.max_dynamic_entries == 0 {
            return Err(invalid("max_dynamic_entries", "must be greater than 0"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.static_manifest.is_empty() {
            tracing::warn!("static_manifest is empty; install will pre-cache nothing");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> Option<String> {
        match result {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = WorkerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_version_not_semver() {
        let config = WorkerConfig { version: "3.0".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("version"));

        let config = WorkerConfig { version: "v3.0.0".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("version"));
    }

    #[test]
    fn test_validate_app_name_whitespace() {
        let config = WorkerConfig { app_name: "my app".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("app_name"));
    }

    #[test]
    fn test_validate_bad_origin() {
        let config = WorkerConfig { origin: "not a url".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("origin"));
    }

    #[test]
    fn test_validate_cross_origin_manifest_entry() {
        let config = WorkerConfig {
            static_manifest: vec!["/".into(), "https://cdn.example.com/lib.css".into()],
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()).as_deref(), Some("static_manifest"));
    }

    #[test]
    fn test_validate_relative_prefix() {
        let config = WorkerConfig { bypass_prefixes: vec!["admin/".into()], ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("bypass_prefixes"));
    }

    #[test]
    fn test_validate_zero_bound() {
        let config = WorkerConfig { max_dynamic_entries: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("max_dynamic_entries"));
    }

    #[test]
    fn test_validate_timeout_limits() {
        let config = WorkerConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));

        let config = WorkerConfig { timeout_ms: 301_000, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));
    }

    #[test]
    fn test_validate_max_bytes_limits() {
        let config = WorkerConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("max_bytes"));

        let config = WorkerConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("max_bytes"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = WorkerConfig { max_bytes: 1, timeout_ms: 100, max_dynamic_entries: 1, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
