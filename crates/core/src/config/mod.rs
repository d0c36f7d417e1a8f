//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (WAYSTATION_*)
//! 2. TOML config file (if WAYSTATION_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::{PartitionName, PartitionRole, PartitionSet};

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (WAYSTATION_*)
/// 2. TOML config file (if WAYSTATION_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Application prefix used in partition names.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Semantic version of this worker build. Bumping it makes every
    /// partition of the previous version stale at the next activation.
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin of the application being cached.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin-relative paths pre-cached into the static partition on install.
    #[serde(default = "default_static_manifest")]
    pub static_manifest: Vec<String>,

    /// Paths under this prefix are served cache-first from the static partition.
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,

    /// Paths under these prefixes are served network-first from the dynamic partition.
    #[serde(default = "default_dynamic_api_prefixes")]
    pub dynamic_api_prefixes: Vec<String>,

    /// Paths under these prefixes are never intercepted.
    #[serde(default = "default_bypass_prefixes")]
    pub bypass_prefixes: Vec<String>,

    /// URL schemes that are never intercepted (browser extensions).
    #[serde(default = "default_excluded_schemes")]
    pub excluded_schemes: Vec<String>,

    /// Entry bound of the dynamic partition; oldest entries are evicted first.
    #[serde(default = "default_max_dynamic_entries")]
    pub max_dynamic_entries: usize,

    /// Promote a freshly installed worker without waiting for a SKIP_WAITING message.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Offline document served from the static partition when navigation fails.
    #[serde(default = "default_offline_page")]
    pub offline_page: Option<String>,

    /// Background sync tag that triggers a refresh of `sync_url`.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// URL re-fetched into the dynamic partition on background sync.
    #[serde(default = "default_sync_url")]
    pub sync_url: String,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Storage quota for the cache database, in bytes. Unbounded when unset.
    #[serde(default)]
    pub storage_quota_bytes: Option<u64>,
}

fn default_app_name() -> String {
    "arca".into()
}

fn default_version() -> String {
    "3.0.0".into()
}

fn default_origin() -> String {
    "http://localhost:8000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./waystation-cache.sqlite")
}

fn default_static_manifest() -> Vec<String> {
    [
        "/",
        "/dashboard/",
        "/static/css/bootstrap.min.css",
        "/static/css/style.css",
        "/static/js/bootstrap.bundle.min.js",
        "/static/js/jquery.min.js",
        "/static/js/chart.min.js",
        "/static/manifest.json",
        "/static/images/icon-192x192-v2.png",
        "/static/images/icon-512x512-v2.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_static_prefix() -> String {
    "/static/".into()
}

fn default_dynamic_api_prefixes() -> Vec<String> {
    vec!["/api/dashboard-data/".into(), "/api/dashboard-intelligent-data/".into()]
}

fn default_bypass_prefixes() -> Vec<String> {
    vec!["/admin/".into(), "/static/admin/".into()]
}

fn default_excluded_schemes() -> Vec<String> {
    vec!["chrome-extension".into(), "moz-extension".into(), "safari-extension".into()]
}

fn default_max_dynamic_entries() -> usize {
    100
}

fn default_offline_page() -> Option<String> {
    Some("/offline/".into())
}

fn default_sync_tag() -> String {
    "background-sync".into()
}

fn default_sync_url() -> String {
    "/api/dashboard-data/".into()
}

fn default_user_agent() -> String {
    "waystation/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_true() -> bool {
    true
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            version: default_version(),
            origin: default_origin(),
            db_path: default_db_path(),
            static_manifest: default_static_manifest(),
            static_prefix: default_static_prefix(),
            dynamic_api_prefixes: default_dynamic_api_prefixes(),
            bypass_prefixes: default_bypass_prefixes(),
            excluded_schemes: default_excluded_schemes(),
            max_dynamic_entries: default_max_dynamic_entries(),
            skip_waiting: true,
            offline_page: default_offline_page(),
            sync_tag: default_sync_tag(),
            sync_url: default_sync_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            storage_quota_bytes: None,
        }
    }
}

impl WorkerConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: format!("unsupported scheme: {scheme}"),
            }),
        }
    }

    /// Current partition names for this worker version.
    pub fn partitions(&self) -> PartitionSet {
        PartitionSet {
            static_cache: PartitionName::new(&self.app_name, PartitionRole::Static, &self.version),
            dynamic_cache: PartitionName::new(&self.app_name, PartitionRole::Dynamic, &self.version),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `WAYSTATION_`
    /// 2. TOML file from `WAYSTATION_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("WAYSTATION_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("WAYSTATION_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert_eq!(config.app_name, "arca");
        assert_eq!(config.version, "3.0.0");
        assert_eq!(config.db_path, PathBuf::from("./waystation-cache.sqlite"));
        assert_eq!(config.max_dynamic_entries, 100);
        assert_eq!(config.static_prefix, "/static/");
        assert!(config.skip_waiting);
        assert!(config.storage_quota_bytes.is_none());
        assert!(config.static_manifest.contains(&"/".to_string()));
    }

    #[test]
    fn test_timeout_duration() {
        let config = WorkerConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_partition_names_follow_convention() {
        let config = WorkerConfig { app_name: "arca".into(), version: "3.1.0".into(), ..Default::default() };
        let set = config.partitions();
        assert_eq!(set.static_cache.to_string(), "arca-static-v3.1.0");
        assert_eq!(set.dynamic_cache.to_string(), "arca-dynamic-v3.1.0");
    }

    #[test]
    fn test_origin_url_rejects_other_schemes() {
        let config = WorkerConfig { origin: "ftp://files.test".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_load_from_env_and_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "waystation.toml",
                r#"
                app_name = "ledger"
                version = "1.2.0"
                max_dynamic_entries = 50
                "#,
            )?;
            jail.set_env("WAYSTATION_CONFIG_FILE", "waystation.toml");
            jail.set_env("WAYSTATION_VERSION", "1.3.0");

            let config = WorkerConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.app_name, "ledger");
            assert_eq!(config.version, "1.3.0");
            assert_eq!(config.max_dynamic_entries, 50);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("WAYSTATION_MAX_DYNAMIC_ENTRIES", "0");
            assert!(matches!(WorkerConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
