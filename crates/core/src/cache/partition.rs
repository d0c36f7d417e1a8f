//! Partition naming: `<app>-<role>-v<semver>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// What a partition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionRole {
    /// Pre-cached at install, immutable per version.
    Static,
    /// Filled lazily at runtime, bounded.
    Dynamic,
}

impl PartitionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionRole::Static => "static",
            PartitionRole::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(PartitionRole::Static),
            "dynamic" => Ok(PartitionRole::Dynamic),
            other => Err(Error::InvalidInput(format!("unknown partition role: {other}"))),
        }
    }
}

/// A partition name with its embedded role and version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionName {
    pub app: String,
    pub role: PartitionRole,
    pub version: String,
}

impl PartitionName {
    pub fn new(app: &str, role: PartitionRole, version: &str) -> Self {
        Self { app: app.to_string(), role, version: version.to_string() }
    }

    /// Parse a stored name back into its parts.
    ///
    /// Returns `None` for names that do not follow the convention, such as
    /// partitions written by an older naming scheme.
    pub fn parse(name: &str) -> Option<Self> {
        let (rest, version) = name.rsplit_once("-v")?;
        let (app, role) = rest.rsplit_once('-')?;
        if app.is_empty() || version.is_empty() {
            return None;
        }
        let role = role.parse().ok()?;
        Some(Self::new(app, role, version))
    }
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-v{}", self.app, self.role, self.version)
    }
}

/// The current static and dynamic partitions of one worker version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSet {
    pub static_cache: PartitionName,
    pub dynamic_cache: PartitionName,
}

impl PartitionSet {
    /// Names that survive activation; everything else is stale.
    pub fn current_names(&self) -> Vec<String> {
        vec![self.static_cache.to_string(), self.dynamic_cache.to_string()]
    }

    pub fn name_for(&self, role: PartitionRole) -> &PartitionName {
        match role {
            PartitionRole::Static => &self.static_cache,
            PartitionRole::Dynamic => &self.dynamic_cache,
        }
    }
}
