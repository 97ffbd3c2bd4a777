//! Authorization kernel configuration.

use anyhow::Result;
use config::{Config, Environment, File};
use gateway_core::EntityType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Authorization kernel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RbacConfig {
    /// TTL for cached role assignments, in milliseconds.
    #[serde(default = "default_role_cache_ttl")]
    pub role_cache_ttl_ms: u64,

    /// TTL for cached administrative-user answers, in milliseconds.
    #[serde(default = "default_admin_cache_ttl")]
    pub admin_cache_ttl_ms: u64,

    /// Maximum number of users per cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Whether read-only entities are enforced.
    #[serde(default = "default_true")]
    pub protection_enabled: bool,

    /// Types whose blanket permission lets a header filter skip per-item checks.
    #[serde(default)]
    pub filter_governing_types: Vec<EntityType>,

    /// Capacity of the in-memory decision audit sink.
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (json, pretty).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_role_cache_ttl() -> u64 {
    1000
}

fn default_admin_cache_ttl() -> u64 {
    5000
}

fn default_cache_capacity() -> usize {
    10_000
}

fn default_audit_capacity() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl RbacConfig {
    /// Loads configuration from files and environment.
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("RBAC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let rbac_config: RbacConfig = config.try_deserialize()?;
        rbac_config.validate()?;

        Ok(rbac_config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            anyhow::bail!("Invalid cache_capacity: 0");
        }

        if self.audit_capacity == 0 {
            anyhow::bail!("Invalid audit_capacity: 0");
        }

        if !self.protection_enabled {
            tracing::warn!("Read-only entity protection is disabled");
        }

        Ok(())
    }

    /// Returns the role cache TTL.
    #[must_use]
    pub fn role_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.role_cache_ttl_ms)
    }

    /// Returns the administrative-user cache TTL.
    #[must_use]
    pub fn admin_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.admin_cache_ttl_ms)
    }
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            role_cache_ttl_ms: default_role_cache_ttl(),
            admin_cache_ttl_ms: default_admin_cache_ttl(),
            cache_capacity: default_cache_capacity(),
            protection_enabled: true,
            filter_governing_types: Vec::new(),
            audit_capacity: default_audit_capacity(),
            telemetry: TelemetryConfig::default(),
        }
    }
}
