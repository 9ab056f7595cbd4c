// crates/consent-gate-config/src/config.rs
// ============================================================================
// Module: Consent Gate Configuration
// Description: Configuration loading and validation for Consent Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: consent-gate-core, consent-gate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file location comes from the caller, then `CONSENT_GATE_CONFIG`, then
//! `consent-gate.toml` in the working directory. A missing default file is
//! not an error: every section has defaults, so an absent file yields the
//! default in-memory configuration. After parsing, the `ANOMALY_PERIOD_MS`
//! environment variable may override the reporting period.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use consent_gate_core::DEFAULT_ANOMALY_PERIOD;
use consent_gate_core::LifecycleConfig;
use consent_gate_store_sqlite::SqliteStoreConfig;
use consent_gate_store_sqlite::SqliteStoreMode;
use consent_gate_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "consent-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CONSENT_GATE_CONFIG";
/// Environment variable overriding `reporting.anomaly_period_ms`.
pub const ANOMALY_PERIOD_ENV_VAR: &str = "ANOMALY_PERIOD_MS";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default HTTP bind address.
const DEFAULT_BIND: &str = "127.0.0.1:8000";
/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Maximum number of CORS origins.
pub(crate) const MAX_CORS_ORIGINS: usize = 64;
/// Maximum length of a single CORS origin.
pub(crate) const MAX_CORS_ORIGIN_LENGTH: usize = 512;
/// Default busy timeout for `SQLite` connections (ms).
const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default number of `SQLite` read connections.
const DEFAULT_READ_POOL_SIZE: usize = 4;
/// Maximum number of `SQLite` read connections.
pub(crate) const MAX_READ_POOL_SIZE: usize = 64;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Consent Gate service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsentGateConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Dialog store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Anomaly reporting configuration.
    #[serde(default)]
    pub reporting: ReportingConfig,
}

impl ConsentGateConfig {
    /// Loads configuration using the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| env::var(key).ok())
    }

    /// Loads configuration using `lookup` in place of the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load_with_env(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path, &lookup)?;
        validate_path(&resolved)?;
        let mut config = if !explicit && !resolved.exists() {
            Self::default()
        } else {
            Self::parse_file(&resolved)?
        };
        config.apply_env_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file with size and encoding checks.
    fn parse_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(
        &mut self,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(ANOMALY_PERIOD_ENV_VAR) {
            let value = raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("{ANOMALY_PERIOD_ENV_VAR} must be an integer"))
            })?;
            self.reporting.anomaly_period_ms = value;
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()?;
        self.reporting.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Origins allowed by CORS; empty disables the CORS layer.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    /// Request audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            cors_allowed_origins: Vec::new(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid server.bind: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.cors_allowed_origins.len() > MAX_CORS_ORIGINS {
            return Err(ConfigError::Invalid("too many cors_allowed_origins".to_string()));
        }
        for origin in &self.cors_allowed_origins {
            validate_origin(origin)?;
        }
        self.audit.validate()
    }
}

/// Request audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Dialog store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use the `SQLite` store.
    Sqlite,
}

/// Dialog store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Number of query-only `SQLite` connections.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_pool_size: default_read_pool_size(),
        }
    }
}

impl StoreConfig {
    /// Returns the `SQLite` store config when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match self.store_type {
            StoreType::Memory => None,
            StoreType::Sqlite => self.path.as_ref().map(|path| SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
                read_pool_size: self.read_pool_size,
            }),
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())?;
                if self.read_pool_size == 0 || self.read_pool_size > MAX_READ_POOL_SIZE {
                    return Err(ConfigError::Invalid(format!(
                        "store.read_pool_size must be between 1 and {MAX_READ_POOL_SIZE}"
                    )));
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// SECTION: Reporting
// ============================================================================

/// Anomaly reporting configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportingConfig {
    /// Age in milliseconds past which undecided pending rows are anomalies.
    #[serde(default = "default_anomaly_period_ms")]
    pub anomaly_period_ms: u64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            anomaly_period_ms: default_anomaly_period_ms(),
        }
    }
}

impl ReportingConfig {
    /// Returns the anomaly period as a duration.
    #[must_use]
    pub const fn anomaly_period(&self) -> Duration {
        Duration::from_millis(self.anomaly_period_ms)
    }

    /// Returns lifecycle service settings derived from this section.
    #[must_use]
    pub const fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            anomaly_period: self.anomaly_period(),
        }
    }

    /// Validates reporting configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.anomaly_period_ms == 0 {
            return Err(ConfigError::Invalid(
                "reporting.anomaly_period_ms must be greater than zero".to_string(),
            ));
        }
        if i64::try_from(self.anomaly_period_ms).is_err() {
            return Err(ConfigError::Invalid("reporting.anomaly_period_ms too large".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Returns the default request body limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Returns the default audit toggle.
const fn default_audit_enabled() -> bool {
    true
}

/// Returns the default store busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

/// Returns the default read pool size.
const fn default_read_pool_size() -> usize {
    DEFAULT_READ_POOL_SIZE
}

/// Returns the default anomaly period in milliseconds.
fn default_anomaly_period_ms() -> u64 {
    u64::try_from(DEFAULT_ANOMALY_PERIOD.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller, environment, or default name.
///
/// The flag is true when the path was chosen explicitly.
fn resolve_path(
    path: Option<&Path>,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Some(env_path) = lookup(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates one CORS origin: `http(s)://host[:port]` with no path.
fn validate_origin(origin: &str) -> Result<(), ConfigError> {
    if origin.len() > MAX_CORS_ORIGIN_LENGTH {
        return Err(ConfigError::Invalid("cors origin exceeds max length".to_string()));
    }
    let rest = origin
        .strip_prefix("https://")
        .or_else(|| origin.strip_prefix("http://"))
        .ok_or_else(|| {
            ConfigError::Invalid(format!("cors origin must start with http:// or https://: {origin}"))
        })?;
    if rest.is_empty() || rest.contains('/') || rest.contains('*') {
        return Err(ConfigError::Invalid(format!(
            "cors origin must be scheme://host[:port]: {origin}"
        )));
    }
    if !origin.chars().all(|ch| ch.is_ascii_graphic()) {
        return Err(ConfigError::Invalid(format!("cors origin must be visible ascii: {origin}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use super::MAX_PATH_COMPONENT_LENGTH;
    use super::validate_origin;
    use super::validate_path_string;

    #[test]
    fn origin_accepts_host_and_port() {
        validate_origin("http://localhost:3000").unwrap();
        validate_origin("https://app.example.com").unwrap();
    }

    #[test]
    fn origin_rejects_wildcards_paths_and_schemes() {
        assert!(validate_origin("*").is_err());
        assert!(validate_origin("https://*.example.com").is_err());
        assert!(validate_origin("https://example.com/app").is_err());
        assert!(validate_origin("ftp://example.com").is_err());
        assert!(validate_origin("https://").is_err());
    }

    #[test]
    fn path_string_rejects_blank_and_overlong_component() {
        assert!(validate_path_string("store.path", "  ").is_err());
        let long = "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        let err = validate_path_string("store.path", &long).unwrap_err();
        assert!(err.to_string().contains("component too long"));
    }
}
