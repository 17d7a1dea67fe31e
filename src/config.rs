//! Engine configuration
//!
//! Loaded from a JSON file. Every field except the database URL, the catalog
//! path and the token secret has a default. Invalid configuration is fatal:
//! the process does not serve.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::observability::Severity;
use crate::pagination::TokenConfig;
use crate::plan::LimitPolicy;

/// Configuration error (always fatal)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        "CONFIG_INVALID"
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FATAL] {}: {}", self.code(), self.message)
    }
}

impl std::error::Error for ConfigError {}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Host to bind to (default: "127.0.0.1")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl HttpConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Engine configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// sqlx connection URL, e.g. `sqlite://data/shop.db`
    pub database_url: String,

    /// Entity catalog JSON file
    pub catalog_path: PathBuf,

    /// Largest accepted page size (default: 1000)
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    /// Page size when a plan has no limit (default: 100)
    #[serde(default = "default_default_limit")]
    pub default_limit: u32,

    /// HMAC secret for continuation tokens
    pub token_secret: String,

    /// Token lifetime and idle lifetime of compiled queries (default: 900)
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    #[serde(default = "default_token_issuer")]
    pub token_issuer: String,

    #[serde(default = "default_token_audience")]
    pub token_audience: String,

    /// Statement timeout (default: 5000)
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Pool size (default: 8)
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Pool acquire timeout (default: 2000)
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// Open the database read-only (default: true)
    #[serde(default = "default_read_only")]
    pub read_only: bool,

    /// Minimum log severity (default: "INFO")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub http: HttpConfig,
}

fn default_max_limit() -> u32 {
    1000
}
fn default_default_limit() -> u32 {
    100
}
fn default_token_ttl_secs() -> u64 {
    900
}
fn default_token_issuer() -> String {
    "querypilot".to_string()
}
fn default_token_audience() -> String {
    "querypilot".to_string()
}
fn default_query_timeout_ms() -> u64 {
    5000
}
fn default_max_connections() -> u32 {
    8
}
fn default_acquire_timeout_ms() -> u64 {
    2000
}
fn default_read_only() -> bool {
    true
}
fn default_log_level() -> String {
    "INFO".to_string()
}

impl EngineConfig {
    /// Builds a configuration with defaults for everything optional.
    pub fn new(
        database_url: impl Into<String>,
        catalog_path: impl Into<PathBuf>,
        token_secret: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            catalog_path: catalog_path.into(),
            max_limit: default_max_limit(),
            default_limit: default_default_limit(),
            token_secret: token_secret.into(),
            token_ttl_secs: default_token_ttl_secs(),
            token_issuer: default_token_issuer(),
            token_audience: default_token_audience(),
            query_timeout_ms: default_query_timeout_ms(),
            max_connections: default_max_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            read_only: default_read_only(),
            log_level: default_log_level(),
            http: HttpConfig::default(),
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Checks value constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_limit == 0 {
            return Err(ConfigError::new("max_limit must be > 0"));
        }
        if self.default_limit == 0 {
            return Err(ConfigError::new("default_limit must be > 0"));
        }
        if self.default_limit > self.max_limit {
            return Err(ConfigError::new(format!(
                "default_limit ({}) must not exceed max_limit ({})",
                self.default_limit, self.max_limit
            )));
        }
        if self.token_secret.trim().is_empty() {
            return Err(ConfigError::new("token_secret must not be empty"));
        }
        if self.token_ttl_secs == 0 {
            return Err(ConfigError::new("token_ttl_secs must be > 0"));
        }
        if self.query_timeout_ms == 0 {
            return Err(ConfigError::new("query_timeout_ms must be > 0"));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::new("max_connections must be > 0"));
        }
        if Severity::parse(&self.log_level).is_none() {
            return Err(ConfigError::new(format!(
                "Invalid log_level: '{}'",
                self.log_level
            )));
        }
        Ok(())
    }

    pub fn limits(&self) -> LimitPolicy {
        LimitPolicy {
            max_limit: self.max_limit,
            default_limit: self.default_limit,
        }
    }

    pub fn token_config(&self) -> TokenConfig {
        let ttl_secs = i64::try_from(self.token_ttl_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1000);
        TokenConfig {
            secret: self.token_secret.clone(),
            ttl: Duration::seconds(ttl_secs),
            issuer: self.token_issuer.clone(),
            audience: self.token_audience.clone(),
        }
    }

    pub fn query_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.query_timeout_ms)
    }

    pub fn acquire_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn log_severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_applied() {
        let file = write_config(
            r#"{"database_url": "sqlite::memory:", "catalog_path": "catalog.json", "token_secret": "s"}"#,
        );
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.max_limit, 1000);
        assert_eq!(config.default_limit, 100);
        assert_eq!(config.token_ttl_secs, 900);
        assert_eq!(config.query_timeout_ms, 5000);
        assert!(config.read_only);
        assert_eq!(config.http.socket_addr(), "127.0.0.1:8080");
        assert_eq!(config.log_severity(), Severity::Info);
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let file = write_config(r#"{"database_url": "sqlite::memory:", "catalog_path": "c.json"}"#);
        assert!(EngineConfig::load(file.path()).is_err());

        let mut config = EngineConfig::new("sqlite::memory:", "c.json", "  ");
        assert!(config.validate().is_err());
        config.token_secret = "secret".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_limit_constraints() {
        let mut config = EngineConfig::new("sqlite::memory:", "c.json", "secret");
        config.default_limit = 2000;
        assert!(config.validate().unwrap_err().message().contains("default_limit"));

        config.default_limit = 0;
        assert!(config.validate().is_err());

        config.default_limit = 10;
        config.max_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = EngineConfig::new("sqlite::memory:", "c.json", "secret");
        config.log_level = "LOUD".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/querypilot.json")).unwrap_err();
        assert!(err.to_string().contains("FATAL"));
    }
}
