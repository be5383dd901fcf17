//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `QUERYBUILDER_*` environment overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::compiler::CompilerConfig;
use crate::gateway::GatewayConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// SQLite database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_seed")]
    pub seed_sample_data: bool,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./query_builder.db")
}

fn default_seed() -> bool {
    true
}

fn default_busy_timeout() -> u64 {
    1000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            seed_sample_data: default_seed(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    1024 * 1024 // 1 MB
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            request_timeout_secs: default_request_timeout(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Compilation and execution limits
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    #[serde(default = "default_query_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_depth")]
    pub max_subquery_depth: usize,
}

fn default_limit() -> u32 {
    100
}

fn default_max_limit() -> u32 {
    1000
}

fn default_query_timeout() -> u64 {
    5000
}

fn default_max_depth() -> usize {
    8
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            timeout_ms: default_query_timeout(),
            max_subquery_depth: default_max_depth(),
        }
    }
}

impl QueryConfig {
    /// Compiler limits from this section
    pub fn compiler_config(&self) -> CompilerConfig {
        CompilerConfig {
            max_subquery_depth: self.max_subquery_depth,
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }

    /// Gateway limits from this section and the database busy timeout
    pub fn gateway_config(&self, database: &DatabaseConfig) -> GatewayConfig {
        GatewayConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            busy_timeout: Duration::from_millis(database.busy_timeout_ms),
        }
    }
}

/// Field metadata source
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataConfig {
    /// JSON catalog file; the built-in sample catalog when unset
    pub catalog_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        // Try default config locations
        let config_paths = [
            dirs::config_dir().map(|p| p.join("querybuilder").join("config.toml")),
            Some(PathBuf::from("/etc/querybuilder/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Load an explicit file when given, otherwise search the default locations
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load_with_env(p),
            None => Ok(Self::load_default()),
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Database overrides
        if let Some(path) = var("QUERYBUILDER_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(seed) = var("QUERYBUILDER_SEED_SAMPLE_DATA") {
            self.database.seed_sample_data = seed.to_lowercase() != "false" && seed != "0";
        }

        // API overrides
        if let Some(host) = var("QUERYBUILDER_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("QUERYBUILDER_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }
        if let Some(origins) = var("QUERYBUILDER_CORS_ORIGINS") {
            self.api.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        // Query overrides
        if let Some(timeout) = var("QUERYBUILDER_QUERY_TIMEOUT_MS") {
            if let Ok(t) = timeout.parse() {
                self.query.timeout_ms = t;
            }
        }
        if let Some(max) = var("QUERYBUILDER_MAX_LIMIT") {
            if let Ok(m) = max.parse() {
                self.query.max_limit = m;
            }
        }

        // Metadata overrides
        if let Some(catalog) = var("QUERYBUILDER_CATALOG_PATH") {
            self.metadata.catalog_path = Some(PathBuf::from(catalog));
        }

        // Logging overrides
        if let Some(level) = var("QUERYBUILDER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("QUERYBUILDER_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Query Builder Configuration
#
# Environment variables override these settings:
# - QUERYBUILDER_DATABASE_PATH
# - QUERYBUILDER_SEED_SAMPLE_DATA
# - QUERYBUILDER_API_HOST
# - QUERYBUILDER_API_PORT
# - QUERYBUILDER_CORS_ORIGINS (comma-separated)
# - QUERYBUILDER_QUERY_TIMEOUT_MS
# - QUERYBUILDER_MAX_LIMIT
# - QUERYBUILDER_CATALOG_PATH
# - QUERYBUILDER_LOG_LEVEL
# - QUERYBUILDER_LOG_FORMAT

[database]
# SQLite database file (created if missing)
path = "./query_builder.db"

# Fill an empty database with sample users, products and orders
seed_sample_data = true

# How long to wait on a locked database (ms)
busy_timeout_ms = 1000

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8000

# Allowed CORS origins (["*"] allows any origin)
cors_origins = ["http://localhost:3000"]

# Request timeout in seconds
request_timeout_secs = 30

# Largest accepted request body (bytes)
max_body_size = 1048576

[query]
# Rows returned when a request gives no limit
default_limit = 100

# Upper bound for requested limits
max_limit = 1000

# Per-query execution timeout (ms)
timeout_ms = 5000

# Maximum nesting of IN / NOT IN subqueries
max_subquery_depth = 8

[metadata]
# Optional JSON catalog replacing the built-in sample tables
# catalog_path = "/etc/querybuilder/catalog.json"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/querybuilder/querybuilder.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_template_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();

        assert_eq!(config.api.port, 8000);
        assert_eq!(config.query.max_limit, 1000);
        assert_eq!(config.database.path, PathBuf::from("./query_builder.db"));
        assert!(config.metadata.catalog_path.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse(
            r#"
            [query]
            timeout_ms = 250

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.query.timeout_ms, 250);
        assert_eq!(config.query.default_limit, 100);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.api.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(
            config.query.gateway_config(&config.database).timeout,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("QUERYBUILDER_API_PORT", "9100"),
            ("QUERYBUILDER_CORS_ORIGINS", "http://a.test, http://b.test"),
            ("QUERYBUILDER_SEED_SAMPLE_DATA", "false"),
            ("QUERYBUILDER_MAX_LIMIT", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.port, 9100);
        assert_eq!(config.api.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert!(!config.database.seed_sample_data);
        assert_eq!(config.query.max_limit, 1000);
    }

    #[test]
    fn test_load_reports_path() {
        let err = Config::load(Path::new("/nonexistent/querybuilder.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
