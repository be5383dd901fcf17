//! Logging setup
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to
//! this crate's targets and `tower_http` logs requests at info.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Logging initialization errors
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Default filter directives for a level
pub fn default_directives(level: &str) -> String {
    format!(
        "querybuilder={level},querybuilder_api={level},querybuilder_cli={level},tower_http=info",
        level = level
    )
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));
    let json = config.format.eq_ignore_ascii_case("json");
    let file = match &config.file {
        Some(path) => Some(open_log_file(Path::new(path))?),
        None => None,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match (json, file) {
        (true, Some(f)) => registry.with(fmt::layer().json().with_writer(Mutex::new(f))).try_init(),
        (true, None) => registry.with(fmt::layer().json()).try_init(),
        (false, Some(f)) => registry
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(f)))
            .try_init(),
        (false, None) => registry.with(fmt::layer()).try_init(),
    };

    result.map_err(|e| LoggingError::Init(e.to_string()))
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        let directives = default_directives("debug");
        assert!(directives.starts_with("querybuilder=debug"));
        assert!(EnvFilter::try_new(directives).is_ok());
    }

    #[test]
    fn test_log_file_created() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("qb.log");

        open_log_file(&path).unwrap();

        assert!(path.exists());
    }
}
