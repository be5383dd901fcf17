//! Query Builder API Server
//!
//! Run with: cargo run --bin querybuilder-api
//!
//! # Configuration
//!
//! Reads `--config <path>` when given, otherwise the first of
//! `~/.config/querybuilder/config.toml`, `/etc/querybuilder/config.toml`
//! and `./config.toml` that exists. Environment variables override file
//! settings:
//! - `QUERYBUILDER_DATABASE_PATH`: SQLite file (default: ./query_builder.db)
//! - `QUERYBUILDER_API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `QUERYBUILDER_API_PORT`: Port to listen on (default: 8000)
//! - `QUERYBUILDER_CORS_ORIGINS`: Comma-separated allowed origins
//! - `QUERYBUILDER_QUERY_TIMEOUT_MS`: Per-query timeout (default: 5000)
//! - `QUERYBUILDER_CATALOG_PATH`: JSON metadata catalog (default: built-in)
//! - `RUST_LOG`: Log filter (overrides the configured level)

use clap::Parser;
use querybuilder::api::{serve, AppState};
use querybuilder::config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "querybuilder-api")]
#[command(about = "Query Builder REST API server", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = Config::resolve(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.api.port = port;
    }

    querybuilder::logging::init(&config.logging)?;

    tracing::info!("Starting Query Builder API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Database: {:?}", config.database.path);
    match &config.metadata.catalog_path {
        Some(path) => tracing::info!("Metadata catalog: {:?}", path),
        None => tracing::info!("Metadata catalog: built-in sample tables"),
    }

    let state = AppState::from_config(&config)?;
    tracing::info!("{} tables available", state.catalog().tables.len());

    // Run server
    tracing::info!("Starting server on {}", config.api.addr());
    serve(state, &config.api).await?;

    tracing::info!("Query Builder API server stopped");
    Ok(())
}
