//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::compiler::SqlCompiler;
use crate::config::{ApiConfig, Config};
use crate::db::{Database, DbError};
use crate::gateway::QueryGateway;
use crate::metadata::{Catalog, CatalogError};
use crate::store::{SavedQueryStore, StoreError};

/// Failures while assembling the application state
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Database setup failed: {0}")]
    Database(#[from] DbError),

    #[error("Metadata catalog failed to load: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Saved query store failed to open: {0}")]
    Store(#[from] StoreError),
}

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Rule tree compiler bound to the metadata catalog
    pub compiler: Arc<SqlCompiler>,
    /// Read-only executor for compiled queries
    pub gateway: Arc<QueryGateway>,
    /// Saved query persistence
    pub store: SavedQueryStore,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState from its parts
    pub fn new(compiler: Arc<SqlCompiler>, gateway: Arc<QueryGateway>, store: SavedQueryStore, config: ApiConfig) -> Self {
        Self {
            compiler,
            gateway,
            store,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Prepare the database, load the catalog and open the store
    pub fn from_config(config: &Config) -> Result<Self, StateError> {
        let database = Database::from_config(&config.database)?;
        let catalog = Catalog::load(config.metadata.catalog_path.as_deref())?;

        let compiler = SqlCompiler::with_config(Arc::new(catalog), config.query.compiler_config());
        let gateway = QueryGateway::new(database.path(), config.query.gateway_config(&config.database));
        let store = SavedQueryStore::open(database.path())?;

        Ok(Self::new(Arc::new(compiler), Arc::new(gateway), store, config.api.clone()))
    }

    /// The metadata catalog the compiler validates against
    pub fn catalog(&self) -> &Catalog {
        self.compiler.catalog()
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
