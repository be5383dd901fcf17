//! Database bootstrap
//!
//! Opens (creating if needed) the SQLite file, creates the sample tables
//! and the `saved_queries` table, and seeds sample rows into an empty
//! database.

pub mod schema;
pub mod seed;

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

use crate::config::DatabaseConfig;

/// Database bootstrap errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// A prepared database file
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Open or create the database at `path`, seeding it when `seed` is set and it is empty
    pub fn open(path: impl AsRef<Path>, seed: bool) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        schema::create_all(&conn)?;

        if seed && seed::is_empty(&conn)? {
            seed::populate(&mut conn)?;
        }

        tracing::info!(path = %path.display(), "Database ready");
        Ok(Self { path })
    }

    /// Open using the `[database]` section of the configuration
    pub fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        Self::open(&config.path, config.seed_sample_data)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
