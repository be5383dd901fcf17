//! Saved Query Store
//!
//! Keyed records of named rule trees. A saved query is immutable once
//! created; the only mutation after creation is deletion.
//!
//! The store holds one read-write SQLite connection behind a mutex and
//! runs every statement on the blocking pool.

mod error;

pub use error::{StoreError, StoreResult};

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::schema::SAVED_QUERIES;

/// Longest accepted name, in characters
pub const MAX_NAME_LEN: usize = 200;

/// A stored query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuery {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Canonical JSON of the rule tree
    pub query_json: String,
    pub sql_query: Option<String>,
    pub table_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for `SavedQueryStore::create`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSavedQuery {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub query_json: String,
    #[serde(default)]
    pub sql_query: Option<String>,
    pub table_name: String,
}

impl NewSavedQuery {
    /// Check field constraints before touching the database
    pub fn validate(&self) -> StoreResult<()> {
        let name_len = self.name.trim().chars().count();
        if name_len == 0 {
            return Err(StoreError::Validation("name must not be empty".into()));
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(StoreError::Validation(format!(
                "name must be at most {} characters",
                MAX_NAME_LEN
            )));
        }
        if self.query_json.trim().is_empty() {
            return Err(StoreError::Validation("query_json must not be empty".into()));
        }
        if self.table_name.trim().is_empty() {
            return Err(StoreError::Validation("table_name must not be empty".into()));
        }
        Ok(())
    }
}

/// SQLite-backed saved query store
#[derive(Clone)]
pub struct SavedQueryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SavedQueryStore {
    /// Open the store in an existing or new database file
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::from_connection(conn)
    }

    /// Store backed by a private in-memory database
    pub fn in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SAVED_QUERIES)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with the connection on the blocking pool
    async fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Lock)?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Internal(format!("store task failed: {}", e)))?
    }

    /// Insert a new saved query and return it with its generated id
    pub async fn create(&self, new: NewSavedQuery) -> StoreResult<SavedQuery> {
        new.validate()?;

        let saved = self
            .with_conn(move |conn| {
                let now = Utc::now();
                let stamp = now.to_rfc3339();
                conn.execute(
                    "INSERT INTO saved_queries
                        (name, description, query_json, sql_query, table_name, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                    params![
                        new.name,
                        new.description,
                        new.query_json,
                        new.sql_query,
                        new.table_name,
                        stamp,
                        stamp
                    ],
                )?;

                Ok(SavedQuery {
                    id: conn.last_insert_rowid(),
                    name: new.name,
                    description: new.description,
                    query_json: new.query_json,
                    sql_query: new.sql_query,
                    table_name: new.table_name,
                    created_at: now,
                    updated_at: now,
                })
            })
            .await?;

        tracing::info!(id = saved.id, name = %saved.name, table = %saved.table_name, "Saved query created");
        Ok(saved)
    }

    /// Saved queries in id order, paginated
    pub async fn list(&self, skip: usize, limit: usize) -> StoreResult<Vec<SavedQuery>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, query_json, sql_query, table_name, created_at, updated_at
                 FROM saved_queries ORDER BY id LIMIT ? OFFSET ?",
            )?;
            let rows = stmt.query_map(params![limit as i64, skip as i64], row_to_saved)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
        })
        .await
    }

    /// Fetch one saved query
    pub async fn get(&self, id: i64) -> StoreResult<SavedQuery> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, name, description, query_json, sql_query, table_name, created_at, updated_at
                 FROM saved_queries WHERE id = ?",
                params![id],
                row_to_saved,
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))
        })
        .await
    }

    /// Delete a saved query
    pub async fn delete(&self, id: i64) -> StoreResult<()> {
        let deleted = self
            .with_conn(move |conn| Ok(conn.execute("DELETE FROM saved_queries WHERE id = ?", params![id])?))
            .await?;

        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }
        tracing::info!(id, "Saved query deleted");
        Ok(())
    }

    /// Number of saved queries
    pub async fn count(&self) -> StoreResult<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM saved_queries", [], |row| row.get(0))?))
            .await
    }
}

fn row_to_saved(row: &rusqlite::Row<'_>) -> rusqlite::Result<SavedQuery> {
    Ok(SavedQuery {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        query_json: row.get(3)?,
        sql_query: row.get(4)?,
        table_name: row.get(5)?,
        created_at: parse_timestamp(row, 6)?,
        updated_at: parse_timestamp(row, 7)?,
    })
}

fn parse_timestamp(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_query(name: &str) -> NewSavedQuery {
        NewSavedQuery {
            name: name.to_string(),
            description: Some("Adults in Boston".into()),
            query_json: r#"{"combinator":"and","not":false,"rules":[]}"#.into(),
            sql_query: None,
            table_name: "users".into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SavedQueryStore::in_memory().unwrap();

        let created = store.create(new_query("Boston adults")).await.unwrap();
        let fetched = store.get(created.id).await.unwrap();

        assert_eq!(fetched.name, "Boston adults");
        assert_eq!(fetched.description.as_deref(), Some("Adults in Boston"));
        assert_eq!(fetched.created_at, fetched.updated_at);
        assert_eq!(fetched.id, created.id);
    }

    #[tokio::test]
    async fn test_list_paginates_in_id_order() {
        let store = SavedQueryStore::in_memory().unwrap();
        for i in 0..5 {
            store.create(new_query(&format!("q{}", i))).await.unwrap();
        }

        let page = store.list(1, 2).await.unwrap();

        let names: Vec<&str> = page.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["q1", "q2"]);
        assert_eq!(store.count().await.unwrap(), 5);
        assert!(store.list(10, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SavedQueryStore::in_memory().unwrap();
        let created = store.create(new_query("temp")).await.unwrap();

        store.delete(created.id).await.unwrap();

        assert!(matches!(store.get(created.id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete(created.id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_name_validation() {
        let store = SavedQueryStore::in_memory().unwrap();

        assert!(matches!(store.create(new_query("  ")).await, Err(StoreError::Validation(_))));
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(store.create(new_query(&long)).await, Err(StoreError::Validation(_))));
        assert!(store.create(new_query(&"x".repeat(MAX_NAME_LEN))).await.is_ok());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("saved.db");

        let id = {
            let store = SavedQueryStore::open(&path).unwrap();
            store.create(new_query("kept")).await.unwrap().id
        };

        let store = SavedQueryStore::open(&path).unwrap();
        assert_eq!(store.get(id).await.unwrap().name, "kept");
    }
}
