//! Bounded, read-only query execution

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, OpenFlags, ToSql};
use serde::Serialize;
use serde_json::{Map, Value};

use super::error::ExecutionError;
use crate::compiler::{CompiledQuery, OutputColumn, SqlValue};
use crate::metadata::FieldType;

/// One result row, keyed by column name
pub type Row = Map<String, Value>;

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Integer(i) => ToSqlOutput::from(*i),
            SqlValue::Real(x) => ToSqlOutput::from(*x),
            SqlValue::Text(s) => ToSqlOutput::from(s.as_str()),
            SqlValue::Bool(b) => ToSqlOutput::from(*b),
        })
    }
}

/// Gateway limits
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Wall-clock limit for one query
    pub timeout: Duration,
    /// How long SQLite waits on a locked database before giving up
    pub busy_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            busy_timeout: Duration::from_millis(1000),
        }
    }
}

/// Rows returned by a successful execution
#[derive(Debug, Clone, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

/// Runs compiled queries against the SQLite file
///
/// Each execution opens its own read-only connection, so a compiled
/// statement can never modify data whatever its text.
#[derive(Debug, Clone)]
pub struct QueryGateway {
    database: PathBuf,
    config: GatewayConfig,
}

impl QueryGateway {
    pub fn new(database: impl Into<PathBuf>, config: GatewayConfig) -> Self {
        Self {
            database: database.into(),
            config,
        }
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn open(&self) -> Result<Connection, ExecutionError> {
        let conn = Connection::open_with_flags(
            &self.database,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            tracing::warn!(path = %self.database.display(), error = %e, "Cannot open database");
            ExecutionError::unavailable()
        })?;

        conn.busy_timeout(self.config.busy_timeout)
            .map_err(|e| ExecutionError::from_sqlite(&e))?;

        Ok(conn)
    }

    /// Execute a compiled query
    ///
    /// The row bound is the `LIMIT` already in the compiled text. On timeout
    /// the running statement is interrupted and `Timeout` is returned; the
    /// query is never retried. A worker that had not started yet when the
    /// limit passed sees the cancel flag and returns without running.
    pub async fn execute(&self, query: &CompiledQuery) -> Result<QueryRows, ExecutionError> {
        let conn = self.open()?;
        let interrupt = conn.get_interrupt_handle();
        let cancelled = Arc::new(AtomicBool::new(false));
        let worker_cancelled = Arc::clone(&cancelled);

        let sql = query.sql.clone();
        let params = query.params.clone();
        let columns = query.columns.clone();
        let limit = query.limit as usize;

        tracing::debug!(sql = %sql, params = params.len(), "Executing query");

        let started = Instant::now();
        let task = tokio::task::spawn_blocking(move || {
            read_rows(&conn, &sql, &params, &columns, limit, &worker_cancelled)
        });

        let result = match tokio::time::timeout(self.config.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Query worker failed");
                Err(ExecutionError::internal())
            }
            Err(_) => {
                cancelled.store(true, Ordering::SeqCst);
                interrupt.interrupt();
                tracing::warn!(
                    table = %query.table,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "Query timed out"
                );
                Err(ExecutionError::timeout(self.config.timeout.as_millis()))
            }
        };

        let (names, rows) = result?;
        let execution_time_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            table = %query.table,
            rows = rows.len(),
            elapsed_ms = execution_time_ms,
            "Query executed"
        );

        Ok(QueryRows {
            columns: names,
            row_count: rows.len(),
            rows,
            execution_time_ms,
        })
    }

    /// Check that the database can be opened and read
    pub async fn ping(&self) -> Result<(), ExecutionError> {
        let conn = self.open()?;
        tokio::task::spawn_blocking(move || {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
                .map_err(|e| ExecutionError::from_sqlite(&e))
        })
        .await
        .map_err(|_| ExecutionError::internal())?
    }
}

fn read_rows(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
    columns: &[OutputColumn],
    limit: usize,
    cancelled: &AtomicBool,
) -> Result<(Vec<String>, Vec<Row>), ExecutionError> {
    if cancelled.load(Ordering::SeqCst) {
        return Err(ExecutionError::cancelled());
    }

    let mut stmt = conn.prepare(sql).map_err(|e| ExecutionError::from_sqlite(&e))?;

    let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let boolean: Vec<bool> = names
        .iter()
        .map(|name| {
            columns
                .iter()
                .any(|c| &c.name == name && c.field_type == FieldType::Boolean)
        })
        .collect();

    // The interrupt only reaches a statement that is already stepping
    if cancelled.load(Ordering::SeqCst) {
        return Err(ExecutionError::cancelled());
    }

    let mut rows = stmt
        .query(rusqlite::params_from_iter(params.iter()))
        .map_err(|e| ExecutionError::from_sqlite(&e))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| ExecutionError::from_sqlite(&e))? {
        if cancelled.load(Ordering::Relaxed) {
            return Err(ExecutionError::cancelled());
        }
        let mut record = Map::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let value = row.get_ref(i).map_err(|e| ExecutionError::from_sqlite(&e))?;
            record.insert(name.clone(), to_json(value, boolean[i]));
        }
        out.push(record);
        if out.len() >= limit {
            break;
        }
    }

    Ok((names, out))
}

fn to_json(value: ValueRef<'_>, boolean: bool) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if boolean => Value::Bool(i != 0),
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(x) => serde_json::Number::from_f64(x).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
    }
}
