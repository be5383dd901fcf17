//! Query Execution Gateway
//!
//! Runs a `CompiledQuery` on a fresh read-only SQLite connection inside
//! `spawn_blocking`, bounded by the statement's `LIMIT` and a wall-clock
//! timeout. Failures come back as `ExecutionError { kind, message }` with
//! a message that is safe to show; raw engine text only goes to the log.

mod error;
mod executor;

pub use error::{ExecutionError, ExecutionErrorKind};
pub use executor::{GatewayConfig, QueryGateway, QueryRows, Row};
