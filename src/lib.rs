//! # Query Builder
//!
//! Compile visual filter rule trees into parameterized SQL, run them
//! against a SQLite database under strict bounds, and keep named queries.
//!
//! ## Features
//!
//! - **Safe compilation**: identifiers come only from the metadata catalog,
//!   every user value is a bound parameter
//! - **Nested logic**: AND/OR groups, negation and `IN (SELECT ...)` subqueries
//! - **Bounded execution**: read-only connections, row limits and interrupted timeouts
//! - **Saved queries**: named rule trees with their derived SQL
//!
//! ## Modules
//!
//! - [`rules`]: Rule tree model, JSON form and structural edits
//! - [`metadata`]: Field metadata catalog
//! - [`compiler`]: Rule tree to SQL compiler
//! - [`gateway`]: Bounded query execution
//! - [`store`]: Saved query store
//! - [`db`]: Database bootstrap and sample data
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use querybuilder::compiler::SqlCompiler;
//! use querybuilder::metadata::Catalog;
//! use querybuilder::rules::{Operator, Rule, RuleGroup};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let compiler = SqlCompiler::new(Arc::new(Catalog::sample()));
//!
//!     let tree = RuleGroup::and(vec![])
//!         .with(Rule::new("age", Operator::Gt, 30))
//!         .with(RuleGroup::or(vec![
//!             Rule::new("city", Operator::Eq, "Boston").into(),
//!             Rule::new("city", Operator::Eq, "Denver").into(),
//!         ]));
//!
//!     let filter = compiler.compile(&tree, "users")?;
//!     assert_eq!(filter.sql, "age > ? AND (city = ? OR city = ?)");
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod compiler;
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod metadata;
pub mod rules;
pub mod store;

// Re-export top-level types for convenience
pub use rules::{
    Combinator, NodePath, Operator, Rule, RuleGroup, RuleNode, RuleValue, Scalar, SubqueryRef, TreeError,
};

pub use metadata::{Catalog, CatalogError, FieldMetadata, FieldType, TableMetadata};

pub use compiler::{CompileError, CompiledFilter, CompiledQuery, CompilerConfig, SqlCompiler, SqlValue};

pub use gateway::{ExecutionError, ExecutionErrorKind, GatewayConfig, QueryGateway, QueryRows};

pub use store::{NewSavedQuery, SavedQuery, SavedQueryStore, StoreError};

pub use db::{Database, DbError};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{ApiConfig, Config, ConfigError, LoggingConfig};
