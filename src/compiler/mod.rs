//! SQL Compiler
//!
//! Turns a `RuleGroup` into parameterized SQLite SQL:
//!
//! - **codegen**: recursive rendering of groups, rules and subqueries
//! - **value**: bound parameter values and per-field-type coercion
//! - **ident**: identifier quoting
//! - **error**: compile errors, split into structure and metadata kinds
//!
//! # Output
//!
//! ```text
//! {and: [{or: [category = Electronics, category = Furniture]}, price < 500]}
//!
//! (category = ? OR category = ?) AND price < ?      params: ["Electronics", "Furniture", 500]
//! ```
//!
//! The root group is emitted without parentheses, nested groups always
//! with. Every user value becomes a `?` placeholder and params are
//! collected in the order the placeholders appear, subqueries included.
//! Identifiers only ever come from the metadata catalog.

mod codegen;
mod error;
mod ident;
mod value;

pub use codegen::{CompiledFilter, CompiledQuery, CompilerConfig, OutputColumn, SqlCompiler, TAUTOLOGY};
pub use error::{CompileError, CompileResult, ErrorKind};
pub use ident::quote_ident;
pub use value::{coerce, like_pattern, normalize_date, SqlValue, DATE_FORMAT};
