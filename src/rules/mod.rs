//! Rule-Tree Model
//!
//! The in-memory form of a query-builder filter:
//!
//! - **tree**: `RuleGroup` / `Rule` / `SubqueryRef` and their JSON wire format
//! - **edit**: path-addressed structural edits (add, remove, move, update)
//! - **error**: edit errors
//!
//! # Wire Format
//!
//! ```text
//! {
//!   "combinator": "and",
//!   "not": false,
//!   "rules": [
//!     { "field": "price", "operator": "<", "value": 500 },
//!     { "combinator": "or", "rules": [
//!         { "field": "category", "operator": "=", "value": "Electronics" },
//!         { "field": "category", "operator": "=", "value": "Furniture" }
//!     ]}
//!   ]
//! }
//! ```
//!
//! A rule's `value` may also be a subquery for `in` / `notIn`:
//!
//! ```text
//! { "field": "id", "operator": "in",
//!   "value": { "table": "orders", "selectFields": ["user_id"],
//!              "where": { "combinator": "and", "rules": [...] } } }
//! ```

mod edit;
mod error;
mod tree;

pub use edit::NodePath;
pub use error::{TreeError, TreeResult};
pub use tree::{Combinator, Operator, OperandShape, Rule, RuleGroup, RuleNode, RuleValue, Scalar, SubqueryRef};
