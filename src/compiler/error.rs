//! Compile errors

use serde::Serialize;
use thiserror::Error;

use crate::rules::Operator;

/// Which side of a request a compile error blames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The tree itself is malformed (arity, missing values, nesting)
    Structure,
    /// The tree names a table, field or column the catalog does not know
    Metadata,
}

/// Errors raised while turning a rule tree into SQL
///
/// All of these are detected before any database access.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    #[error("Unknown field '{field}' for table '{table}'")]
    UnknownField { table: String, field: String },

    #[error("Operator '{operator}' is not allowed on field '{field}'")]
    OperatorNotAllowed { field: String, operator: Operator },

    #[error("Operator '{operator}' on field '{field}' requires a value")]
    MissingValue { field: String, operator: Operator },

    #[error("Operator '{operator}' on field '{field}' needs at least one value")]
    EmptyListOperand { field: String, operator: Operator },

    #[error("Operator '{operator}' expects {expected} value(s), got {found}")]
    BadOperandArity {
        operator: Operator,
        expected: usize,
        found: usize,
    },

    #[error("Value {value} does not fit field '{field}' of type {expected}")]
    TypeMismatch {
        field: String,
        expected: String,
        value: String,
    },

    #[error("Operator '{operator}' does not accept a subquery")]
    SubqueryNotAllowed { operator: Operator },

    #[error("Subquery on '{table}' must select exactly one column, got {found}")]
    SubqueryArity { table: String, found: usize },

    #[error("Cannot pick a column of '{table}' to compare with '{field}'; set selectFields")]
    SubqueryColumnUnresolved { table: String, field: String },

    #[error("Subqueries nested deeper than {max} levels")]
    NestingTooDeep { max: usize },

    #[error("Invalid limit {0}: must be a positive integer")]
    InvalidLimit(i64),
}

impl CompileError {
    /// Whether the error is about tree shape or about catalog references
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::UnknownTable(_)
            | CompileError::UnknownField { .. }
            | CompileError::OperatorNotAllowed { .. }
            | CompileError::SubqueryColumnUnresolved { .. } => ErrorKind::Metadata,
            _ => ErrorKind::Structure,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::UnknownTable(_) => "UNKNOWN_TABLE",
            CompileError::UnknownField { .. } => "UNKNOWN_FIELD",
            CompileError::OperatorNotAllowed { .. } => "OPERATOR_NOT_ALLOWED",
            CompileError::MissingValue { .. } => "MISSING_VALUE",
            CompileError::EmptyListOperand { .. } => "EMPTY_LIST_OPERAND",
            CompileError::BadOperandArity { .. } => "BAD_OPERAND_ARITY",
            CompileError::TypeMismatch { .. } => "TYPE_MISMATCH",
            CompileError::SubqueryNotAllowed { .. } => "SUBQUERY_NOT_ALLOWED",
            CompileError::SubqueryArity { .. } => "SUBQUERY_ARITY",
            CompileError::SubqueryColumnUnresolved { .. } => "SUBQUERY_COLUMN_UNRESOLVED",
            CompileError::NestingTooDeep { .. } => "NESTING_TOO_DEEP",
            CompileError::InvalidLimit(_) => "INVALID_LIMIT",
        }
    }
}

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;
