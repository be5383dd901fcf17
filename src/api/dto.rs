//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::compiler::SqlValue;
use crate::gateway::Row;
use crate::metadata::{TableMetadata, TableSummary};
use crate::rules::RuleGroup;

// ============================================
// METADATA DTOs
// ============================================

/// Field metadata for every table
#[derive(Debug, Serialize, Deserialize)]
pub struct FieldsResponse {
    pub tables: Vec<TableMetadata>,
}

/// Table names and labels
#[derive(Debug, Serialize, Deserialize)]
pub struct TablesResponse {
    pub tables: Vec<TableSummary>,
}

// ============================================
// QUERY DTOs
// ============================================

/// Execute or preview request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Rule tree to compile
    pub query: RuleGroup,
    /// Table the tree filters
    pub table_name: String,
    /// Row limit; the configured default when omitted
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Execute response envelope
///
/// Failures are reported in the same shape with `success: false`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    pub row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `validation`, `timeout`, `unavailable`, `rejected` or `internal`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Machine-readable code for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ExecuteResponse {
    /// Failure envelope
    pub fn failure(kind: &str, code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            error_kind: Some(kind.to_string()),
            error_code: code.map(str::to_string),
            ..Default::default()
        }
    }
}

/// Compiled statement without execution
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub limit: u32,
}

// ============================================
// SAVED QUERY DTOs
// ============================================

/// Pagination for the saved query listing
#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Plain acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", "unhealthy"
    pub status: String,
    /// Query database status
    pub database: String,
    /// Saved query store status
    pub store: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Server version
    pub version: String,
}

/// Service banner for `GET /`
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub tables: usize,
}
