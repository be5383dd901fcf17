//! Metadata Routes
//!
//! - GET /api/metadata/fields - Field metadata for every table
//! - GET /api/metadata/tables - Table names and labels

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{FieldsResponse, TablesResponse};
use crate::api::state::AppState;

/// GET /api/metadata/fields
///
/// The catalog in the shape the query builder UI consumes.
pub async fn list_fields(State(state): State<Arc<AppState>>) -> Json<FieldsResponse> {
    Json(FieldsResponse {
        tables: state.catalog().tables.clone(),
    })
}

/// GET /api/metadata/tables
pub async fn list_tables(State(state): State<Arc<AppState>>) -> Json<TablesResponse> {
    Json(TablesResponse {
        tables: state.catalog().summaries(),
    })
}
