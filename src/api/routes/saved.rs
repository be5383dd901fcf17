//! Saved Query Routes
//!
//! - POST /api/queries/save - Store a named rule tree
//! - GET /api/queries - List saved queries
//! - GET /api/queries/:id - Fetch one saved query
//! - DELETE /api/queries/:id - Delete a saved query

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{ListParams, MessageResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::rules::RuleGroup;
use crate::store::{NewSavedQuery, SavedQuery};

const DEFAULT_PAGE_SIZE: usize = 100;
const MAX_PAGE_SIZE: usize = 1000;

/// POST /api/queries/save
///
/// The tree must compile against its table. The stored `query_json` is
/// the canonical serialization and `sql_query` is always derived here;
/// a client-supplied `sql_query` is ignored.
pub async fn save_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewSavedQuery>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SavedQuery>)> {
    let Json(mut new) = payload.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;

    let tree = RuleGroup::from_json(&new.query_json)
        .map_err(|e| ApiError::Validation(format!("query_json is not a valid rule tree: {}", e)))?;
    let compiled = state.compiler.compile_select(&tree, &new.table_name, None)?;

    new.query_json = tree.to_json().map_err(|e| ApiError::Internal(e.to_string()))?;
    new.sql_query = Some(compiled.sql);

    let saved = state.store.create(new).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /api/queries?skip=&limit=
pub async fn list_queries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<SavedQuery>>> {
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

    Ok(Json(state.store.list(skip, limit).await?))
}

/// GET /api/queries/:id
pub async fn get_query(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Json<SavedQuery>> {
    Ok(Json(state.store.get(id).await?))
}

/// DELETE /api/queries/:id
pub async fn delete_query(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.store.delete(id).await?;
    Ok(Json(MessageResponse {
        message: "Query deleted successfully".to_string(),
    }))
}
