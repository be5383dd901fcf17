//! Query Routes
//!
//! - POST /api/queries/execute - Compile and run a rule tree
//! - POST /api/queries/preview - Compile without running

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{ExecuteRequest, ExecuteResponse, PreviewResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::gateway::ExecutionErrorKind;

/// POST /api/queries/execute
///
/// Every outcome, including a malformed body, is reported in the
/// `ExecuteResponse` envelope. Compile errors never reach the database.
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> (StatusCode, Json<ExecuteResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Malformed execute request");
            return (
                StatusCode::BAD_REQUEST,
                Json(ExecuteResponse::failure(
                    "validation",
                    Some("INVALID_REQUEST"),
                    rejection.body_text(),
                )),
            );
        }
    };

    let compiled = match state
        .compiler
        .compile_select(&request.query, &request.table_name, request.limit)
    {
        Ok(compiled) => compiled,
        Err(e) => {
            tracing::debug!(table = %request.table_name, code = e.code(), error = %e, "Query failed validation");
            return (
                StatusCode::BAD_REQUEST,
                Json(ExecuteResponse::failure("validation", Some(e.code()), e.to_string())),
            );
        }
    };

    match state.gateway.execute(&compiled).await {
        Ok(result) => {
            tracing::debug!(table = %compiled.table, rows = result.row_count, "Execute request served");
            (
                StatusCode::OK,
                Json(ExecuteResponse {
                    success: true,
                    row_count: result.row_count,
                    data: Some(result.rows),
                    columns: Some(result.columns),
                    execution_time_ms: Some(result.execution_time_ms),
                    sql_query: Some(compiled.sql),
                    ..Default::default()
                }),
            )
        }
        Err(e) => {
            let status = match e.kind {
                ExecutionErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ExecutionErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                ExecutionErrorKind::Rejected | ExecutionErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let mut body = ExecuteResponse::failure(e.kind.as_str(), None, e.message);
            body.sql_query = Some(compiled.sql);
            (status, Json(body))
        }
    }
}

/// POST /api/queries/preview
///
/// Returns the statement and its bound parameters.
pub async fn preview_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> ApiResult<Json<PreviewResponse>> {
    let Json(request) = payload.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;

    let compiled = state
        .compiler
        .compile_select(&request.query, &request.table_name, request.limit)?;

    Ok(Json(PreviewResponse {
        sql: compiled.sql,
        params: compiled.params,
        limit: compiled.limit,
    }))
}
