//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET / - Service banner
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (ready to serve traffic)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{HealthResponse, ServiceInfo};
use crate::api::state::AppState;

/// GET /
pub async fn service_info(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "Query Builder API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tables: state.catalog().tables.len(),
    })
}

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Kubernetes readiness probe.
/// Returns 200 when both the query database and the saved query store answer.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if check_database_health(&state).await && check_store_health(&state).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database_ok = check_database_health(&state).await;
    let store_ok = check_store_health(&state).await;

    let overall_status = match (database_ok, store_ok) {
        (true, true) => "healthy",
        (false, false) => "unhealthy",
        _ => "degraded",
    };

    Json(HealthResponse {
        status: overall_status.to_string(),
        database: status_label(database_ok).to_string(),
        store: status_label(store_ok).to_string(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn status_label(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}

async fn check_database_health(state: &AppState) -> bool {
    match state.gateway.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(kind = %e.kind, "Database health check failed");
            false
        }
    }
}

async fn check_store_health(state: &AppState) -> bool {
    match state.store.count().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            false
        }
    }
}
