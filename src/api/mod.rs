//! Query Builder REST API
//!
//! HTTP API layer, built with Axum.
//!
//! # Endpoints
//!
//! ## Metadata
//! - `GET /api/metadata/fields` - Field metadata for every table
//! - `GET /api/metadata/tables` - Table names and labels
//!
//! ## Queries
//! - `POST /api/queries/execute` - Compile and run a rule tree
//! - `POST /api/queries/preview` - Compile a rule tree without running it
//!
//! ## Saved queries
//! - `POST /api/queries/save` - Save a named rule tree
//! - `GET /api/queries` - List saved queries
//! - `GET /api/queries/:id` - Get a saved query
//! - `DELETE /api/queries/:id` - Delete a saved query
//!
//! ## Health
//! - `GET /` - Service banner
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use querybuilder::api::{serve, AppState};
//! use querybuilder::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let state = AppState::from_config(&config)?;
//!     serve(state, &config.api).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, StateError};

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ApiConfig;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let max_body_size = state.config.max_body_size;
    let request_timeout = Duration::from_secs(state.config.request_timeout_secs);

    let api_routes = Router::new()
        // Metadata routes
        .route("/metadata/fields", get(routes::metadata::list_fields))
        .route("/metadata/tables", get(routes::metadata::list_tables))
        // Query routes
        .route("/queries/execute", post(routes::execute::execute_query))
        .route("/queries/preview", post(routes::execute::preview_query))
        // Saved query routes
        .route("/queries/save", post(routes::saved::save_query))
        .route("/queries", get(routes::saved::list_queries))
        .route("/queries/", get(routes::saved::list_queries))
        .route(
            "/queries/:id",
            get(routes::saved::get_query).delete(routes::saved::delete_query),
        );

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .route("/", get(routes::health::service_info))
        .nest("/api", api_routes)
        .nest("/health", health_routes)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// CORS policy from the configured origins; `*` allows any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Query Builder API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Query Builder API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::SqlCompiler;
    use crate::db::Database;
    use crate::gateway::{GatewayConfig, QueryGateway};
    use crate::metadata::Catalog;
    use crate::store::SavedQueryStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tempfile::tempdir;
    use tower::util::ServiceExt;

    async fn create_test_app() -> (Router, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("query_builder.db");
        let database = Database::open(&path, true).unwrap();

        let compiler = Arc::new(SqlCompiler::new(Arc::new(Catalog::sample())));
        let gateway = Arc::new(QueryGateway::new(database.path(), GatewayConfig::default()));
        let store = SavedQueryStore::open(database.path()).unwrap();

        let state = AppState::new(compiler, gateway, store, ApiConfig::default());
        let router = build_router(state);

        (router, dir)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let (app, _dir) = create_test_app().await;

        let response = app.oneshot(get("/health/live")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready() {
        let (app, _dir) = create_test_app().await;

        let response = app.oneshot(get("/health/ready")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let (app, _dir) = create_test_app().await;

        let response = app.oneshot(get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "ok");
    }

    #[tokio::test]
    async fn test_service_info() {
        let (app, _dir) = create_test_app().await;

        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["tables"], 4);
    }

    #[tokio::test]
    async fn test_metadata_fields() {
        let (app, _dir) = create_test_app().await;

        let response = app.oneshot(get("/api/metadata/fields")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let tables = body["tables"].as_array().unwrap();
        assert_eq!(tables.len(), 4);
        assert_eq!(tables[0]["name"], "users");
        let age = tables[0]["fields"]
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["name"] == "age")
            .unwrap();
        assert_eq!(age["type"], "number");
        assert_eq!(age["inputType"], "number");
    }

    #[tokio::test]
    async fn test_metadata_tables() {
        let (app, _dir) = create_test_app().await;

        let response = app.oneshot(get("/api/metadata/tables")).await.unwrap();

        let body = body_json(response).await;
        assert_eq!(body["tables"][3], json!({"name": "order_items", "label": "Order Items"}));
    }

    #[tokio::test]
    async fn test_execute_query() {
        let (app, _dir) = create_test_app().await;

        let request = json!({
            "query": {
                "combinator": "and",
                "rules": [{"field": "age", "operator": ">", "value": 30}]
            },
            "table_name": "users"
        });
        let response = app.oneshot(post_json("/api/queries/execute", request)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["row_count"], 5);
        assert_eq!(body["data"].as_array().unwrap().len(), 5);
        assert!(body["sql_query"].as_str().unwrap().contains("WHERE age > ?"));
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_execute_unknown_field_is_validation() {
        let (app, _dir) = create_test_app().await;

        let request = json!({
            "query": {"combinator": "and", "rules": [{"field": "salary", "operator": "=", "value": 1}]},
            "table_name": "users"
        });
        let response = app.oneshot(post_json("/api/queries/execute", request)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error_kind"], "validation");
        assert_eq!(body["error_code"], "UNKNOWN_FIELD");
        assert_eq!(body["row_count"], 0);
    }

    #[tokio::test]
    async fn test_execute_malformed_body() {
        let (app, _dir) = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/queries/execute")
                    .header("Content-Type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error_kind"], "validation");
    }

    #[tokio::test]
    async fn test_preview_query() {
        let (app, _dir) = create_test_app().await;

        let request = json!({
            "query": {"combinator": "or", "rules": [
                {"field": "city", "operator": "in", "value": "Boston, Denver"},
                {"field": "first_name", "operator": "beginsWith", "value": "J"}
            ]},
            "table_name": "users",
            "limit": 5
        });
        let response = app.oneshot(post_json("/api/queries/preview", request)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["params"], json!(["Boston", "Denver", "J%"]));
        assert_eq!(body["limit"], 5);
        assert!(body["sql"].as_str().unwrap().ends_with("LIMIT 5"));
    }

    #[tokio::test]
    async fn test_preview_invalid_limit() {
        let (app, _dir) = create_test_app().await;

        let request = json!({"query": {"combinator": "and", "rules": []}, "table_name": "users", "limit": 0});
        let response = app.oneshot(post_json("/api/queries/preview", request)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_LIMIT");
    }

    #[tokio::test]
    async fn test_saved_query_lifecycle() {
        let (app, _dir) = create_test_app().await;

        let save = json!({
            "name": "Active users",
            "description": "Everyone still active",
            "query_json": r#"{"combinator":"and","rules":[{"field":"is_active","operator":"=","value":true}]}"#,
            "table_name": "users"
        });
        let response = app.clone().oneshot(post_json("/api/queries/save", save)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let saved = body_json(response).await;
        let id = saved["id"].as_i64().unwrap();
        assert!(saved["sql_query"].as_str().unwrap().contains("is_active = ?"));

        let response = app.clone().oneshot(get("/api/queries")).await.unwrap();
        let list = body_json(response).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["name"], "Active users");

        let response = app.clone().oneshot(get(&format!("/api/queries/{}", id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/queries/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "Query deleted successfully");

        let response = app.oneshot(get(&format!("/api/queries/{}", id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_tree() {
        let (app, _dir) = create_test_app().await;

        let save = json!({
            "name": "Broken",
            "query_json": "not a tree",
            "table_name": "users"
        });
        let response = app.oneshot(post_json("/api/queries/save", save)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_missing_query() {
        let (app, _dir) = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/queries/999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_cors_layer_builds_for_lists_and_wildcard() {
        let _ = cors_layer(&["http://localhost:3000".to_string(), "bad\norigin".to_string()]);
        let _ = cors_layer(&["*".to_string()]);
    }
}
