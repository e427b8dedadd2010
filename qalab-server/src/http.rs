//! qalab HTTP API
//!
//! Axum-based HTTP server exposing scenario validation over REST plus a
//! server-rendered results page.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function. The inner functions are directly testable without axum dispatch
//! machinery.
//!
//! Endpoints:
//! - GET    /health                          - health check with store status
//! - GET    /version                         - server version info
//! - GET    /api/scenarios?labels=a=1,b=2    - list / search scenarios
//! - POST   /api/scenarios/search            - search scenarios by label filters
//! - GET    /api/scenarios/:id               - single scenario definition
//! - POST   /api/scenarios/:id/interactions  - record an interaction, return verdict
//! - GET    /api/scenarios/:id/validation    - current verdict
//! - DELETE /api/scenarios/:id/interactions  - reset one scenario for the session
//! - DELETE /api/session/interactions        - reset every scenario for the session
//! - GET    /scenarios/:id/results           - HTML results page

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use qalab_core::protocol::{QalabRequest, QalabResponse, PROTOCOL};
use qalab_core::{NewInteraction, QalabConfig, ScenarioError, ValidationService};
use serde::Deserialize;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::pages;
use crate::router::handle_request_with_pool;
use crate::session::SessionId;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub service: ValidationService,
    pub pool: Option<PgPool>,
    pub config: QalabConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/api/scenarios", get(list_scenarios_handler))
        .route("/api/scenarios/search", post(search_handler))
        .route("/api/scenarios/:id", get(get_scenario_handler))
        .route(
            "/api/scenarios/:id/interactions",
            post(record_handler).delete(reset_handler),
        )
        .route("/api/scenarios/:id/validation", get(validate_handler))
        .route("/api/session/interactions", delete(reset_all_handler))
        .route("/scenarios/:id/results", get(results_page_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: HttpState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);
    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("qalab HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Query string for `GET /api/scenarios`: comma-separated label filters.
#[derive(Debug, Deserialize, Default)]
pub struct ScenarioQuery {
    pub labels: Option<String>,
}

impl ScenarioQuery {
    pub fn filters(&self) -> Vec<String> {
        self.labels
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchRequest {
    #[serde(default)]
    pub labels: Vec<String>,
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check - reports store backend, catalog size and DB version.
pub async fn health_inner(
    service: &ValidationService,
    pool: Option<&PgPool>,
) -> (StatusCode, serde_json::Value) {
    let response = handle_request_with_pool(QalabRequest::Health, service, pool).await;
    match response_to_http(response) {
        Ok(mut data) => {
            if let Some(obj) = data.as_object_mut() {
                obj.insert("version".to_string(), serde_json::json!(env!("CARGO_PKG_VERSION")));
            }
            (StatusCode::OK, data)
        }
        Err((_, body)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": body["error"],
            }),
        ),
    }
}

/// Inner version - returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": PROTOCOL,
    })
}

/// Inner search - label filters with AND semantics.
pub async fn search_inner(
    service: &ValidationService,
    labels: Vec<String>,
) -> (StatusCode, serde_json::Value) {
    let response =
        handle_request_with_pool(QalabRequest::ListScenarios { labels }, service, None).await;
    into_status_body(response, StatusCode::OK)
}

pub async fn get_scenario_inner(
    service: &ValidationService,
    id: String,
) -> (StatusCode, serde_json::Value) {
    let response =
        handle_request_with_pool(QalabRequest::GetScenario { id }, service, None).await;
    into_status_body(response, StatusCode::OK)
}

/// Inner record - appends the interaction, then returns the fresh verdict.
/// `result` is null when the append succeeded but the verdict could not be read.
pub async fn record_inner(
    service: &ValidationService,
    scenario_id: String,
    session_id: String,
    interaction: NewInteraction,
) -> (StatusCode, serde_json::Value) {
    let recorded = handle_request_with_pool(
        QalabRequest::Record {
            scenario_id: scenario_id.clone(),
            session_id: session_id.clone(),
            interaction,
        },
        service,
        None,
    )
    .await;
    let recorded = match response_to_http(recorded) {
        Ok(data) => data,
        Err(err) => return err,
    };

    let verdict = handle_request_with_pool(
        QalabRequest::Validate {
            scenario_id,
            session_id,
        },
        service,
        None,
    )
    .await;
    // The append already succeeded; a failed read must not turn it into an error.
    let result = match response_to_http(verdict) {
        Ok(result) => result,
        Err((status, body)) => {
            tracing::warn!(
                "Recorded interaction {} but verdict read failed ({}): {}",
                recorded["id"],
                status,
                body["error"]
            );
            serde_json::Value::Null
        }
    };
    (
        StatusCode::CREATED,
        serde_json::json!({
            "recorded": recorded,
            "result": result,
        }),
    )
}

pub async fn validate_inner(
    service: &ValidationService,
    scenario_id: String,
    session_id: String,
) -> (StatusCode, serde_json::Value) {
    let response = handle_request_with_pool(
        QalabRequest::Validate {
            scenario_id,
            session_id,
        },
        service,
        None,
    )
    .await;
    into_status_body(response, StatusCode::OK)
}

pub async fn reset_inner(
    service: &ValidationService,
    scenario_id: String,
    session_id: String,
) -> (StatusCode, serde_json::Value) {
    let response = handle_request_with_pool(
        QalabRequest::Reset {
            scenario_id,
            session_id,
        },
        service,
        None,
    )
    .await;
    into_status_body(response, StatusCode::OK)
}

pub async fn reset_all_inner(
    service: &ValidationService,
    session_id: String,
) -> (StatusCode, serde_json::Value) {
    let response =
        handle_request_with_pool(QalabRequest::ResetAll { session_id }, service, None).await;
    into_status_body(response, StatusCode::OK)
}

/// Inner results page - (status, html).
pub async fn results_page_inner(
    service: &ValidationService,
    scenario_id: &str,
    session_id: &str,
) -> (StatusCode, String) {
    let def = match service.scenario(scenario_id) {
        Ok(def) => def,
        Err(_) => return (StatusCode::NOT_FOUND, pages::render_not_found(scenario_id)),
    };
    match service.validate_and_update(scenario_id, session_id).await {
        Ok(result) => (StatusCode::OK, pages::render_results(&def, &result)),
        Err(ScenarioError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, pages::render_not_found(scenario_id))
        }
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, pages::render_error()),
    }
}

// ============================================================================
// Axum handler wrappers (thin - delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.service, state.pool.as_ref()).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn list_scenarios_handler(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<ScenarioQuery>,
) -> impl IntoResponse {
    let (status, body) = search_inner(&state.service, query.filters()).await;
    (status, Json(body))
}

pub async fn search_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<SearchRequest>,
) -> impl IntoResponse {
    let (status, body) = search_inner(&state.service, req.labels).await;
    (status, Json(body))
}

pub async fn get_scenario_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = get_scenario_inner(&state.service, id).await;
    (status, Json(body))
}

pub async fn record_handler(
    State(state): State<Arc<HttpState>>,
    session: SessionId,
    Path(id): Path<String>,
    Json(interaction): Json<NewInteraction>,
) -> Response {
    let (status, body) = record_inner(&state.service, id, session.id.clone(), interaction).await;
    session.apply((status, Json(body)).into_response())
}

pub async fn validate_handler(
    State(state): State<Arc<HttpState>>,
    session: SessionId,
    Path(id): Path<String>,
) -> Response {
    let (status, body) = validate_inner(&state.service, id, session.id.clone()).await;
    session.apply((status, Json(body)).into_response())
}

pub async fn reset_handler(
    State(state): State<Arc<HttpState>>,
    session: SessionId,
    Path(id): Path<String>,
) -> Response {
    let (status, body) = reset_inner(&state.service, id, session.id.clone()).await;
    session.apply((status, Json(body)).into_response())
}

pub async fn reset_all_handler(
    State(state): State<Arc<HttpState>>,
    session: SessionId,
) -> Response {
    let (status, body) = reset_all_inner(&state.service, session.id.clone()).await;
    session.apply((status, Json(body)).into_response())
}

pub async fn results_page_handler(
    State(state): State<Arc<HttpState>>,
    session: SessionId,
    Path(id): Path<String>,
) -> Response {
    let (status, html) = results_page_inner(&state.service, &id, &session.id).await;
    session.apply((status, Html(html)).into_response())
}

// ============================================================================
// Helpers
// ============================================================================

/// HTTP status for an error `kind` carried by a `QalabResponse`.
pub fn status_for_kind(kind: Option<&str>) -> StatusCode {
    match kind {
        Some("not_found") => StatusCode::NOT_FOUND,
        Some("invalid_input") => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a `QalabResponse` into an HTTP body value, or an error (status, body).
pub fn response_to_http(
    response: QalabResponse,
) -> std::result::Result<serde_json::Value, (StatusCode, serde_json::Value)> {
    if response.is_ok() {
        Ok(response.data.unwrap_or(serde_json::json!({})))
    } else {
        let status = status_for_kind(response.kind.as_deref());
        Err((
            status,
            serde_json::json!({
                "error": response.error.unwrap_or_else(|| "unknown error".to_string()),
                "status": "error",
            }),
        ))
    }
}

fn into_status_body(response: QalabResponse, ok: StatusCode) -> (StatusCode, serde_json::Value) {
    match response_to_http(response) {
        Ok(data) => (ok, data),
        Err(err) => err,
    }
}

// ============================================================================
// Unit Tests - call inner functions directly
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use qalab_core::models::NewRecord;
    use qalab_core::{
        InteractionRecord, InteractionStore, MemoryInteractionStore, ScenarioCatalog, StoreError,
    };

    fn service() -> ValidationService {
        let catalog = Arc::new(ScenarioCatalog::builtin().unwrap());
        ValidationService::new(catalog, Arc::new(MemoryInteractionStore::new()))
    }

    fn click(element: &str) -> NewInteraction {
        NewInteraction {
            action: Some("click".to_string()),
            element: Some(element.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_version_inner_pure() {
        let v = version_inner();
        assert!(v["version"].is_string(), "version must be string");
        assert_eq!(v["protocol"], "qalab/1");
    }

    #[test]
    fn test_status_for_kind() {
        assert_eq!(status_for_kind(Some("not_found")), StatusCode::NOT_FOUND);
        assert_eq!(status_for_kind(Some("invalid_input")), StatusCode::BAD_REQUEST);
        assert_eq!(status_for_kind(Some("internal")), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for_kind(None), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_response_to_http_error_no_message() {
        let mut resp = QalabResponse::err("internal", "x");
        resp.error = None;
        let (status, body) = response_to_http(resp).unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "unknown error");
    }

    #[test]
    fn test_scenario_query_filters() {
        let q = ScenarioQuery {
            labels: Some("action=click, element=button,,".to_string()),
        };
        assert_eq!(q.filters(), vec!["action=click", "element=button"]);
        assert!(ScenarioQuery::default().filters().is_empty());
    }

    #[tokio::test]
    async fn test_health_inner_memory() {
        let (status, body) = health_inner(&service(), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["store"], "memory");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_record_inner_returns_created_with_verdict() {
        let svc = service();
        let (status, body) = record_inner(&svc, "c1".into(), "s".into(), click("#submit-btn")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["recorded"]["element_interacted"], "#submit-btn");
        assert_eq!(body["result"]["status"], "pass");
    }

    /// Accepts writes but fails every read.
    struct WriteOnlyStore {
        inner: MemoryInteractionStore,
    }

    #[async_trait]
    impl InteractionStore for WriteOnlyStore {
        async fn append(&self, record: NewRecord) -> Result<InteractionRecord, StoreError> {
            self.inner.append(record).await
        }

        async fn query_all(
            &self,
            _scenario_id: &str,
            _session_id: &str,
        ) -> Result<Vec<InteractionRecord>, StoreError> {
            Err(StoreError::Backend("read replica down".to_string()))
        }

        async fn delete_all(&self, scenario_id: &str, session_id: &str) -> Result<u64, StoreError> {
            self.inner.delete_all(scenario_id, session_id).await
        }

        async fn delete_all_for_session(&self, session_id: &str) -> Result<u64, StoreError> {
            self.inner.delete_all_for_session(session_id).await
        }

        fn backend(&self) -> &str {
            "write-only"
        }
    }

    #[tokio::test]
    async fn test_record_inner_keeps_created_when_verdict_read_fails() {
        let store = Arc::new(WriteOnlyStore {
            inner: MemoryInteractionStore::new(),
        });
        let catalog = Arc::new(ScenarioCatalog::builtin().unwrap());
        let svc = ValidationService::new(catalog, store.clone());

        let (status, body) =
            record_inner(&svc, "c1".into(), "s".into(), click("#submit-btn")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["recorded"]["element_interacted"], "#submit-btn");
        assert!(body["result"].is_null());
        assert_eq!(store.inner.len().await, 1);

        // The standalone verdict read still reports the failure.
        let (status, _) = validate_inner(&svc, "c1".into(), "s".into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_record_inner_missing_element_is_400() {
        let input = NewInteraction {
            action: Some("click".to_string()),
            ..Default::default()
        };
        let (status, body) = record_inner(&service(), "c1".into(), "s".into(), input).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_validate_inner_unknown_is_404() {
        let (status, _) = validate_inner(&service(), "nope".into(), "s".into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reset_inner_twice() {
        let svc = service();
        record_inner(&svc, "c1".into(), "s".into(), click("#x")).await;
        let (_, first) = reset_inner(&svc, "c1".into(), "s".into()).await;
        let (_, second) = reset_inner(&svc, "c1".into(), "s".into()).await;
        assert_eq!(first["removed"], 1);
        assert_eq!(second["removed"], 0);
    }

    #[tokio::test]
    async fn test_results_page_inner() {
        let svc = service();
        let (status, html) = results_page_inner(&svc, "c1", "page-session").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("data-status=\"neutral\""));

        let (status, _) = results_page_inner(&svc, "missing", "page-session").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
