//! REST API routes.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::api::request_id::{self, RequestId};
use crate::planner::plan_route;
use crate::state::{ActiveRun, AppState};
use glide_core::{ErrorKind, PlanResponse};

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/routes/plan", post(plan_route_handler))
        .route("/v1/routes/active", get(list_active_runs))
        .route("/v1/routes/active/:id", delete(cancel_active_run))
        .layer(middleware::from_fn(request_id::ensure_request_id))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

/// HTTP status for an envelope. Validation failures and planner failures map
/// to distinct codes so callers can pick a retry strategy from the status.
pub fn status_for(response: &PlanResponse) -> StatusCode {
    match response.error_kind() {
        None => StatusCode::OK,
        Some(ErrorKind::InvalidRequest) => StatusCode::BAD_REQUEST,
        Some(ErrorKind::ComputationFailure) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(ErrorKind::SpawnFailure) => StatusCode::INTERNAL_SERVER_ERROR,
        Some(ErrorKind::ResultUnreadable) | Some(ErrorKind::ResultMalformed) => {
            StatusCode::BAD_GATEWAY
        }
        Some(ErrorKind::Timeout) => StatusCode::GATEWAY_TIMEOUT,
        Some(ErrorKind::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// The body is taken raw so malformed JSON still gets the failure envelope
/// instead of the framework's plain-text rejection.
async fn plan_route_handler(
    State(state): State<Arc<AppState>>,
    request_id: Option<Extension<RequestId>>,
    body: Bytes,
) -> impl IntoResponse {
    let request_id = request_id
        .map(|Extension(id)| id)
        .unwrap_or_else(RequestId::generate);
    let response = plan_route(state.as_ref(), request_id.as_str(), &body).await;
    (status_for(&response), Json(response))
}

async fn list_active_runs(State(state): State<Arc<AppState>>) -> Json<Vec<ActiveRun>> {
    Json(state.active_runs())
}

async fn cancel_active_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.cancel_run(&id) {
        0 => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no active run '{}'", id) })),
        ),
        cancelled => {
            tracing::info!("Cancelled {} planner run(s) for {}", cancelled, id);
            (
                StatusCode::ACCEPTED,
                Json(json!({ "id": id, "cancelled": cancelled })),
            )
        }
    }
}
