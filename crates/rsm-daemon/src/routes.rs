//! Axum router and handlers for the read-only status API.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Tests compose the bare router directly.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::{
    api_types::HealthResponse,
    state::{uptime_secs, AppState},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/status/:region", get(region_status))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.clone(),
            version: st.build.version.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let mut snap = st.status.read().await.clone();
    snap.daemon_uptime_secs = uptime_secs();
    (StatusCode::OK, Json(snap))
}

// ---------------------------------------------------------------------------
// GET /v1/status/:region
// ---------------------------------------------------------------------------

/// The region's entry from the last pass; 404 before the first pass or for
/// an unknown region.
pub(crate) async fn region_status(
    State(st): State<Arc<AppState>>,
    Path(region): Path<String>,
) -> Response {
    let snap = st.status.read().await;
    let found = snap
        .last_pass
        .as_ref()
        .and_then(|p| p.regions.iter().find(|r| r.region.eq_ignore_ascii_case(&region)));

    match found {
        Some(r) => (StatusCode::OK, Json(r.clone())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("no status for region '{region}'") })),
        )
            .into_response(),
    }
}
