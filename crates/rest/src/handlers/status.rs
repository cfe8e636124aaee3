//! Service and database status handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::debug;

use crate::state::AppState;

/// Collections listed by `/api/status`, with the methods they accept at the
/// collection root.
const ENDPOINTS: [(&str, &[&str]); 6] = [
    ("/api/users", &["GET", "POST"]),
    ("/api/vehicles", &["GET", "POST"]),
    ("/api/bookings", &["GET", "POST"]),
    ("/api/vehicle-appointments", &["GET", "POST"]),
    ("/api/banners", &["GET"]),
    ("/api/notices", &["GET"]),
];

/// `GET /`
pub async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "欢迎使用微信小程序后端API" }))
}

/// `GET /api/status`
///
/// Reports the process and the last known database state without probing.
pub async fn api_status_handler(State(state): State<AppState>) -> Json<Value> {
    let endpoints: Vec<Value> = ENDPOINTS
        .iter()
        .map(|(path, methods)| json!({ "path": path, "methods": methods }))
        .collect();

    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "server": {
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_seconds": state.uptime_seconds(),
        },
        "database": state.executor().connection_state(),
        "endpoints": endpoints,
    }))
}

/// `GET /api/db-test`
///
/// Runs a probe now and, when it found an endpoint, a trivial statement on
/// that endpoint. A failed probe reports `query_ok: false` without a second
/// attempt.
pub async fn db_test_handler(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.executor().probe_now().await;
    let answered = snapshot.connected
        && !state
            .executor()
            .query("SELECT 1 AS ok")
            .await
            .rows()
            .is_empty();

    debug!(connected = snapshot.connected, answered, "Database test");
    Json(json!({
        "connected": snapshot.connected,
        "query_ok": answered,
        "using_backup": snapshot.using_backup(),
        "state": snapshot,
    }))
}

/// `GET /health`
///
/// - `200 OK` - an endpoint is connected
/// - `503 Service Unavailable` - no endpoint is connected; the API still
///   answers, with empty results
pub async fn health_handler(State(state): State<AppState>) -> Response {
    let snapshot = state.executor().connection_state();
    let status = if snapshot.connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = json!({
        "status": if snapshot.connected { "healthy" } else { "degraded" },
        "backend": state.executor().kind().to_string(),
        "active": snapshot.active,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    (status, Json(body)).into_response()
}
