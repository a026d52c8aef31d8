use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

#[axum::debug_handler]
pub async fn health() -> impl IntoResponse {
    let body = json!({
        "status": "ok",
    });
    (StatusCode::OK, Json(body))
}

/// Configuration diagnostics for the identity provider. Always 200.
#[axum::debug_handler]
pub async fn test_connection(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.auth_service.connection_status())
}
