use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

pub async fn health_store(State(state): State<AppState>) -> impl IntoResponse {
    // any read exercises the backend end to end
    match state.store.find_user_by_id("__health__").await {
        Ok(_) => (StatusCode::OK, Json(json!({ "store": "ok" }))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "store health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "store": "error", "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
