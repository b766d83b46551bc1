use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::AppState;

fn cron_authorized(headers: &HeaderMap, secret: Option<&str>) -> bool {
    let Some(secret) = secret else {
        return true;
    };

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim() == secret)
        .unwrap_or(false)
}

// GET|POST /api/cron/check-alerts
pub async fn check_alerts(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !cron_authorized(&headers, state.settings.cron_secret.as_deref()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "Unauthorized" })),
        )
            .into_response();
    }

    match state.monitor.run_evaluation_pass().await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Alerts checked successfully",
                "report": report,
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "alert check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "Failed to check alerts" })),
            )
                .into_response()
        }
    }
}
