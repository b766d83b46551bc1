use axum::{
    extract::{Extension, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::require_user,
    error::AppError,
    models::CurrentUser,
    services::alerts_service::{self, CreateAlertInput},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub triggered: Option<String>,
}

impl ListQuery {
    /// Only `true` selects triggered alerts; missing or anything else lists
    /// the pending ones.
    fn triggered_filter(&self) -> bool {
        self.triggered
            .as_deref()
            .map(str::trim)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    pub id: Option<String>,
}

// GET /api/alerts?triggered=true (default: untriggered)
pub async fn get_alerts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    user: Option<Extension<CurrentUser>>,
) -> Result<impl IntoResponse, AppError> {
    let u = require_user(user)?;

    let alerts = alerts_service::list_alerts(&state, &u.id, Some(query.triggered_filter())).await?;
    Ok(Json(json!({ "alerts": alerts })))
}

// POST /api/alerts
pub async fn post_create_alert(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(input): Json<CreateAlertInput>,
) -> Result<impl IntoResponse, AppError> {
    let u = require_user(user)?;

    let alert = alerts_service::create_alert(&state, &u.id, &input).await?;
    Ok(Json(json!({ "message": "Alert created successfully", "alert": alert })))
}

// DELETE /api/alerts?id=...
pub async fn delete_alert(
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
    user: Option<Extension<CurrentUser>>,
) -> Result<impl IntoResponse, AppError> {
    let u = require_user(user)?;

    let Some(id) = query.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Err(AppError::Validation("Alert ID is required".into()));
    };

    alerts_service::delete_alert_for_owner(&state, &u.id, id).await?;
    Ok(Json(json!({ "message": "Alert deleted successfully" })))
}
