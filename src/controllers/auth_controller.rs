use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::require_user,
    error::AppError,
    models::CurrentUser,
    services::auth_service,
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct RegisterBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// POST /api/auth/register
pub async fn post_register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth_service::register_user(&state, &body.email, &body.password, body.name.as_deref()).await?;

    let current = CurrentUser::from(user);
    let token = auth_service::make_jwt(&state.settings, &current)?;
    let jar = jar.add(auth_service::auth_cookie(&state.settings, token.clone()));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(json!({ "message": "User created successfully", "token": token, "user": current })),
    ))
}

// POST /api/auth/login
pub async fn post_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, AppError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::Validation("Email and password are required".into()));
    }

    let user = auth_service::login_user(&state, &body.email, &body.password).await?;

    let current = CurrentUser::from(user);
    let token = auth_service::make_jwt(&state.settings, &current)?;
    let jar = jar.add(auth_service::auth_cookie(&state.settings, token.clone()));

    Ok((jar, Json(json!({ "token": token, "user": current }))))
}

// POST /api/auth/logout
pub async fn post_logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let mut cookie = Cookie::new(state.settings.jwt_cookie_name.clone(), "");
    cookie.set_path("/");

    (jar.remove(cookie), Json(json!({ "message": "Logged out" })))
}

// GET /api/auth/me
pub async fn get_me(user: Option<Extension<CurrentUser>>) -> Result<impl IntoResponse, AppError> {
    let user = require_user(user)?;
    Ok(Json(json!({ "user": user })))
}
