use axum::{
    extract::{Extension, State},
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, models::CurrentUser, services::auth_service, AppState};

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;

    for part in raw.split(';') {
        let part = part.trim();
        let mut it = part.splitn(2, '=');
        let k = it.next()?.trim();
        let v = it.next()?.trim();
        if k == name {
            return Some(v.to_string());
        }
    }
    None
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Token from `Authorization: Bearer ...`, falling back to the auth cookie.
pub fn request_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    bearer_token(headers).or_else(|| get_cookie(headers, cookie_name))
}

pub async fn inject_current_user(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = request_token(req.headers(), &state.settings.jwt_cookie_name);

    if let Some(token) = token {
        match auth_service::verify_token(&state.settings.jwt_secret, &token) {
            // Store user in request extensions so handlers can access it
            Some(user) => {
                req.extensions_mut().insert(user);
            }
            None => tracing::debug!("ignoring invalid or expired token"),
        }
    }

    next.run(req).await
}

pub fn require_user(user: Option<Extension<CurrentUser>>) -> Result<CurrentUser, AppError> {
    match user {
        Some(Extension(u)) => Ok(u),
        None => Err(AppError::Unauthorized("Unauthorized".into())),
    }
}
