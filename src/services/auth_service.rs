use std::sync::OnceLock;

use axum_extra::extract::cookie::{Cookie, SameSite};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    config::Settings,
    error::AppError,
    models::{CurrentUser, User},
    AppState,
};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    // user id
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    // expiry (unix timestamp seconds)
    pub exp: usize,
}

pub fn is_valid_email(email: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"))
        .is_match(email.trim())
}

pub fn make_jwt(settings: &Settings, user: &CurrentUser) -> Result<String, AppError> {
    let exp = (Utc::now() + Duration::days(settings.jwt_ttl_days)).timestamp() as usize;

    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

/// Identity carried by a valid, unexpired token; `None` for anything else.
pub fn verify_token(secret: &str, token: &str) -> Option<CurrentUser> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation).ok()?;

    Some(CurrentUser {
        id: data.claims.sub,
        email: data.claims.email,
        name: data.claims.name,
    })
}

pub fn auth_cookie(settings: &Settings, token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(settings.jwt_cookie_name.clone(), token);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    if settings.cookie_secure {
        cookie.set_secure(true);
    }
    cookie
}

pub async fn register_user(
    state: &AppState,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> Result<User, AppError> {
    let email = email.trim().to_lowercase();

    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation("Email and password are required".into()));
    }
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email.".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email has already been taken!".into()));
    }

    let pw_hash = hash(password, DEFAULT_COST).map_err(|e| AppError::Internal(e.to_string()))?;
    let name = name.map(str::trim).filter(|n| !n.is_empty());

    let user = state.store.create_user(&email, &pw_hash, name).await?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok(user)
}

pub async fn login_user(state: &AppState, email: &str, password: &str) -> Result<User, AppError> {
    let email = email.trim().to_lowercase();
    let invalid = || AppError::Unauthorized("Invalid email or password.".into());

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        return Err(invalid());
    };

    if !verify(password, &user.password_hash).unwrap_or(false) {
        return Err(invalid());
    }

    Ok(user)
}
