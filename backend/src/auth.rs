//! Password hashing and the account routes
//!
//! `POST /user` registers, `POST /session` logs in, `DELETE /session` logs
//! out. Tokens are opaque uuids looked up through the data access layer.

use crate::api::AppState;
use crate::error::{ServiceError, ServiceResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Json, State},
    http::HeaderMap,
};
use serde_json::{json, Value};
use shared::models::{AuthData, LoginRequest, UserData};

/// Header carrying the session token
pub const AUTH_HEADER: &str = "authorization";

pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ServiceError::ServerError("password hashing failed".to_string()))
}

/// False for a wrong password and for a hash that cannot be parsed
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Token from the `authorization` header, empty when missing
pub fn auth_token(headers: &HeaderMap) -> &str {
    headers
        .get(AUTH_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<UserData>,
) -> ServiceResult<Json<AuthData>> {
    let auth = state.service.register(payload).await?;
    Ok(Json(auth))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ServiceResult<Json<AuthData>> {
    let auth = state
        .service
        .login(&payload.username, &payload.password)
        .await?;
    Ok(Json(auth))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServiceResult<Json<Value>> {
    state.service.logout(auth_token(&headers)).await?;
    Ok(Json(json!({})))
}
