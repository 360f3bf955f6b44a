//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: login, access-token refresh, and logout.
//!
//! The refresh token travels only in an HTTP-only cookie; the access token is
//! returned only in the response body. All credential failures on login
//! collapse into one generic 401 so callers cannot probe which usernames
//! exist or which accounts are active.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::extract::{ValidJson, ALL_FIELDS_REQUIRED};
use crate::web::state::AppState;

/// Name of the refresh-token cookie.
pub const REFRESH_COOKIE: &str = "jwt";

//=========================================================================================
// Password Hashing
//=========================================================================================

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))
}

/// Constant-time verification against a stored PHC hash string. An
/// unparseable hash verifies as false rather than erroring; the caller only
/// ever learns "match" or "no match".
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}

fn set_refresh_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{REFRESH_COOKIE}={token}; HttpOnly; Secure; SameSite=None; Path=/; Max-Age={max_age_secs}")
}

fn clear_refresh_cookie() -> String {
    format!("{REFRESH_COOKIE}=; HttpOnly; Secure; SameSite=None; Path=/; Max-Age=0")
}

/// Pulls the refresh token out of the Cookie header, if present.
fn refresh_cookie_value(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("jwt="))
        .map(str::to_string)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth - Exchange username/password for a token pair
#[utoipa::path(
    post,
    path = "/auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, refresh cookie set", body = TokenResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Bad credentials or inactive account"),
        (status = 429, description = "Too many attempts from this address")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(password)) = (req.username, req.password) else {
        return Err(ApiError::Validation(ALL_FIELDS_REQUIRED.to_string()));
    };
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(ALL_FIELDS_REQUIRED.to_string()));
    }

    // Unknown user and inactive account fall through to the same error as a
    // wrong password.
    let creds = state
        .db
        .get_user_credentials(&username)
        .await?
        .filter(|c| c.active)
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&password, &creds.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let access_token = state
        .tokens
        .mint_access_token(&creds.username, &creds.roles)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let refresh_token = state
        .tokens
        .mint_refresh_token(&creds.username)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let cookie = set_refresh_cookie(&refresh_token, state.tokens.refresh_ttl_secs());
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(TokenResponse { access_token }),
    ))
}

/// GET /auth/refresh - Mint a fresh access token from the refresh cookie
///
/// Roles are never trusted from the refresh claim: the user is re-read from
/// the store so role changes and deactivations take effect immediately.
#[utoipa::path(
    get,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New access token", body = TokenResponse),
        (status = 401, description = "No refresh cookie, or the user no longer exists"),
        (status = 403, description = "Refresh token invalid or expired")
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = refresh_cookie_value(&headers).ok_or(ApiError::Unauthorized)?;

    // 403, not 401: a credential was presented, it just isn't good.
    let claims = state
        .tokens
        .verify_refresh_token(&token)
        .map_err(|_| ApiError::Forbidden)?;

    let user = state
        .db
        .find_user_by_username(&claims.sub)
        .await?
        .filter(|u| u.active)
        .ok_or(ApiError::Unauthorized)?;

    let access_token = state
        .tokens
        .mint_access_token(&user.username, &user.roles)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(TokenResponse { access_token }))
}

/// POST /auth/logout - Clear the refresh cookie
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Cookie cleared"),
        (status = 204, description = "No cookie was present; nothing to do")
    )
)]
pub async fn logout_handler(headers: HeaderMap) -> Response {
    if refresh_cookie_value(&headers).is_none() {
        return StatusCode::NO_CONTENT.into_response();
    }
    (
        [(header::SET_COOKIE, clear_refresh_cookie())],
        Json(json!({ "message": "Cookie cleared" })),
    )
        .into_response()
}

//=========================================================================================
// Tests
//=========================================================================================
