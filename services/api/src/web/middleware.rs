//! services/api/src/web/middleware.rs
//!
//! The request pipeline: on-disk request logging, the bearer-token auth gate
//! for resource routes, and per-IP rate limiting on the login route.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::ApiError;
use crate::event_log::{ERROR_LOG, REQUEST_LOG};
use crate::web::state::AppState;

/// Appends `method\tpath\torigin` for every request to the request log.
pub async fn log_request(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let line = format!("{}\t{}\t{}", req.method(), req.uri(), origin);
    state.events.append(&line, REQUEST_LOG).await;
    next.run(req).await
}

/// Auth gate for the resource routes.
///
/// A missing or non-Bearer Authorization header is 401; a header that is
/// present but fails verification (bad signature, expired) is 403. Verified
/// claims are inserted into request extensions.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    let claims = state
        .tokens
        .verify_access_token(token)
        .map_err(|_| ApiError::Forbidden)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Rate limiter for the login route: 5 requests per rolling minute per
/// client IP. Over-limit requests are refused with 429 and recorded in the
/// error log.
pub async fn limit_login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    if state.login_limiter.check_key(&addr.ip()).is_err() {
        let message = "Too many login attempts from this IP, please try again later";
        let line = format!(
            "Too Many Requests from {}: {}\t{}\t{}",
            addr.ip(),
            message,
            req.method(),
            req.uri()
        );
        state.events.append(&line, ERROR_LOG).await;
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "message": message })),
        )
            .into_response();
    }
    next.run(req).await
}
