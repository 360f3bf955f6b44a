//! services/api/src/web/fallback.rs
//!
//! Handler for unmatched routes. The 404 body is negotiated from the Accept
//! header: an HTML page for browsers, JSON for API clients, plain text
//! otherwise. This is the only place a true 404 is produced; missing records
//! inside matched routes are flat 400s.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::web::state::AppState;

const FALLBACK_PAGE: &str = "<!DOCTYPE html><html><head><title>404 Not Found</title></head>\
<body><h1>404 Not Found</h1></body></html>";

fn accepts(accept: &str, full: &str, suffix: &str) -> bool {
    accept.contains(full) || accept.contains(suffix) || accept.contains("*/*")
}

pub async fn not_found(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if accepts(accept, "text/html", "html") {
        let page = tokio::fs::read_to_string(state.config.public_dir.join("404.html"))
            .await
            .unwrap_or_else(|_| FALLBACK_PAGE.to_string());
        return (StatusCode::NOT_FOUND, Html(page)).into_response();
    }
    if accepts(accept, "application/json", "json") {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "404 Not Found" })))
            .into_response();
    }
    (StatusCode::NOT_FOUND, "404 Not Found").into_response()
}
