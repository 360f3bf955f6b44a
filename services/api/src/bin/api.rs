//! services/api/src/bin/api.rs
//!
//! The composition root. Loads configuration, connects the store, builds the
//! token service, rate limiter and event log, and wires all of them into the
//! request pipeline as passed-in collaborators.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use api_lib::adapters::PgStore;
use api_lib::config::Config;
use api_lib::error::ApiError;
use api_lib::event_log::{EventLog, DB_ERROR_LOG};
use api_lib::web::auth::{login_handler, logout_handler, refresh_handler};
use api_lib::web::notes::{
    create_note_handler, delete_note_handler, list_notes_handler, update_note_handler,
};
use api_lib::web::state::AppState;
use api_lib::web::tokens::TokenService;
use api_lib::web::users::{
    create_user_handler, delete_user_handler, list_users_handler, update_user_handler,
};
use api_lib::web::{fallback, limit_login, log_request, require_auth, ApiDoc};
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;
use governor::{Quota, RateLimiter};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    let events = EventLog::new(&config.log_dir);

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = match PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            events.append(&e.to_string(), DB_ERROR_LOG).await;
            return Err(e.into());
        }
    };
    let store = Arc::new(PgStore::new(db_pool));
    info!("Running database migrations...");
    if let Err(e) = store.run_migrations().await {
        events.append(&e.to_string(), DB_ERROR_LOG).await;
        return Err(ApiError::Internal(e.to_string()));
    }
    info!("Database migrations complete.");

    // --- 3. Build Collaborators ---
    let tokens = TokenService::new(
        &config.access_token_secret,
        &config.refresh_token_secret,
        config.access_token_ttl_secs,
        config.refresh_token_ttl_secs,
    );

    // 5 login attempts per rolling minute per source address.
    let login_quota = Quota::per_minute(NonZeroU32::new(5).expect("quota is nonzero"));
    let login_limiter = RateLimiter::keyed(login_quota);

    // --- 4. Build the Shared AppState ---
    let state = Arc::new(AppState {
        db: store,
        config: config.clone(),
        tokens,
        events,
        login_limiter,
    });

    // --- 5. CORS from Configured Origins ---
    let mut origins = Vec::with_capacity(config.allowed_origins.len());
    for origin in &config.allowed_origins {
        let value = origin
            .parse::<HeaderValue>()
            .map_err(|e| ApiError::Internal(format!("invalid allowed origin '{origin}': {e}")))?;
        origins.push(value);
    }
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Session routes are public; login alone sits behind the rate limiter.
    let auth_routes = Router::new()
        .route(
            "/auth",
            post(login_handler)
                .layer(axum_middleware::from_fn_with_state(state.clone(), limit_login)),
        )
        .route("/auth/refresh", get(refresh_handler))
        .route("/auth/logout", post(logout_handler));

    // Resource routes sit behind the bearer-token gate.
    let resource_routes = Router::new()
        .route(
            "/users",
            get(list_users_handler)
                .post(create_user_handler)
                .patch(update_user_handler)
                .delete(delete_user_handler),
        )
        .route(
            "/notes",
            get(list_notes_handler)
                .post(create_note_handler)
                .patch(update_note_handler)
                .delete(delete_note_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(auth_routes)
        .merge(resource_routes)
        .route_service("/", ServeFile::new(config.public_dir.join("index.html")))
        .nest_service("/public", ServeDir::new(&config.public_dir))
        .fallback(fallback::not_found)
        .layer(cors)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            log_request,
        ))
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
