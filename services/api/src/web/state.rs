//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::net::IpAddr;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::RateLimiter;
use technotes_core::ports::DatabaseService;

use crate::config::Config;
use crate::event_log::EventLog;
use crate::web::tokens::TokenService;

/// Keyed per-client-IP limiter guarding the login endpoint.
pub type LoginLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// The shared application state, created once at startup and passed to all
/// handlers. Collaborators are wired here by the composition root rather than
/// reached for as ambient globals.
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub tokens: TokenService,
    pub events: EventLog,
    pub login_limiter: LoginLimiter,
}
