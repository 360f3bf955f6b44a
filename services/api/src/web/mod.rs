//! services/api/src/web/mod.rs
//!
//! The web layer: handlers, middleware, shared state, and the master
//! OpenAPI definition.

pub mod auth;
pub mod extract;
pub mod fallback;
pub mod middleware;
pub mod notes;
pub mod state;
pub mod tokens;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub use middleware::{limit_login, log_request, require_auth};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        auth::login_handler,
        auth::refresh_handler,
        auth::logout_handler,
        users::list_users_handler,
        users::create_user_handler,
        users::update_user_handler,
        users::delete_user_handler,
        notes::list_notes_handler,
        notes::create_note_handler,
        notes::update_note_handler,
        notes::delete_note_handler,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::TokenResponse,
            users::CreateUserRequest,
            users::UpdateUserRequest,
            users::DeleteUserRequest,
            users::UserResponse,
            notes::CreateNoteRequest,
            notes::UpdateNoteRequest,
            notes::DeleteNoteRequest,
            notes::NoteResponse,
            notes::NoteOwner,
        )
    ),
    tags(
        (name = "technotes API", description = "Users and notes CRUD behind JWT sessions.")
    )
)]
pub struct ApiDoc;
