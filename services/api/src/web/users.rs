//! services/api/src/web/users.rs
//!
//! CRUD over user accounts. Ids travel in the JSON body, not the path.
//!
//! Every mutating handler validates in a fixed order: field presence/type,
//! then uniqueness, then existence of referenced records. Reordering these
//! changes which error a malformed request surfaces first.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use technotes_core::domain::User;
use technotes_core::ports::{PortError, UserChanges};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::auth::hash_password;
use crate::web::extract::{ValidJson, ALL_FIELDS_REQUIRED};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub roles: Option<Vec<String>>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub id: Option<Uuid>,
    pub username: Option<String>,
    pub roles: Option<Vec<String>>,
    pub active: Option<bool>,
    /// Optional: the stored hash is kept when absent.
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct DeleteUserRequest {
    pub id: Option<Uuid>,
}

/// A user as returned to clients. No password material, ever.
#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub roles: Vec<String>,
    pub active: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            roles: user.roles,
            active: user.active,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /users - List all users
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users, passwords excluded", body = [UserResponse]),
        (status = 400, description = "No users exist")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.db.list_users().await?;
    if users.is_empty() {
        return Err(ApiError::NotFound("No users found".to_string()));
    }
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// POST /users - Create a new user
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Missing fields or storage rejection"),
        (status = 409, description = "Duplicate username")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(password), Some(roles)) = (req.username, req.password, req.roles)
    else {
        return Err(ApiError::Validation(ALL_FIELDS_REQUIRED.to_string()));
    };
    if username.is_empty() || password.is_empty() || roles.is_empty() {
        return Err(ApiError::Validation(ALL_FIELDS_REQUIRED.to_string()));
    }

    if state.db.find_user_by_username(&username).await?.is_some() {
        return Err(ApiError::Conflict("Duplicate username".to_string()));
    }

    let password_hash = hash_password(&password)?;
    match state.db.create_user(&username, &password_hash, &roles).await {
        Ok(_) => Ok((
            StatusCode::CREATED,
            Json(json!({ "message": format!("New user {username} created") })),
        )),
        // The unique index caught a create that raced past the pre-check.
        Err(PortError::Conflict(_)) => Err(ApiError::Conflict("Duplicate username".to_string())),
        Err(_) => Err(ApiError::Storage("Invalid user data received".to_string())),
    }
}

/// PATCH /users - Update a user wholesale
#[utoipa::path(
    patch,
    path = "/users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated"),
        (status = 400, description = "Missing fields or unknown user"),
        (status = 409, description = "Duplicate username")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (Some(id), Some(username), Some(roles), Some(active)) =
        (req.id, req.username, req.roles, req.active)
    else {
        return Err(ApiError::Validation(ALL_FIELDS_REQUIRED.to_string()));
    };
    if username.is_empty() || roles.is_empty() {
        return Err(ApiError::Validation(ALL_FIELDS_REQUIRED.to_string()));
    }

    if state.db.find_user_by_id(id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    // Renaming a user to their current username must succeed: the record
    // being updated is excluded from the uniqueness check by id.
    if let Some(duplicate) = state.db.find_user_by_username(&username).await? {
        if duplicate.id != id {
            return Err(ApiError::Conflict("Duplicate username".to_string()));
        }
    }

    let password_hash = match req.password.filter(|p| !p.is_empty()) {
        Some(password) => Some(hash_password(&password)?),
        None => None,
    };

    let changes = UserChanges {
        username,
        roles,
        active,
        password_hash,
    };
    let updated = match state.db.update_user(id, changes).await {
        Ok(user) => user,
        Err(PortError::Conflict(_)) => {
            return Err(ApiError::Conflict("Duplicate username".to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(json!({ "message": format!("{} updated", updated.username) })))
}

/// DELETE /users - Delete a user with no notes
#[utoipa::path(
    delete,
    path = "/users",
    request_body = DeleteUserRequest,
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Missing id, unknown user, or user still owns notes")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<DeleteUserRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(id) = req.id else {
        return Err(ApiError::Validation("UserID required".to_string()));
    };

    let Some(user) = state.db.find_user_by_id(id).await? else {
        return Err(ApiError::NotFound("User not found".to_string()));
    };

    // Deletion is refused while notes reference the user, never cascaded.
    if state.db.user_has_notes(id).await? {
        return Err(ApiError::Validation("User has assigned notes".to_string()));
    }

    state.db.delete_user(id).await?;

    Ok(Json(json!({
        "message": format!("Username {} with ID {} deleted", user.username, user.id)
    })))
}

//=========================================================================================
// Tests
//=========================================================================================
