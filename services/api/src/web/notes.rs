//! services/api/src/web/notes.rs
//!
//! CRUD over notes. Titles are unique globally (not per user), and every
//! note must point at an existing user. List responses resolve the owning
//! user's username instead of returning the bare id.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use technotes_core::domain::NoteWithOwner;
use technotes_core::ports::{NoteChanges, PortError};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::extract::{ValidJson, ALL_FIELDS_REQUIRED};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateNoteRequest {
    /// Owning user's id.
    pub user: Option<Uuid>,
    pub title: Option<String>,
    pub text: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateNoteRequest {
    pub id: Option<Uuid>,
    pub user: Option<Uuid>,
    pub title: Option<String>,
    pub text: Option<String>,
    /// Required on update. Absence or a non-boolean JSON value fails
    /// validation even when every other field is fine.
    pub completed: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct DeleteNoteRequest {
    pub id: Option<Uuid>,
}

#[derive(Serialize, ToSchema)]
pub struct NoteOwner {
    pub id: Uuid,
    pub username: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: Uuid,
    pub user: NoteOwner,
    pub title: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NoteWithOwner> for NoteResponse {
    fn from(owned: NoteWithOwner) -> Self {
        let note = owned.note;
        Self {
            id: note.id,
            user: NoteOwner {
                id: note.user_id,
                username: owned.username,
            },
            title: note.title,
            text: note.text,
            completed: note.completed,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /notes - List all notes with owners resolved
#[utoipa::path(
    get,
    path = "/notes",
    responses(
        (status = 200, description = "All notes with owning usernames", body = [NoteResponse]),
        (status = 400, description = "No notes exist")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_notes_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<NoteResponse>>, ApiError> {
    let notes = state.db.list_notes().await?;
    if notes.is_empty() {
        return Err(ApiError::NotFound("No notes found".to_string()));
    }
    Ok(Json(notes.into_iter().map(NoteResponse::from).collect()))
}

/// POST /notes - Create a new note
#[utoipa::path(
    post,
    path = "/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created"),
        (status = 400, description = "Missing fields, unknown user, or storage rejection"),
        (status = 409, description = "Duplicate note title")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_note_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(user_id), Some(title), Some(text)) = (req.user, req.title, req.text) else {
        return Err(ApiError::Validation(ALL_FIELDS_REQUIRED.to_string()));
    };
    if title.is_empty() || text.is_empty() {
        return Err(ApiError::Validation(ALL_FIELDS_REQUIRED.to_string()));
    }

    if state.db.find_note_by_title(&title).await?.is_some() {
        return Err(ApiError::Conflict("Duplicate note title".to_string()));
    }

    if state.db.find_user_by_id(user_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    match state.db.create_note(user_id, &title, &text).await {
        Ok(_) => Ok((
            StatusCode::CREATED,
            Json(json!({ "message": "New note created" })),
        )),
        Err(PortError::Conflict(_)) => {
            Err(ApiError::Conflict("Duplicate note title".to_string()))
        }
        Err(_) => Err(ApiError::Storage("Invalid note data received".to_string())),
    }
}

/// PATCH /notes - Update a note wholesale
#[utoipa::path(
    patch,
    path = "/notes",
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Note updated"),
        (status = 400, description = "Missing fields or unknown note/user"),
        (status = 409, description = "Duplicate note title")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_note_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<UpdateNoteRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (Some(id), Some(user_id), Some(title), Some(text), Some(completed)) =
        (req.id, req.user, req.title, req.text, req.completed)
    else {
        return Err(ApiError::Validation(ALL_FIELDS_REQUIRED.to_string()));
    };
    if title.is_empty() || text.is_empty() {
        return Err(ApiError::Validation(ALL_FIELDS_REQUIRED.to_string()));
    }

    if state.db.find_note_by_id(id).await?.is_none() {
        return Err(ApiError::NotFound("Note not found".to_string()));
    }

    // Renaming a note to its current title must succeed.
    if let Some(duplicate) = state.db.find_note_by_title(&title).await? {
        if duplicate.id != id {
            return Err(ApiError::Conflict("Duplicate note title".to_string()));
        }
    }

    if state.db.find_user_by_id(user_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let changes = NoteChanges {
        user_id,
        title,
        text,
        completed,
    };
    let updated = match state.db.update_note(id, changes).await {
        Ok(note) => note,
        Err(PortError::Conflict(_)) => {
            return Err(ApiError::Conflict("Duplicate note title".to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(json!({ "message": format!("'{}' updated", updated.title) })))
}

/// DELETE /notes - Delete a note by id
#[utoipa::path(
    delete,
    path = "/notes",
    request_body = DeleteNoteRequest,
    responses(
        (status = 200, description = "Note deleted"),
        (status = 400, description = "Missing id or unknown note")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_note_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<DeleteNoteRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(id) = req.id else {
        return Err(ApiError::Validation("Note ID required".to_string()));
    };

    let Some(note) = state.db.find_note_by_id(id).await? else {
        return Err(ApiError::NotFound("Note not found".to_string()));
    };

    state.db.delete_note(id).await?;

    Ok(Json(json!({
        "message": format!("Note '{}' with ID {} deleted", note.title, note.id)
    })))
}

//=========================================================================================
// Tests
//=========================================================================================
