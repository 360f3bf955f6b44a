//! services/api/src/web/testing.rs
//!
//! Test-only collaborators: an in-memory `DatabaseService` double that
//! mirrors the storage layer's uniqueness and referential rules, plus small
//! helpers for driving handlers directly and inspecting their responses.

use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use governor::{Quota, RateLimiter};
use technotes_core::domain::{Note, NoteWithOwner, User, UserCredentials};
use technotes_core::ports::{DatabaseService, NoteChanges, PortError, PortResult, UserChanges};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ApiError;
use crate::event_log::EventLog;
use crate::web::auth::hash_password;
use crate::web::state::AppState;
use crate::web::tokens::TokenService;

//=========================================================================================
// In-memory DatabaseService double
//=========================================================================================

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<UserCredentials>>,
    notes: Mutex<Vec<Note>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_user(
        &self,
        username: &str,
        password: &str,
        roles: &[&str],
        active: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let user = UserCredentials {
            id,
            username: username.to_string(),
            password_hash: hash_password(password).unwrap(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            active,
        };
        self.users.lock().unwrap().push(user);
        id
    }

    pub async fn seed_note(&self, user_id: Uuid, title: &str, text: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.notes.lock().unwrap().push(Note {
            id,
            user_id,
            title: title.to_string(),
            text: text.to_string(),
            completed: false,
            created_at: now,
            updated_at: now,
        });
        id
    }
}

fn to_user(creds: &UserCredentials) -> User {
    User {
        id: creds.id,
        username: creds.username.clone(),
        roles: creds.roles.clone(),
        active: creds.active,
    }
}

#[async_trait]
impl DatabaseService for MemoryStore {
    async fn list_users(&self) -> PortResult<Vec<User>> {
        let mut users: Vec<User> = self.users.lock().unwrap().iter().map(to_user).collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn find_user_by_id(&self, id: Uuid) -> PortResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .map(to_user))
    }

    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .map(to_user))
    }

    async fn get_user_credentials(&self, username: &str) -> PortResult<Option<UserCredentials>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        roles: &[String],
    ) -> PortResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == username) {
            return Err(PortError::Conflict(format!(
                "duplicate key value violates users_username_key: {username}"
            )));
        }
        let creds = UserCredentials {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            roles: roles.to_vec(),
            active: true,
        };
        let user = to_user(&creds);
        users.push(creds);
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> PortResult<User> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.username == changes.username && u.id != id)
        {
            return Err(PortError::Conflict("duplicate username".to_string()));
        }
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| PortError::NotFound(format!("User {id} not found")))?;
        user.username = changes.username;
        user.roles = changes.roles;
        user.active = changes.active;
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        Ok(to_user(user))
    }

    async fn delete_user(&self, id: Uuid) -> PortResult<()> {
        if self.notes.lock().unwrap().iter().any(|n| n.user_id == id) {
            // Mirrors the ON DELETE RESTRICT constraint.
            return Err(PortError::Conflict("user is still referenced".to_string()));
        }
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(PortError::NotFound(format!("User {id} not found")));
        }
        Ok(())
    }

    async fn user_has_notes(&self, user_id: Uuid) -> PortResult<bool> {
        Ok(self
            .notes
            .lock()
            .unwrap()
            .iter()
            .any(|n| n.user_id == user_id))
    }

    async fn list_notes(&self) -> PortResult<Vec<NoteWithOwner>> {
        let users = self.users.lock().unwrap();
        let notes = self.notes.lock().unwrap();
        Ok(notes
            .iter()
            .filter_map(|note| {
                users.iter().find(|u| u.id == note.user_id).map(|owner| NoteWithOwner {
                    note: note.clone(),
                    username: owner.username.clone(),
                })
            })
            .collect())
    }

    async fn find_note_by_id(&self, id: Uuid) -> PortResult<Option<Note>> {
        Ok(self.notes.lock().unwrap().iter().find(|n| n.id == id).cloned())
    }

    async fn find_note_by_title(&self, title: &str) -> PortResult<Option<Note>> {
        Ok(self
            .notes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.title == title)
            .cloned())
    }

    async fn create_note(&self, user_id: Uuid, title: &str, text: &str) -> PortResult<Note> {
        if !self.users.lock().unwrap().iter().any(|u| u.id == user_id) {
            // Mirrors the foreign-key constraint.
            return Err(PortError::NotFound("User not found".to_string()));
        }
        let mut notes = self.notes.lock().unwrap();
        if notes.iter().any(|n| n.title == title) {
            return Err(PortError::Conflict("duplicate note title".to_string()));
        }
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            text: text.to_string(),
            completed: false,
            created_at: now,
            updated_at: now,
        };
        notes.push(note.clone());
        Ok(note)
    }

    async fn update_note(&self, id: Uuid, changes: NoteChanges) -> PortResult<Note> {
        let mut notes = self.notes.lock().unwrap();
        if notes.iter().any(|n| n.title == changes.title && n.id != id) {
            return Err(PortError::Conflict("duplicate note title".to_string()));
        }
        let note = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Note {id} not found")))?;
        note.user_id = changes.user_id;
        note.title = changes.title;
        note.text = changes.text;
        note.completed = changes.completed;
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    async fn delete_note(&self, id: Uuid) -> PortResult<()> {
        let mut notes = self.notes.lock().unwrap();
        let before = notes.len();
        notes.retain(|n| n.id != id);
        if notes.len() == before {
            return Err(PortError::NotFound(format!("Note {id} not found")));
        }
        Ok(())
    }
}

//=========================================================================================
// State and response helpers
//=========================================================================================

fn test_config() -> Config {
    Config {
        bind_address: ([127, 0, 0, 1], 0).into(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        access_token_secret: "access-secret".to_string(),
        refresh_token_secret: "refresh-secret".to_string(),
        access_token_ttl_secs: 600,
        refresh_token_ttl_secs: 86_400,
        allowed_origins: vec!["http://localhost:3000".to_string()],
        log_dir: std::env::temp_dir().join(format!("technotes-test-{}", Uuid::new_v4())),
        public_dir: "./public".into(),
    }
}

/// Builds an `AppState` around the given store with throwaway secrets and a
/// limiter generous enough to never interfere with tests.
pub fn seeded_state(store: MemoryStore) -> Arc<AppState> {
    let config = test_config();
    let tokens = TokenService::new(
        &config.access_token_secret,
        &config.refresh_token_secret,
        config.access_token_ttl_secs,
        config.refresh_token_ttl_secs,
    );
    let events = EventLog::new(&config.log_dir);
    let login_limiter = RateLimiter::keyed(Quota::per_minute(NonZeroU32::new(1000).unwrap()));
    Arc::new(AppState {
        db: Arc::new(store),
        config: Arc::new(config),
        tokens,
        events,
        login_limiter,
    })
}

/// Collapses a handler result into the response the client would see.
pub fn render<T: IntoResponse>(result: Result<T, ApiError>) -> Response {
    match result {
        Ok(value) => value.into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn status_and_json(response: Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = body_bytes(response).await;
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
