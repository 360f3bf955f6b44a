//! crates/technotes_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete storage implementation.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Note, NoteWithOwner, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint was violated at the storage layer. The
    /// application performs its own pre-checks, but this is the authoritative
    /// signal when two writes race between check and insert.
    #[error("Uniqueness violation: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Write Payloads
//=========================================================================================

/// Field set for a full user update. `password_hash` is `None` when the
/// caller did not supply a new password, in which case the stored hash is
/// left untouched.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub username: String,
    pub roles: Vec<String>,
    pub active: bool,
    pub password_hash: Option<String>,
}

/// Field set for a full note update. Updates are wholesale: every field is
/// overwritten, there is no partial merge.
#[derive(Debug, Clone)]
pub struct NoteChanges {
    pub user_id: Uuid,
    pub title: String,
    pub text: String,
    pub completed: bool,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    async fn list_users(&self) -> PortResult<Vec<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> PortResult<Option<User>>;

    /// Exact-match lookup, used for uniqueness checks and refresh lookups.
    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<User>>;

    /// Login-path lookup that includes the stored password hash.
    async fn get_user_credentials(&self, username: &str) -> PortResult<Option<UserCredentials>>;

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        roles: &[String],
    ) -> PortResult<User>;

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> PortResult<User>;

    async fn delete_user(&self, id: Uuid) -> PortResult<()>;

    /// Whether any note still references this user. Deletion is refused while
    /// this holds, never cascaded.
    async fn user_has_notes(&self, user_id: Uuid) -> PortResult<bool>;

    // --- Notes ---
    async fn list_notes(&self) -> PortResult<Vec<NoteWithOwner>>;

    async fn find_note_by_id(&self, id: Uuid) -> PortResult<Option<Note>>;

    /// Exact-match title lookup, global across all notes.
    async fn find_note_by_title(&self, title: &str) -> PortResult<Option<Note>>;

    async fn create_note(&self, user_id: Uuid, title: &str, text: &str) -> PortResult<Note>;

    async fn update_note(&self, id: Uuid, changes: NoteChanges) -> PortResult<Note>;

    async fn delete_note(&self, id: Uuid) -> PortResult<()>;
}
