//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `DatabaseService` port from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use technotes_core::domain::{Note, NoteWithOwner, User, UserCredentials};
use technotes_core::ports::{DatabaseService, NoteChanges, PortError, PortResult, UserChanges};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Translates storage errors into port errors. Unique-index violations
/// (23505) become `Conflict` so the loser of a check-then-insert race still
/// gets a conflict response; foreign-key violations (23503) surface as
/// `NotFound` for the referenced user.
fn map_db_err(e: sqlx::Error) -> PortError {
    if let sqlx::Error::Database(db) = &e {
        match db.code().as_deref() {
            Some("23505") => return PortError::Conflict(db.message().to_string()),
            Some("23503") => return PortError::NotFound("User not found".to_string()),
            _ => {}
        }
    }
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    roles: Vec<String>,
    active: bool,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            roles: self.roles,
            active: self.active,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    username: String,
    password_hash: String,
    roles: Vec<String>,
    active: bool,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            roles: self.roles,
            active: self.active,
        }
    }
}

#[derive(FromRow)]
struct NoteRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    text: String,
    completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl NoteRecord {
    fn to_domain(self) -> Note {
        Note {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            text: self.text,
            completed: self.completed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct NoteWithOwnerRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    text: String,
    completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    username: String,
}
impl NoteWithOwnerRecord {
    fn to_domain(self) -> NoteWithOwner {
        NoteWithOwner {
            note: Note {
                id: self.id,
                user_id: self.user_id,
                title: self.title,
                text: self.text,
                completed: self.completed,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            username: self.username,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

const USER_COLUMNS: &str = "id, username, roles, active";
const NOTE_COLUMNS: &str = "id, user_id, title, text, completed, created_at, updated_at";

#[async_trait]
impl DatabaseService for PgStore {
    async fn list_users(&self) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn find_user_by_id(&self, id: Uuid) -> PortResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn get_user_credentials(&self, username: &str) -> PortResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, username, password_hash, roles, active FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        roles: &[String],
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, username, password_hash, roles) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .bind(roles)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(record.to_domain())
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET username = $2, roles = $3, active = $4, \
             password_hash = COALESCE($5, password_hash) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.username)
        .bind(&changes.roles)
        .bind(changes.active)
        .bind(&changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        record
            .map(|r| r.to_domain())
            .ok_or_else(|| PortError::NotFound(format!("User {id} not found")))
    }

    async fn delete_user(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {id} not found")));
        }
        Ok(())
    }

    async fn user_has_notes(&self, user_id: Uuid) -> PortResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM notes WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_err)?;
        Ok(exists)
    }

    async fn list_notes(&self) -> PortResult<Vec<NoteWithOwner>> {
        let records = sqlx::query_as::<_, NoteWithOwnerRecord>(
            "SELECT n.id, n.user_id, n.title, n.text, n.completed, \
             n.created_at, n.updated_at, u.username \
             FROM notes n JOIN users u ON u.id = n.user_id \
             ORDER BY n.created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn find_note_by_id(&self, id: Uuid) -> PortResult<Option<Note>> {
        let record = sqlx::query_as::<_, NoteRecord>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn find_note_by_title(&self, title: &str) -> PortResult<Option<Note>> {
        let record = sqlx::query_as::<_, NoteRecord>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE title = $1"
        ))
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn create_note(&self, user_id: Uuid, title: &str, text: &str) -> PortResult<Note> {
        let record = sqlx::query_as::<_, NoteRecord>(&format!(
            "INSERT INTO notes (id, user_id, title, text) \
             VALUES ($1, $2, $3, $4) RETURNING {NOTE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(record.to_domain())
    }

    async fn update_note(&self, id: Uuid, changes: NoteChanges) -> PortResult<Note> {
        let record = sqlx::query_as::<_, NoteRecord>(&format!(
            "UPDATE notes SET user_id = $2, title = $3, text = $4, completed = $5, \
             updated_at = now() WHERE id = $1 RETURNING {NOTE_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.user_id)
        .bind(&changes.title)
        .bind(&changes.text)
        .bind(changes.completed)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        record
            .map(|r| r.to_domain())
            .ok_or_else(|| PortError::NotFound(format!("Note {id} not found")))
    }

    async fn delete_note(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Note {id} not found")));
        }
        Ok(())
    }
}
