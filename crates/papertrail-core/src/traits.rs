//! Core traits for the Paper Trail client.
//!
//! These traits are the seams between the session/note layer and the
//! outside world: the REST API and the durable credential store. The HTTP
//! transport and the in-memory doubles both implement them.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// REMOTE API
// =============================================================================

/// The REST contract consumed by the session manager and the note store.
///
/// Implementations attach credentials to every request and normalize every
/// failure into [`crate::Error`].
#[async_trait]
pub trait NotesApi: Send + Sync {
    /// `POST /login`.
    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant>;

    /// `POST /register`.
    async fn register(&self, credentials: &Credentials) -> Result<()>;

    /// `POST /logout`. Idempotent on the server.
    async fn logout(&self) -> Result<()>;

    /// `GET /me`.
    async fn me(&self) -> Result<User>;

    /// `GET /notes`.
    async fn list_notes(&self) -> Result<Vec<Note>>;

    /// `GET /notes/{id}`.
    async fn get_note(&self, id: i64) -> Result<Note>;

    /// `GET /notes/search?q=`.
    async fn search_notes(&self, query: &str) -> Result<Vec<Note>>;

    /// `POST /notes`.
    async fn create_note(&self, draft: &NoteDraft) -> Result<Note>;

    /// `PUT /notes/{id}` with the full draft.
    async fn update_note(&self, id: i64, draft: &NoteDraft) -> Result<Note>;

    /// `DELETE /notes/{id}`.
    async fn delete_note(&self, id: i64) -> Result<DeleteOutcome>;

    /// How this API instance propagates credentials.
    fn auth_mode(&self) -> AuthMode;
}

// =============================================================================
// CREDENTIAL STORAGE
// =============================================================================

/// Durable home of the credential token.
///
/// Read by the transport on every request, written by login, erased by
/// logout and by the invalid-session path.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<Option<String>>;

    fn set(&self, token: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Process-local credential store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: std::sync::RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token, as if persisted by an earlier run.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: std::sync::RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self
            .token
            .read()
            .map_err(|_| crate::Error::Storage("credential lock poisoned".to_string()))?
            .clone())
    }

    fn set(&self, token: &str) -> Result<()> {
        *self
            .token
            .write()
            .map_err(|_| crate::Error::Storage("credential lock poisoned".to_string()))? =
            Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self
            .token
            .write()
            .map_err(|_| crate::Error::Storage("credential lock poisoned".to_string()))? = None;
        Ok(())
    }
}
