//! In-memory API double for deterministic testing.
//!
//! [`MockApi`] behaves like a small Paper Trail server: it keeps users, a
//! session and a note table, assigns ids and timestamps, and answers 401 when
//! no session is active. Tests can script failures per operation and hold a
//! response back until they release it, which is how out-of-order network
//! responses are simulated.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use papertrail_core::mock::{MockApi, MockOp};
//! use papertrail_core::{Error, NotesApi, NoteDraft};
//!
//! # async fn demo() {
//! let api = MockApi::new().with_user("alice", "pw").with_session("alice");
//! api.fail_next(MockOp::CreateNote, Error::rejected(500, "boom"));
//! assert!(api.create_note(&NoteDraft::new("T", "C")).await.is_err());
//! # }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::models::*;
use crate::traits::NotesApi;

/// Operation names used to script failures and gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Login,
    Register,
    Logout,
    Me,
    ListNotes,
    GetNote,
    SearchNotes,
    CreateNote,
    UpdateNote,
    DeleteNote,
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub op: MockOp,
    pub note_id: Option<i64>,
}

/// Holds one response of an operation until released (or dropped).
pub struct MockGate {
    tx: Option<oneshot::Sender<()>>,
}

impl MockGate {
    /// Let the held response through.
    pub fn release(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

struct MockState {
    users: HashMap<String, String>,
    session_user: Option<String>,
    notes: Vec<Note>,
    next_id: i64,
    clock: DateTime<Utc>,
    token_counter: u64,
    failures: HashMap<MockOp, VecDeque<Error>>,
    gates: HashMap<MockOp, VecDeque<oneshot::Receiver<()>>>,
    calls: Vec<MockCall>,
}

/// Mock REST API for tests.
#[derive(Clone)]
pub struct MockApi {
    state: Arc<Mutex<MockState>>,
    mode: AuthMode,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApi {
    /// Empty server, bearer mode, clock at 2026-01-01T00:00:00Z.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                users: HashMap::new(),
                session_user: None,
                notes: Vec::new(),
                next_id: 1,
                clock: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
                token_counter: 0,
                failures: HashMap::new(),
                gates: HashMap::new(),
                calls: Vec::new(),
            })),
            mode: AuthMode::Bearer,
        }
    }

    /// Switch to cookie mode: login issues no token.
    pub fn cookie_mode(mut self) -> Self {
        self.mode = AuthMode::Cookie;
        self
    }

    /// Register a user.
    pub fn with_user(self, username: &str, password: &str) -> Self {
        self.lock()
            .users
            .insert(username.to_string(), password.to_string());
        self
    }

    /// Start with an active server-side session for `username`.
    pub fn with_session(self, username: &str) -> Self {
        self.lock().session_user = Some(username.to_string());
        self
    }

    /// Seed the note table (server order is preserved).
    pub fn with_notes(self, notes: Vec<Note>) -> Self {
        {
            let mut state = self.lock();
            let max_id = notes
                .iter()
                .filter_map(|n| n.id.server_id())
                .max()
                .unwrap_or(0);
            state.next_id = max_id + 1;
            state.notes = notes;
        }
        self
    }

    /// Make the next call of `op` fail with `err` (queued per op).
    pub fn fail_next(&self, op: MockOp, err: Error) {
        self.lock().failures.entry(op).or_default().push_back(err);
    }

    /// Hold the next response of `op` until the returned gate is released.
    /// The response is computed when the call arrives, not when released.
    pub fn hold(&self, op: MockOp) -> MockGate {
        let (tx, rx) = oneshot::channel();
        self.lock().gates.entry(op).or_default().push_back(rx);
        MockGate { tx: Some(tx) }
    }

    /// Invalidate the server-side session; later calls answer 401.
    pub fn expire_session(&self) {
        self.lock().session_user = None;
    }

    pub fn session_user(&self) -> Option<String> {
        self.lock().session_user.clone()
    }

    /// Server-side note table in server order.
    pub fn server_notes(&self) -> Vec<Note> {
        self.lock().notes.clone()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, op: MockOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op == op).count()
    }

    /// Current server clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.lock().clock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn respond<T, F>(&self, op: MockOp, note_id: Option<i64>, f: F) -> Result<T>
    where
        F: FnOnce(&mut MockState) -> Result<T> + Send,
        T: Send,
    {
        let (result, gate) = {
            let mut state = self.lock();
            state.calls.push(MockCall { op, note_id });
            let gate = state.gates.get_mut(&op).and_then(|q| q.pop_front());
            let scripted = state.failures.get_mut(&op).and_then(|q| q.pop_front());
            let result = match scripted {
                Some(err) => Err(err),
                None => f(&mut *state),
            };
            (result, gate)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        result
    }
}

impl MockState {
    fn require_session(&self) -> Result<()> {
        if self.session_user.is_none() {
            return Err(Error::Unauthorized("Not authenticated".to_string()));
        }
        Ok(())
    }

    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += Duration::minutes(1);
        self.clock
    }

    fn position(&self, id: i64) -> Option<usize> {
        self.notes.iter().position(|n| n.id == NoteId::Server(id))
    }

    fn not_found() -> Error {
        Error::rejected(404, "Note not found")
    }
}

#[async_trait]
impl NotesApi for MockApi {
    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant> {
        let issue_token = self.mode == AuthMode::Bearer;
        self.respond(MockOp::Login, None, |state| {
            match state.users.get(&credentials.username) {
                Some(pw) if *pw == credentials.password => {
                    state.session_user = Some(credentials.username.clone());
                    state.token_counter += 1;
                    let token = issue_token
                        .then(|| format!("token-{}-{}", credentials.username, state.token_counter));
                    Ok(AuthGrant {
                        token,
                        user: User::named(credentials.username.clone()),
                    })
                }
                _ => Err(Error::Unauthorized(
                    "Incorrect username or password".to_string(),
                )),
            }
        })
        .await
    }

    async fn register(&self, credentials: &Credentials) -> Result<()> {
        self.respond(MockOp::Register, None, |state| {
            if state.users.contains_key(&credentials.username) {
                return Err(Error::rejected(400, "Username already registered"));
            }
            state
                .users
                .insert(credentials.username.clone(), credentials.password.clone());
            Ok(())
        })
        .await
    }

    async fn logout(&self) -> Result<()> {
        self.respond(MockOp::Logout, None, |state| {
            state.session_user = None;
            Ok(())
        })
        .await
    }

    async fn me(&self) -> Result<User> {
        self.respond(MockOp::Me, None, |state| {
            state.require_session()?;
            Ok(User::named(state.session_user.clone().unwrap_or_default()))
        })
        .await
    }

    async fn list_notes(&self) -> Result<Vec<Note>> {
        self.respond(MockOp::ListNotes, None, |state| {
            state.require_session()?;
            Ok(state.notes.clone())
        })
        .await
    }

    async fn get_note(&self, id: i64) -> Result<Note> {
        self.respond(MockOp::GetNote, Some(id), |state| {
            state.require_session()?;
            let idx = state.position(id).ok_or_else(MockState::not_found)?;
            Ok(state.notes[idx].clone())
        })
        .await
    }

    async fn search_notes(&self, query: &str) -> Result<Vec<Note>> {
        let needle = query.to_lowercase();
        self.respond(MockOp::SearchNotes, None, |state| {
            state.require_session()?;
            Ok(state
                .notes
                .iter()
                .filter(|n| {
                    n.title.to_lowercase().contains(&needle)
                        || n.content.to_lowercase().contains(&needle)
                })
                .cloned()
                .collect())
        })
        .await
    }

    async fn create_note(&self, draft: &NoteDraft) -> Result<Note> {
        self.respond(MockOp::CreateNote, None, |state| {
            state.require_session()?;
            let now = state.tick();
            let note = Note {
                id: NoteId::Server(state.next_id),
                title: draft.title.clone(),
                content: draft.content.clone(),
                category: draft.category.clone(),
                tags: draft.tags.clone(),
                created_at: now,
                updated_at: now,
            };
            state.next_id += 1;
            state.notes.insert(0, note.clone());
            Ok(note)
        })
        .await
    }

    async fn update_note(&self, id: i64, draft: &NoteDraft) -> Result<Note> {
        self.respond(MockOp::UpdateNote, Some(id), |state| {
            state.require_session()?;
            let idx = state.position(id).ok_or_else(MockState::not_found)?;
            let now = state.tick();
            let note = &mut state.notes[idx];
            note.title = draft.title.clone();
            note.content = draft.content.clone();
            note.category = draft.category.clone();
            note.tags = draft.tags.clone();
            note.updated_at = now;
            Ok(note.clone())
        })
        .await
    }

    async fn delete_note(&self, id: i64) -> Result<DeleteOutcome> {
        self.respond(MockOp::DeleteNote, Some(id), |state| {
            state.require_session()?;
            match state.position(id) {
                Some(idx) => {
                    state.notes.remove(idx);
                    Ok(DeleteOutcome::Deleted)
                }
                None => Ok(DeleteOutcome::AlreadyGone),
            }
        })
        .await
    }

    fn auth_mode(&self) -> AuthMode {
        self.mode
    }
}
