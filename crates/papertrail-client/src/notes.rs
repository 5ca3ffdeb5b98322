//! Note store: the authenticated user's notes, updated optimistically.
//!
//! The store owns the only authoritative in-memory collection. Readers get
//! an immutable `Arc<[Note]>` snapshot; every visible change swaps in a new
//! snapshot and advances [`NoteStore::revision`].
//!
//! The lock is held only for short synchronous sections, never across a
//! network call. Completions are checked against the session epoch and,
//! for per-note mutations, the note's latest sequence number before they
//! may touch the collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use papertrail_core::{
    ClientEvent, DeleteOutcome, Error, EventBus, Note, NoteDraft, NoteId, NotePatch, NotesApi,
    Result,
};
use tracing::{debug, instrument, warn};

use crate::optimistic::{commit_created, commit_updated, position, Sequencer, Ticket, Undo};
use crate::session::SessionManager;

/// Optimistically-updated cache of the current user's notes.
#[derive(Clone)]
pub struct NoteStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    api: Arc<dyn NotesApi>,
    session: SessionManager,
    events: EventBus,
    state: Mutex<StoreState>,
    load_seq: AtomicU64,
}

struct StoreState {
    notes: Arc<[Note]>,
    revision: u64,
    /// Session epoch the collection belongs to.
    epoch: u64,
    /// Sequence number of the newest load applied.
    applied_load: u64,
    seq: Sequencer,
}

impl StoreState {
    /// Copy-on-write edit of the collection. Bumps the revision only when
    /// `f` reports a change.
    fn edit(&mut self, f: impl FnOnce(&mut Vec<Note>) -> bool) -> bool {
        let mut notes = self.notes.to_vec();
        let changed = f(&mut notes);
        if changed {
            self.notes = notes.into();
            self.revision += 1;
        }
        changed
    }

    fn changed_event(&self) -> ClientEvent {
        ClientEvent::NotesChanged {
            revision: self.revision,
            count: self.notes.len(),
        }
    }
}

impl NoteStore {
    pub fn new(api: Arc<dyn NotesApi>, session: SessionManager, events: EventBus) -> Self {
        let epoch = session.epoch();
        Self {
            inner: Arc::new(StoreInner {
                api,
                session,
                events,
                state: Mutex::new(StoreState {
                    notes: Arc::from(Vec::new()),
                    revision: 0,
                    epoch,
                    applied_load: 0,
                    seq: Sequencer::default(),
                }),
                load_seq: AtomicU64::new(0),
            }),
        }
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// Current collection.
    pub fn notes(&self) -> Arc<[Note]> {
        self.lock().notes.clone()
    }

    /// Revision and collection read together.
    pub fn snapshot(&self) -> (u64, Arc<[Note]>) {
        let state = self.lock();
        (state.revision, state.notes.clone())
    }

    /// Advances on every visible change of the collection.
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    pub fn get(&self, id: NoteId) -> Option<Note> {
        self.lock().notes.iter().find(|n| n.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().notes.is_empty()
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Replace the collection with the server's. Placeholders of creates
    /// still in flight are kept at the front.
    ///
    /// A response older than an already-applied load is discarded and the
    /// current collection returned instead.
    #[instrument(skip(self), fields(component = "notes", op = "load"))]
    pub async fn load(&self) -> Result<Arc<[Note]>> {
        let epoch = self.require_session("load")?;
        let seq = self.inner.load_seq.fetch_add(1, Ordering::AcqRel) + 1;
        let start = Instant::now();

        let fetched = match self.inner.api.list_notes().await {
            Ok(notes) => notes,
            Err(e) => return Err(self.fail("load", epoch, e)),
        };

        if !self.inner.session.is_current(epoch) {
            debug!(seq, "Load resolved after the session changed; discarded");
            return Err(Error::PreconditionFailed(
                "session ended while loading notes".to_string(),
            ));
        }

        let (notes, event) = {
            let mut state = self.lock();
            if seq <= state.applied_load {
                debug!(
                    seq,
                    applied = state.applied_load,
                    "Stale load response discarded"
                );
                return Ok(state.notes.clone());
            }
            state.applied_load = seq;
            state.edit(|notes| {
                let mut next: Vec<Note> =
                    notes.iter().filter(|n| n.is_placeholder()).cloned().collect();
                next.extend(fetched);
                *notes = next;
                true
            });
            (state.notes.clone(), state.changed_event())
        };
        self.inner.events.emit(event);

        debug!(
            seq,
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Loaded notes"
        );
        Ok(notes)
    }

    /// Same as [`NoteStore::load`].
    pub async fn refresh(&self) -> Result<Arc<[Note]>> {
        self.load().await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a note. A placeholder with a local id appears at the front
    /// immediately and is replaced by the server's record on success.
    #[instrument(skip(self, draft), fields(component = "notes", op = "create"))]
    pub async fn create(&self, draft: NoteDraft) -> Result<Note> {
        let draft = draft.normalized()?;
        let epoch = self.require_session("create")?;

        let placeholder = Note::placeholder(&draft);
        let ticket = {
            let mut state = self.lock();
            let id = placeholder.id;
            let seq = state.seq.issue(id, None);
            state.edit(|notes| {
                notes.insert(0, placeholder);
                true
            });
            self.inner.events.emit(state.changed_event());
            Ticket {
                op: "create",
                id,
                seq,
                epoch,
            }
        };
        debug!(note_id = %ticket.id, "Inserted placeholder");

        let result = self.inner.api.create_note(&draft).await;
        self.resolve(
            ticket,
            Undo::Remove(ticket.id),
            result,
            |notes, created| {
                commit_created(notes, ticket.id, created.clone());
                true
            },
            |_| None,
        )
    }

    /// Apply `patch` to note `id`. The change is visible immediately and
    /// reverted if the server refuses it.
    #[instrument(skip(self, patch), fields(component = "notes", op = "update", note_id = %id))]
    pub async fn update(&self, id: NoteId, patch: NotePatch) -> Result<Note> {
        let patch = patch.normalized()?;
        let epoch = self.require_session("update")?;
        let server_id = Self::server_id("update", id)?;

        let (ticket, before, draft) = {
            let mut state = self.lock();
            let idx = position(&state.notes, id)
                .ok_or_else(|| Error::NotFound(format!("note {} is not loaded", id)))?;
            let before = state.notes[idx].clone();
            if patch.is_empty() {
                return Ok(before);
            }

            let mut merged = before.clone();
            merged.apply_patch(&patch);
            let draft = merged.to_draft();
            let seq = state.seq.issue(id, Some(&before));
            state.edit(|notes| {
                notes[idx] = merged;
                true
            });
            self.inner.events.emit(state.changed_event());
            (
                Ticket {
                    op: "update",
                    id,
                    seq,
                    epoch,
                },
                before,
                draft,
            )
        };

        let result = self.inner.api.update_note(server_id, &draft).await;
        self.resolve(
            ticket,
            Undo::Restore(before),
            result,
            |notes, updated| commit_updated(notes, updated.clone()),
            |updated| Some(updated.clone()),
        )
    }

    /// Delete note `id`. It disappears immediately and comes back at its
    /// former position if the server refuses. An id that is not loaded is
    /// still sent to the server; a 404 counts as success.
    #[instrument(skip(self), fields(component = "notes", op = "delete", note_id = %id))]
    pub async fn delete(&self, id: NoteId) -> Result<DeleteOutcome> {
        let epoch = self.require_session("delete")?;
        let server_id = Self::server_id("delete", id)?;

        let (ticket, undo) = {
            let mut state = self.lock();
            let current = position(&state.notes, id).map(|idx| state.notes[idx].clone());
            let seq = state.seq.issue(id, current.as_ref());
            let mut undo = Undo::Nothing;
            state.edit(|notes| match position(notes, id) {
                Some(index) => {
                    undo = Undo::Reinsert {
                        index,
                        note: notes.remove(index),
                    };
                    true
                }
                None => false,
            });
            if !matches!(undo, Undo::Nothing) {
                self.inner.events.emit(state.changed_event());
            }
            (
                Ticket {
                    op: "delete",
                    id,
                    seq,
                    epoch,
                },
                undo,
            )
        };

        let result = self.inner.api.delete_note(server_id).await;
        self.resolve(ticket, undo, result, |_, _| false, |_| None)
    }

    // =========================================================================
    // Supplementary reads
    // =========================================================================

    /// Fetch one note and merge it: replaced in place, or inserted at the
    /// front if not loaded. A note the server no longer has is dropped
    /// locally and reported as `NotFound`.
    #[instrument(skip(self), fields(component = "notes", op = "reload", note_id = %id))]
    pub async fn reload_note(&self, id: NoteId) -> Result<Note> {
        let epoch = self.require_session("reload")?;
        let server_id = Self::server_id("reload", id)?;
        let seq = {
            let mut state = self.lock();
            let current = position(&state.notes, id).map(|idx| state.notes[idx].clone());
            state.seq.issue(id, current.as_ref())
        };

        let result = self.inner.api.get_note(server_id).await;

        let current = {
            let mut state = self.lock();
            let session_current = self.inner.session.is_current(epoch);
            let current = session_current && state.seq.is_latest(id, seq);
            let follows = session_current
                && result
                    .as_ref()
                    .is_ok_and(|note| state.seq.confirm(id, note));
            if session_current {
                state.seq.settle(id);
            }
            if current || follows {
                let changed = match &result {
                    Ok(note) if !current => {
                        state.edit(|notes| commit_updated(notes, note.clone()))
                    }
                    Ok(note) => state.edit(|notes| {
                        if !commit_updated(notes, note.clone()) {
                            notes.insert(0, note.clone());
                        }
                        true
                    }),
                    Err(Error::ServerRejected { status: 404, .. }) => state.edit(|notes| {
                        match position(notes, id) {
                            Some(idx) => {
                                notes.remove(idx);
                                true
                            }
                            None => false,
                        }
                    }),
                    Err(_) => false,
                };
                if changed {
                    self.inner.events.emit(state.changed_event());
                }
            }
            current
        };
        if !current {
            debug!(seq, "Reload resolved after a newer change; discarded");
        }

        match result {
            Ok(note) => Ok(note),
            Err(Error::ServerRejected { status: 404, .. }) => {
                Err(Error::NotFound(format!("note {} no longer exists", id)))
            }
            Err(e) => Err(self.fail("reload", epoch, e)),
        }
    }

    /// Server-side search. The local collection is not touched.
    #[instrument(skip(self), fields(component = "notes", op = "search_remote"))]
    pub async fn search_remote(&self, query: &str) -> Result<Vec<Note>> {
        let epoch = self.require_session("search")?;
        match self.inner.api.search_notes(query.trim()).await {
            Ok(notes) => {
                debug!(query, result_count = notes.len(), "Remote search finished");
                Ok(notes)
            }
            Err(e) => Err(self.fail("search", epoch, e)),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Lock the state, first clearing it if the session changed since the
    /// collection was filled.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        let epoch = self.inner.session.epoch();
        if state.epoch != epoch {
            state.epoch = epoch;
            state.applied_load = self.inner.load_seq.load(Ordering::Acquire);
            state.seq.clear();
            if !state.notes.is_empty() {
                state.notes = Arc::from(Vec::new());
                state.revision += 1;
                debug!(
                    component = "notes",
                    session_epoch = epoch,
                    "Session changed; cleared notes"
                );
                self.inner.events.emit(state.changed_event());
            }
        }
        state
    }

    fn require_session(&self, op: &str) -> Result<u64> {
        if !self.inner.session.is_authenticated() || self.inner.session.is_torn_down() {
            return Err(Error::PreconditionFailed(format!(
                "{} requires an authenticated session",
                op
            )));
        }
        let epoch = self.inner.session.epoch();
        drop(self.lock());
        Ok(epoch)
    }

    fn server_id(op: &str, id: NoteId) -> Result<i64> {
        id.server_id().ok_or_else(|| {
            Error::PreconditionFailed(format!(
                "cannot {} note {} while it is still being created",
                op, id
            ))
        })
    }

    /// Settle a mutation. A current success commits and a current failure
    /// reverts to the note's last server-confirmed state. A stale success
    /// only records that state; the collection follows it if it already
    /// shows the reverted base. A stale failure is dropped.
    fn resolve<T>(
        &self,
        ticket: Ticket,
        undo: Undo,
        result: Result<T>,
        commit: impl FnOnce(&mut Vec<Note>, &T) -> bool,
        confirmed: impl FnOnce(&T) -> Option<Note>,
    ) -> Result<T> {
        let session_current = self.inner.session.is_current(ticket.epoch);
        {
            let mut state = self.lock();
            let latest = state.seq.is_latest(ticket.id, ticket.seq);

            let changed = if !session_current {
                debug!(
                    op = ticket.op,
                    note_id = %ticket.id,
                    seq = ticket.seq,
                    "Response arrived after the session changed; discarded"
                );
                false
            } else {
                match &result {
                    Ok(value) => {
                        let canonical = confirmed(value);
                        let follows = canonical
                            .as_ref()
                            .is_some_and(|note| state.seq.confirm(ticket.id, note));
                        if latest {
                            state.edit(|notes| commit(notes, value))
                        } else if follows {
                            debug!(
                                op = ticket.op,
                                note_id = %ticket.id,
                                seq = ticket.seq,
                                "Older success applied over reverted note"
                            );
                            match canonical {
                                Some(note) => state.edit(|notes| commit_updated(notes, note)),
                                None => false,
                            }
                        } else {
                            debug!(
                                op = ticket.op,
                                note_id = %ticket.id,
                                seq = ticket.seq,
                                "Older success superseded; not committed"
                            );
                            false
                        }
                    }
                    Err(e) if latest => {
                        let undo = state.seq.revert_to_base(ticket.id, undo);
                        let reverted = state.edit(|notes| undo.revert(notes));
                        debug!(
                            op = ticket.op,
                            note_id = %ticket.id,
                            error_kind = %e.kind(),
                            reverted,
                            "Rolled back to last confirmed state"
                        );
                        reverted
                    }
                    Err(_) => {
                        debug!(
                            op = ticket.op,
                            note_id = %ticket.id,
                            seq = ticket.seq,
                            "Older failure superseded; not rolled back"
                        );
                        false
                    }
                }
            };
            // Entries of an ended session were cleared with it.
            if session_current {
                state.seq.settle(ticket.id);
            }
            if changed {
                self.inner.events.emit(state.changed_event());
            }
        }

        match result {
            Ok(value) => Ok(value),
            Err(e) => Err(self.fail(ticket.op, ticket.epoch, e)),
        }
    }

    /// Common failure path: an `Unauthorized` in the live session forces a
    /// logout, and every failure is published.
    fn fail(&self, op: &'static str, epoch: u64, e: Error) -> Error {
        if e.is_unauthorized() && self.inner.session.is_current(epoch) {
            self.inner.session.force_logout(op);
            drop(self.lock());
        }
        warn!(
            component = "notes",
            op,
            error_kind = %e.kind(),
            error = %e,
            "Note operation failed"
        );
        self.inner
            .events
            .emit(ClientEvent::OperationFailed { op, kind: e.kind() });
        e
    }
}

impl std::fmt::Debug for NoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("NoteStore")
            .field("count", &state.notes.len())
            .field("revision", &state.revision)
            .finish()
    }
}
