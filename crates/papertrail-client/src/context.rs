//! The client context: one owned value bundling everything a front end
//! needs.

use std::sync::Arc;

use papertrail_core::{CredentialStore, EventBus, EventEnvelope, NotesApi, Result};
use papertrail_http::{ClientConfig, HttpTransport};
use tokio::sync::broadcast;
use tracing::info;

use crate::credentials::store_for_config;
use crate::notes::NoteStore;
use crate::session::SessionManager;
use crate::view::NoteView;

/// Transport, session manager, note store and event bus, wired together.
///
/// Construction does no I/O. Call [`SessionManager::restore`] once before
/// anything else, and [`PaperTrail::teardown`] when done.
pub struct PaperTrail {
    api: Arc<dyn NotesApi>,
    credentials: Arc<dyn CredentialStore>,
    events: EventBus,
    session: SessionManager,
    notes: NoteStore,
}

impl PaperTrail {
    /// HTTP transport and file credential store from `config`.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let credentials = store_for_config(&config)?;
        let transport = HttpTransport::new(config, credentials.clone())?;
        Ok(Self::with_api(Arc::new(transport), credentials))
    }

    /// Configuration from `PAPERTRAIL_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    /// Wire an arbitrary API implementation.
    pub fn with_api(api: Arc<dyn NotesApi>, credentials: Arc<dyn CredentialStore>) -> Self {
        let events = EventBus::default();
        let session = SessionManager::new(api.clone(), credentials.clone(), events.clone());
        let notes = NoteStore::new(api.clone(), session.clone(), events.clone());
        info!(
            component = "context",
            auth_mode = %api.auth_mode(),
            "Client context created"
        );
        Self {
            api,
            credentials,
            events,
            session,
            notes,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn notes(&self) -> &NoteStore {
        &self.notes
    }

    pub fn api(&self) -> &Arc<dyn NotesApi> {
        &self.api
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    /// A memoized view over this context's notes.
    pub fn view(&self) -> NoteView {
        NoteView::new(self.notes.clone())
    }

    /// Stop accepting late completions. Idempotent.
    pub fn teardown(&self) {
        self.session.teardown();
    }
}

impl Drop for PaperTrail {
    fn drop(&mut self) {
        self.session.teardown();
    }
}
