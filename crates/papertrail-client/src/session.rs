//! Session manager: the single source of "who is logged in".
//!
//! State machine:
//!
//! ```text
//! Initializing --restore()--> Authenticated | Anonymous
//! Anonymous    --login()----> Authenticated
//! Authenticated --logout() / force_logout()--> Anonymous
//! ```
//!
//! Every transition into or out of `Authenticated` advances the session
//! epoch. Work issued under an older epoch is discarded on completion.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use papertrail_core::{
    AuthMode, ClientEvent, CredentialStore, Credentials, Error, EventBus, NotesApi, Result,
    Session, SessionState, User,
};
use tracing::{debug, info, instrument, warn};

/// Owns the authentication state. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: Arc<dyn NotesApi>,
    credentials: Arc<dyn CredentialStore>,
    events: EventBus,
    state: Mutex<Session>,
    epoch: AtomicU64,
    restore_started: AtomicBool,
    login_in_flight: AtomicBool,
    torn_down: AtomicBool,
}

/// Clears an in-flight flag when the owning call finishes, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::AcqRel)).then(|| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionManager {
    pub fn new(
        api: Arc<dyn NotesApi>,
        credentials: Arc<dyn CredentialStore>,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                api,
                credentials,
                events,
                state: Mutex::new(Session::initializing()),
                epoch: AtomicU64::new(0),
                restore_started: AtomicBool::new(false),
                login_in_flight: AtomicBool::new(false),
                torn_down: AtomicBool::new(false),
            }),
        }
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// Copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state()
    }

    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::Acquire)
    }

    /// True while work issued at `epoch` may still change client state.
    pub fn is_current(&self, epoch: u64) -> bool {
        !self.is_torn_down() && self.epoch() == epoch
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::Acquire)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Startup check of a persisted session. Runs once per manager.
    ///
    /// In bearer mode the server is only asked when a token is stored; in
    /// cookie mode it is always asked. Any failure ends anonymous with the
    /// stored credential cleared. Never fails because of the server's
    /// answer; errors are returned only for misuse.
    #[instrument(skip(self), fields(component = "session", op = "restore"))]
    pub async fn restore(&self) -> Result<SessionState> {
        self.ensure_live()?;
        if self.inner.restore_started.swap(true, Ordering::AcqRel) {
            return Err(Error::PreconditionFailed(
                "session restore already ran".to_string(),
            ));
        }
        let epoch = self.epoch();

        let should_check = match self.inner.api.auth_mode() {
            AuthMode::Cookie => true,
            AuthMode::Bearer => match self.inner.credentials.get() {
                Ok(token) => token.is_some(),
                Err(e) => {
                    warn!(error = %e, "Could not read stored credential; starting anonymous");
                    false
                }
            },
        };

        let user = if should_check {
            match self.inner.api.me().await {
                Ok(user) => Some(user),
                Err(e) => {
                    info!(
                        error_kind = %e.kind(),
                        error = %e,
                        "Stored session not accepted; starting anonymous"
                    );
                    self.clear_credential();
                    None
                }
            }
        } else {
            None
        };

        if self.is_torn_down() {
            debug!("Restore completed after teardown; result discarded");
            return Ok(self.state());
        }
        // A logout issued while the check was in flight wins.
        let user = if self.epoch() == epoch { user } else { None };

        let state = {
            let mut session = self.lock();
            session.loading = false;
            session.user = user;
            session.state()
        };
        if state == SessionState::Authenticated {
            self.advance_epoch();
        }

        let username = self.user().map(|u| u.username);
        info!(
            session_state = %state,
            username = username.as_deref().unwrap_or(""),
            "Session restored"
        );
        self.emit_session(state, username);
        Ok(state)
    }

    /// Authenticate. Allowed only while anonymous.
    #[instrument(skip(self, credentials), fields(component = "session", op = "login"))]
    pub async fn login(&self, credentials: Credentials) -> Result<User> {
        let credentials = credentials.validated()?;
        self.ensure_live()?;

        let state = self.state();
        if state != SessionState::Anonymous {
            return Err(Error::PreconditionFailed(format!(
                "login requires an anonymous session (currently {})",
                state
            )));
        }
        let _guard = InFlight::acquire(&self.inner.login_in_flight).ok_or_else(|| {
            Error::PreconditionFailed("a login is already in progress".to_string())
        })?;

        let started = self.epoch();
        let grant = match self.inner.api.login(&credentials).await {
            Ok(grant) => grant,
            Err(e) => {
                info!(
                    username = %credentials.username,
                    error_kind = %e.kind(),
                    error = %e,
                    "Login failed"
                );
                self.emit_failure("login", &e);
                return Err(e);
            }
        };

        // Checked and committed under the session lock; a logout lands
        // wholly before or after.
        let user = grant.user;
        let epoch = {
            let mut session = self.lock();
            if self.is_torn_down() || self.epoch() != started {
                drop(session);
                debug!(
                    started,
                    session_epoch = self.epoch(),
                    "Login completed after the session changed; grant discarded"
                );
                return Err(Error::PreconditionFailed(
                    "session changed during login".to_string(),
                ));
            }

            match (&grant.token, self.inner.api.auth_mode()) {
                (Some(token), _) => self.inner.credentials.set(token)?,
                (None, AuthMode::Bearer) => {
                    warn!("Server issued no token in bearer mode; requests will be unauthenticated")
                }
                (None, AuthMode::Cookie) => {}
            }

            session.loading = false;
            session.user = Some(user.clone());
            self.advance_epoch()
        };

        info!(username = %user.username, session_epoch = epoch, "Logged in");
        self.emit_session(SessionState::Authenticated, Some(user.username.clone()));
        Ok(user)
    }

    /// Create an account. Does not sign in.
    #[instrument(skip(self, credentials), fields(component = "session", op = "register"))]
    pub async fn register(&self, credentials: Credentials) -> Result<()> {
        let credentials = credentials.validated()?;
        self.ensure_live()?;

        match self.inner.api.register(&credentials).await {
            Ok(()) => {
                info!(username = %credentials.username, "Registered account");
                Ok(())
            }
            Err(e) => {
                info!(
                    username = %credentials.username,
                    error_kind = %e.kind(),
                    error = %e,
                    "Registration failed"
                );
                self.emit_failure("register", &e);
                Err(e)
            }
        }
    }

    /// End the session. The server call is best-effort; local state is
    /// cleared whatever it returns.
    #[instrument(skip(self), fields(component = "session", op = "logout"))]
    pub async fn logout(&self) -> Result<()> {
        self.ensure_live()?;

        if let Err(e) = self.inner.api.logout().await {
            warn!(error_kind = %e.kind(), error = %e, "Logout request failed; clearing local session anyway");
        }
        if self.is_torn_down() {
            return Ok(());
        }

        self.end_session();
        self.clear_credential();
        info!(session_epoch = self.epoch(), "Logged out");
        Ok(())
    }

    /// Invalid-session path: drop identity and credential without asking
    /// the server. Called when any request answers 401.
    pub fn force_logout(&self, reason: &str) {
        if self.is_torn_down() {
            return;
        }
        let was_authenticated = self.is_authenticated();
        self.end_session();
        self.clear_credential();
        if was_authenticated {
            warn!(
                component = "session",
                op = "force_logout",
                reason,
                session_epoch = self.epoch(),
                "Session rejected by server; logged out"
            );
        }
    }

    /// Stop accepting completions. Idempotent.
    pub fn teardown(&self) {
        if !self.inner.torn_down.swap(true, Ordering::AcqRel) {
            self.advance_epoch();
            debug!(component = "session", op = "teardown", "Session manager torn down");
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_torn_down() {
            return Err(Error::PreconditionFailed(
                "session manager has been torn down".to_string(),
            ));
        }
        Ok(())
    }

    fn advance_epoch(&self) -> u64 {
        self.inner.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    // Anonymous from here on. Restoration, if pending, still owns `loading`.
    fn end_session(&self) {
        let state = {
            let mut session = self.lock();
            session.user = None;
            self.advance_epoch();
            session.state()
        };
        self.emit_session(state, None);
    }

    fn clear_credential(&self) {
        if let Err(e) = self.inner.credentials.clear() {
            warn!(error = %e, "Failed to clear stored credential");
        }
    }

    fn emit_session(&self, state: SessionState, username: Option<String>) {
        self.inner
            .events
            .emit(ClientEvent::SessionChanged { state, username });
    }

    fn emit_failure(&self, op: &'static str, e: &Error) {
        self.inner
            .events
            .emit(ClientEvent::OperationFailed { op, kind: e.kind() });
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .field("epoch", &self.epoch())
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}
