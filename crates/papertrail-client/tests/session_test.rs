//! Session lifecycle tests against the in-memory API.

use std::sync::Arc;

use papertrail_client::SessionManager;
use papertrail_core::mock::{MockApi, MockOp};
use papertrail_core::{
    ClientEvent, CredentialStore, Credentials, Error, ErrorKind, EventBus,
    MemoryCredentialStore, SessionState,
};

fn manager(api: &MockApi, creds: &Arc<MemoryCredentialStore>) -> SessionManager {
    SessionManager::new(Arc::new(api.clone()), creds.clone(), EventBus::default())
}

async fn wait_for_call(api: &MockApi, op: MockOp, count: usize) {
    for _ in 0..100 {
        if api.call_count(op) >= count {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("{:?} was not called {} time(s)", op, count);
}

// =============================================================================
// restore
// =============================================================================

#[tokio::test]
async fn test_restore_without_token_is_anonymous_without_network() {
    let api = MockApi::new();
    let creds = Arc::new(MemoryCredentialStore::new());
    let session = manager(&api, &creds);

    assert_eq!(session.restore().await.unwrap(), SessionState::Anonymous);
    assert!(!session.is_loading());
    assert!(session.user().is_none());
    assert_eq!(api.call_count(MockOp::Me), 0);
}

#[tokio::test]
async fn test_restore_with_valid_token_authenticates() {
    let api = MockApi::new().with_user("alice", "pw").with_session("alice");
    let creds = Arc::new(MemoryCredentialStore::with_token("token-alice-1"));
    let session = manager(&api, &creds);
    let epoch = session.epoch();

    assert_eq!(session.restore().await.unwrap(), SessionState::Authenticated);
    assert_eq!(session.user().unwrap().username, "alice");
    assert!(!session.is_loading());
    assert!(session.epoch() > epoch);
    assert_eq!(creds.get().unwrap().as_deref(), Some("token-alice-1"));
}

#[tokio::test]
async fn test_restore_with_invalid_token_clears_it() {
    let api = MockApi::new().with_user("alice", "pw");
    let creds = Arc::new(MemoryCredentialStore::with_token("expired"));
    let session = manager(&api, &creds);

    assert_eq!(session.restore().await.unwrap(), SessionState::Anonymous);
    assert!(!session.is_loading());
    assert!(!session.is_authenticated());
    assert_eq!(creds.get().unwrap(), None);
}

#[tokio::test]
async fn test_restore_with_unreachable_server_is_anonymous() {
    let api = MockApi::new().with_session("alice");
    api.fail_next(
        MockOp::Me,
        Error::NetworkUnreachable("connection refused".into()),
    );
    let creds = Arc::new(MemoryCredentialStore::with_token("tok"));
    let session = manager(&api, &creds);

    assert_eq!(session.restore().await.unwrap(), SessionState::Anonymous);
    assert_eq!(creds.get().unwrap(), None);
}

#[tokio::test]
async fn test_restore_runs_once() {
    let api = MockApi::new();
    let session = manager(&api, &Arc::new(MemoryCredentialStore::new()));
    session.restore().await.unwrap();
    let err = session.restore().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
}

#[tokio::test]
async fn test_cookie_mode_restore_always_asks_server() {
    let api = MockApi::new().cookie_mode().with_session("bob");
    let session = manager(&api, &Arc::new(MemoryCredentialStore::new()));

    assert_eq!(session.restore().await.unwrap(), SessionState::Authenticated);
    assert_eq!(api.call_count(MockOp::Me), 1);
    assert_eq!(session.user().unwrap().username, "bob");
}

#[tokio::test]
async fn test_teardown_during_restore_discards_result() {
    let api = MockApi::new().with_session("alice");
    let creds = Arc::new(MemoryCredentialStore::with_token("tok"));
    let session = manager(&api, &creds);
    let gate = api.hold(MockOp::Me);

    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.restore().await })
    };
    wait_for_call(&api, MockOp::Me, 1).await;

    session.teardown();
    gate.release();
    task.await.unwrap().unwrap();

    assert_eq!(session.state(), SessionState::Initializing);
    assert!(session.is_loading());
    assert!(session.user().is_none());
}

#[tokio::test]
async fn test_logout_during_restore_wins() {
    let api = MockApi::new().with_session("alice");
    let creds = Arc::new(MemoryCredentialStore::with_token("tok"));
    let session = manager(&api, &creds);
    let gate = api.hold(MockOp::Me);

    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.restore().await })
    };
    wait_for_call(&api, MockOp::Me, 1).await;

    session.logout().await.unwrap();
    gate.release();

    assert_eq!(task.await.unwrap().unwrap(), SessionState::Anonymous);
    assert!(session.user().is_none());
    assert_eq!(creds.get().unwrap(), None);
}

// =============================================================================
// login / logout / register
// =============================================================================

async fn anonymous(api: &MockApi, creds: &Arc<MemoryCredentialStore>) -> SessionManager {
    let session = manager(api, creds);
    session.restore().await.unwrap();
    session
}

#[tokio::test]
async fn test_login_stores_token_and_authenticates() {
    let api = MockApi::new().with_user("alice", "pw");
    let creds = Arc::new(MemoryCredentialStore::new());
    let session = anonymous(&api, &creds).await;
    let epoch = session.epoch();

    let user = session
        .login(Credentials::new("  alice ", "pw"))
        .await
        .unwrap();

    assert_eq!(user.username, "alice");
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(creds.get().unwrap().as_deref(), Some("token-alice-1"));
    assert!(session.epoch() > epoch);
}

#[tokio::test]
async fn test_login_validation_happens_before_network() {
    let api = MockApi::new().with_user("alice", "pw");
    let creds = Arc::new(MemoryCredentialStore::new());
    let session = anonymous(&api, &creds).await;

    for (user, pass) in [("", "pw"), ("   ", "pw"), ("alice", ""), ("alice", "  ")] {
        let err = session
            .login(Credentials::new(user, pass))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    }
    assert_eq!(api.call_count(MockOp::Login), 0);
}

#[tokio::test]
async fn test_failed_login_leaves_state_unchanged() {
    let api = MockApi::new().with_user("alice", "pw");
    let creds = Arc::new(MemoryCredentialStore::new());
    let session = anonymous(&api, &creds).await;
    let before = session.snapshot();

    let err = session
        .login(Credentials::new("alice", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        Error::Unauthorized("Incorrect username or password".into())
    );
    assert_eq!(session.snapshot(), before);
    assert_eq!(creds.get().unwrap(), None);
    assert_eq!(api.call_count(MockOp::Login), 1);
}

#[tokio::test]
async fn test_login_only_from_anonymous() {
    let api = MockApi::new().with_user("alice", "pw");
    let creds = Arc::new(MemoryCredentialStore::new());
    let session = anonymous(&api, &creds).await;
    session.login(Credentials::new("alice", "pw")).await.unwrap();

    let err = session
        .login(Credentials::new("alice", "pw"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert_eq!(api.call_count(MockOp::Login), 1);
}

#[tokio::test]
async fn test_login_completing_after_logout_is_discarded() {
    let api = MockApi::new().with_user("alice", "pw");
    let creds = Arc::new(MemoryCredentialStore::new());
    let session = anonymous(&api, &creds).await;
    let gate = api.hold(MockOp::Login);

    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.login(Credentials::new("alice", "pw")).await })
    };
    wait_for_call(&api, MockOp::Login, 1).await;

    session.logout().await.unwrap();
    gate.release();

    let err = task.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert_eq!(session.state(), SessionState::Anonymous);
    assert!(session.user().is_none());
    assert_eq!(creds.get().unwrap(), None);

    // A fresh login still works
    session.login(Credentials::new("alice", "pw")).await.unwrap();
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_cookie_mode_login_stores_nothing() {
    let api = MockApi::new().cookie_mode().with_user("alice", "pw");
    let creds = Arc::new(MemoryCredentialStore::new());
    let session = anonymous(&api, &creds).await;

    session.login(Credentials::new("alice", "pw")).await.unwrap();
    assert!(session.is_authenticated());
    assert_eq!(creds.get().unwrap(), None);
}

#[tokio::test]
async fn test_logout_clears_even_when_server_fails() {
    let api = MockApi::new().with_user("alice", "pw");
    let creds = Arc::new(MemoryCredentialStore::new());
    let session = anonymous(&api, &creds).await;
    session.login(Credentials::new("alice", "pw")).await.unwrap();

    api.fail_next(MockOp::Logout, Error::NetworkUnreachable("down".into()));
    session.logout().await.unwrap();

    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(creds.get().unwrap(), None);
}

#[tokio::test]
async fn test_force_logout_skips_server() {
    let api = MockApi::new().with_user("alice", "pw");
    let creds = Arc::new(MemoryCredentialStore::new());
    let session = anonymous(&api, &creds).await;
    session.login(Credentials::new("alice", "pw")).await.unwrap();

    session.force_logout("test");
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(creds.get().unwrap(), None);
    assert_eq!(api.call_count(MockOp::Logout), 0);
}

#[tokio::test]
async fn test_register_does_not_sign_in() {
    let api = MockApi::new().with_user("alice", "pw");
    let creds = Arc::new(MemoryCredentialStore::new());
    let session = anonymous(&api, &creds).await;

    session
        .register(Credentials::new("bob", "secret"))
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Anonymous);

    let err = session
        .register(Credentials::new("alice", "other"))
        .await
        .unwrap_err();
    assert_eq!(err, Error::rejected(400, "Username already registered"));

    session
        .login(Credentials::new("bob", "secret"))
        .await
        .unwrap();
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_session_events_published() {
    let api = MockApi::new().with_user("alice", "pw");
    let creds = Arc::new(MemoryCredentialStore::new());
    let events = EventBus::default();
    let mut rx = events.subscribe();
    let session = SessionManager::new(Arc::new(api.clone()), creds, events);

    session.restore().await.unwrap();
    session.login(Credentials::new("alice", "pw")).await.unwrap();
    session.logout().await.unwrap();

    let states: Vec<SessionState> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|env| match env.payload {
            ClientEvent::SessionChanged { state, .. } => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            SessionState::Anonymous,
            SessionState::Authenticated,
            SessionState::Anonymous
        ]
    );
}
