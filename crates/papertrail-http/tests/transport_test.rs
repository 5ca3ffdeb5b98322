//! HTTP-level tests for the transport against a wiremock server.
//!
//! These verify the wire contract: routes, credential propagation, body
//! shapes and the mapping of failures onto error kinds.

use std::sync::Arc;

use papertrail_core::{
    AuthMode, CredentialStore, Credentials, DeleteOutcome, ErrorKind, MemoryCredentialStore,
    NoteDraft, NoteId, NotesApi,
};
use papertrail_http::{ApiRoutes, ClientConfig, HttpTransport};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport_for(server: &MockServer, creds: Arc<MemoryCredentialStore>) -> HttpTransport {
    let config = ClientConfig {
        base_url: server.uri(),
        timeout_seconds: 5,
        ..Default::default()
    };
    HttpTransport::new(config, creds).expect("Failed to create transport")
}

fn note_json(id: i64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "content": "body",
        "category": "Work",
        "tags": ["a"],
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn test_bearer_token_sent_on_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([note_json(1, "A"), note_json(2, "B")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let creds = Arc::new(MemoryCredentialStore::with_token("tok-1"));
    let transport = transport_for(&server, creds);

    let notes = transport.list_notes().await.unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].id, NoteId::Server(1));
    assert_eq!(notes[1].title, "B");
}

#[tokio::test]
async fn test_login_posts_credentials_and_returns_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({"username": "alice", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-alice",
            "token_type": "bearer",
            "user": {"id": 1, "username": "alice"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport_for(&server, Arc::new(MemoryCredentialStore::new()));
    let grant = transport
        .login(&Credentials::new("alice", "pw"))
        .await
        .unwrap();

    assert_eq!(grant.token.as_deref(), Some("tok-alice"));
    assert_eq!(grant.user.username, "alice");
    assert_eq!(grant.user.id, Some(1));
}

#[tokio::test]
async fn test_login_without_user_fetches_identity_with_new_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "token_type": "bearer"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice"})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport_for(&server, Arc::new(MemoryCredentialStore::new()));
    let grant = transport
        .login(&Credentials::new("alice", "pw"))
        .await
        .unwrap();
    assert_eq!(grant.user.username, "alice");
}

#[tokio::test]
async fn test_login_401_maps_to_unauthorized_with_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let transport = transport_for(&server, Arc::new(MemoryCredentialStore::new()));
    let err = transport
        .login(&Credentials::new("alice", "bad"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(err.to_string().contains("Invalid credentials"));
}

#[tokio::test]
async fn test_me_401_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let creds = Arc::new(MemoryCredentialStore::with_token("expired"));
    let transport = transport_for(&server, creds);
    assert!(transport.me().await.unwrap_err().is_unauthorized());
}

#[tokio::test]
async fn test_register_duplicate_is_server_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Username already registered"})),
        )
        .mount(&server)
        .await;

    let transport = transport_for(&server, Arc::new(MemoryCredentialStore::new()));
    let err = transport
        .register(&Credentials::new("alice", "pw"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        papertrail_core::Error::rejected(400, "Username already registered")
    );
}

#[tokio::test]
async fn test_create_sends_draft_and_parses_naive_timestamp() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notes"))
        .and(body_json(json!({
            "title": "First",
            "content": "Hello",
            "category": "Ideas",
            "tags": ["x", "y"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "title": "First",
            "content": "Hello",
            "category": "Ideas",
            "tags": ["x", "y"],
            "created_at": "2026-01-01T12:00:00.000001"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport_for(&server, Arc::new(MemoryCredentialStore::with_token("t")));
    let draft = NoteDraft::new("First", "Hello")
        .with_category("Ideas")
        .with_tags(["x", "y"]);
    let note = transport.create_note(&draft).await.unwrap();
    assert_eq!(note.id, NoteId::Server(1));
    assert_eq!(note.updated_at, note.created_at);
    assert_eq!(note.tags, vec!["x", "y"]);
}

#[tokio::test]
async fn test_update_uses_put_on_note_path() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/notes/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(note_json(7, "Renamed")))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport_for(&server, Arc::new(MemoryCredentialStore::with_token("t")));
    let note = transport
        .update_note(7, &NoteDraft::new("Renamed", "body"))
        .await
        .unwrap();
    assert_eq!(note.title, "Renamed");
}

#[tokio::test]
async fn test_delete_404_is_already_gone() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/notes/9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Note not found"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/notes/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let transport = transport_for(&server, Arc::new(MemoryCredentialStore::with_token("t")));
    assert_eq!(
        transport.delete_note(9).await.unwrap(),
        DeleteOutcome::AlreadyGone
    );
    assert_eq!(transport.delete_note(3).await.unwrap(), DeleteOutcome::Deleted);
}

#[tokio::test]
async fn test_server_error_is_rejected_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let transport = transport_for(&server, Arc::new(MemoryCredentialStore::with_token("t")));
    match transport.list_notes().await.unwrap_err() {
        papertrail_core::Error::ServerRejected { status, .. } => assert_eq!(status, 503),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let transport = transport_for(&server, Arc::new(MemoryCredentialStore::with_token("t")));
    assert_eq!(
        transport.list_notes().await.unwrap_err().kind(),
        ErrorKind::InvalidResponse
    );
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let config = ClientConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        timeout_seconds: 2,
        ..Default::default()
    };
    let transport = HttpTransport::new(config, Arc::new(MemoryCredentialStore::new())).unwrap();
    assert_eq!(
        transport.me().await.unwrap_err().kind(),
        ErrorKind::NetworkUnreachable
    );
}

#[tokio::test]
async fn test_api_prefix_and_search_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/notes/search"))
        .and(query_param("q", "meeting notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([note_json(4, "Meeting")])))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        base_url: server.uri(),
        api_prefix: "/api".to_string(),
        ..Default::default()
    };
    let transport =
        HttpTransport::new(config, Arc::new(MemoryCredentialStore::with_token("t"))).unwrap();
    let hits = transport.search_notes("meeting notes").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Meeting");
}

#[tokio::test]
async fn test_namespaced_auth_routes_behind_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-9",
            "user": {"id": 9, "username": "alice"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/notes"))
        .and(header("authorization", "Bearer tok-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        base_url: server.uri(),
        api_prefix: "/api".to_string(),
        routes: ApiRoutes::for_style("namespaced").unwrap(),
        ..Default::default()
    };
    let creds = Arc::new(MemoryCredentialStore::new());
    let transport = HttpTransport::new(config, creds.clone()).unwrap();

    let grant = transport
        .login(&Credentials::new("alice", "pw"))
        .await
        .unwrap();
    assert_eq!(grant.token.as_deref(), Some("tok-9"));
    creds.set("tok-9").unwrap();
    assert!(transport.list_notes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cookie_mode_replays_session_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=abc123; Path=/; HttpOnly")
                .set_body_json(json!({"user": {"username": "alice"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("cookie", "session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice"})))
        .expect(1)
        .mount(&server)
        .await;

    let creds = Arc::new(MemoryCredentialStore::new());
    let config = ClientConfig {
        base_url: server.uri(),
        auth_mode: AuthMode::Cookie,
        ..Default::default()
    };
    let transport = HttpTransport::new(config, creds.clone()).unwrap();

    let grant = transport
        .login(&Credentials::new("alice", "pw"))
        .await
        .unwrap();
    assert!(grant.token.is_none());
    assert_eq!(transport.me().await.unwrap().username, "alice");
    assert_eq!(creds.get().unwrap(), None);
}
