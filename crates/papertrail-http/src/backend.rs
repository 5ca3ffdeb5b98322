//! reqwest-backed implementation of [`NotesApi`].

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use papertrail_core::{
    AuthGrant, AuthMode, CredentialStore, Credentials, DeleteOutcome, Error, Note, NoteDraft,
    NotesApi, Result, User,
};

use crate::config::ClientConfig;
use crate::error::{error_from_response, error_from_transport};
use crate::types::{CredentialsBody, LoginResponse, NoteRecord};

/// HTTP transport for the Paper Trail API.
///
/// One instance per process. In bearer mode the token is read from the
/// credential store on every request; in cookie mode the client keeps a
/// cookie jar and never sends an `Authorization` header.
pub struct HttpTransport {
    client: Client,
    config: ClientConfig,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpTransport {
    /// Create a transport with the given configuration and credential store.
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_seconds));
        if config.auth_mode == AuthMode::Cookie {
            builder = builder.cookie_store(true);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            component = "transport",
            base_url = %config.base_url,
            auth_mode = %config.auth_mode,
            timeout_seconds = config.timeout_seconds,
            "Initializing HTTP transport"
        );

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    /// Get the current configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a request, attaching the bearer token when in bearer mode.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let req = self.client.request(method, self.config.url(path));
        match self.config.auth_mode {
            AuthMode::Bearer => match self.credentials.get()? {
                Some(token) => Ok(req.bearer_auth(token)),
                None => Ok(req),
            },
            AuthMode::Cookie => Ok(req),
        }
    }

    /// Send and turn non-success statuses into errors.
    async fn send(&self, op: &'static str, path: &str, req: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let response = req.send().await.map_err(|e| {
            debug!(
                component = "transport",
                op,
                path,
                error = %e,
                "Request failed before a response arrived"
            );
            error_from_transport(e)
        })?;

        let status = response.status();
        trace!(
            component = "transport",
            op,
            path,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Response received"
        );

        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = error_from_response(status, &body);
        debug!(
            component = "transport",
            op,
            path,
            status = status.as_u16(),
            error = %err,
            "Request rejected"
        );
        Err(err)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response.bytes().await.map_err(error_from_transport)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    async fn decode_notes(response: Response) -> Result<Vec<Note>> {
        let records: Vec<NoteRecord> = Self::decode(response).await?;
        Ok(records.into_iter().map(Note::from).collect())
    }

    /// `GET /me` with an explicit token, used when login returns a token
    /// but no identity.
    async fn me_with_token(&self, token: &str) -> Result<User> {
        let path = self.config.routes.me.clone();
        let req = self
            .client
            .get(self.config.url(&path))
            .bearer_auth(token);
        let response = self.send("me", &path, req).await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl NotesApi for HttpTransport {
    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant> {
        let path = self.config.routes.login.clone();
        let body = CredentialsBody {
            username: &credentials.username,
            password: &credentials.password,
        };
        let req = self.request(Method::POST, &path)?.json(&body);
        let response = self.send("login", &path, req).await?;
        let login: LoginResponse = Self::decode(response).await?;

        let user = match (login.user.clone(), login.access_token.as_deref()) {
            (Some(user), _) => user,
            (None, Some(token)) if !token.is_empty() => self.me_with_token(token).await?,
            (None, _) => self.me().await?,
        };
        Ok(login.into_grant(user))
    }

    async fn register(&self, credentials: &Credentials) -> Result<()> {
        let path = self.config.routes.register.clone();
        let body = CredentialsBody {
            username: &credentials.username,
            password: &credentials.password,
        };
        let req = self.request(Method::POST, &path)?.json(&body);
        self.send("register", &path, req).await?;
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        let path = self.config.routes.logout.clone();
        let req = self.request(Method::POST, &path)?;
        self.send("logout", &path, req).await?;
        Ok(())
    }

    async fn me(&self) -> Result<User> {
        let path = self.config.routes.me.clone();
        let req = self.request(Method::GET, &path)?;
        let response = self.send("me", &path, req).await?;
        Self::decode(response).await
    }

    async fn list_notes(&self) -> Result<Vec<Note>> {
        let path = self.config.routes.notes.clone();
        let req = self.request(Method::GET, &path)?;
        let response = self.send("list_notes", &path, req).await?;
        let notes = Self::decode_notes(response).await?;
        debug!(
            component = "transport",
            op = "list_notes",
            result_count = notes.len(),
            "Fetched notes"
        );
        Ok(notes)
    }

    async fn get_note(&self, id: i64) -> Result<Note> {
        let path = self.config.routes.note(id);
        let req = self.request(Method::GET, &path)?;
        let response = self.send("get_note", &path, req).await?;
        let record: NoteRecord = Self::decode(response).await?;
        Ok(record.into())
    }

    async fn search_notes(&self, query: &str) -> Result<Vec<Note>> {
        let path = self.config.routes.search();
        let req = self.request(Method::GET, &path)?.query(&[("q", query)]);
        let response = self.send("search_notes", &path, req).await?;
        Self::decode_notes(response).await
    }

    async fn create_note(&self, draft: &NoteDraft) -> Result<Note> {
        let path = self.config.routes.notes.clone();
        let req = self.request(Method::POST, &path)?.json(draft);
        let response = self.send("create_note", &path, req).await?;
        let record: NoteRecord = Self::decode(response).await?;
        Ok(record.into())
    }

    async fn update_note(&self, id: i64, draft: &NoteDraft) -> Result<Note> {
        let path = self.config.routes.note(id);
        let req = self.request(Method::PUT, &path)?.json(draft);
        let response = self.send("update_note", &path, req).await?;
        let record: NoteRecord = Self::decode(response).await?;
        Ok(record.into())
    }

    async fn delete_note(&self, id: i64) -> Result<DeleteOutcome> {
        let path = self.config.routes.note(id);
        let req = self.request(Method::DELETE, &path)?;
        match self.send("delete_note", &path, req).await {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(Error::ServerRejected { status, .. })
                if status == StatusCode::NOT_FOUND.as_u16() =>
            {
                debug!(
                    component = "transport",
                    op = "delete_note",
                    note_id = id,
                    "Note already gone on server"
                );
                Ok(DeleteOutcome::AlreadyGone)
            }
            Err(e) => Err(e),
        }
    }

    fn auth_mode(&self) -> AuthMode {
        self.config.auth_mode
    }
}
