//! Core data models for the Paper Trail client.
//!
//! These types are shared by the transport, the session manager, the note
//! store and the query engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::defaults::PLACEHOLDER_PREFIX;
use crate::error::{Error, Result};

// =============================================================================
// NOTE IDENTITY
// =============================================================================

/// Identifier of a note in the local collection.
///
/// `Server` ids are assigned by the API and never change. `Local` ids tag
/// optimistic placeholders that exist only until the create call resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteId {
    Server(i64),
    Local(Uuid),
}

impl NoteId {
    /// Fresh placeholder id.
    pub fn local() -> Self {
        NoteId::Local(Uuid::new_v4())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, NoteId::Local(_))
    }

    /// Server-assigned id, if any.
    pub fn server_id(&self) -> Option<i64> {
        match self {
            NoteId::Server(id) => Some(*id),
            NoteId::Local(_) => None,
        }
    }
}

impl From<i64> for NoteId {
    fn from(id: i64) -> Self {
        NoteId::Server(id)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteId::Server(id) => write!(f, "{}", id),
            NoteId::Local(uuid) => write!(f, "{}{}", PLACEHOLDER_PREFIX, uuid),
        }
    }
}

impl FromStr for NoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix(PLACEHOLDER_PREFIX) {
            return Uuid::parse_str(rest)
                .map(NoteId::Local)
                .map_err(|e| Error::ValidationFailed(format!("invalid note id '{}': {}", s, e)));
        }
        s.parse::<i64>()
            .map(NoteId::Server)
            .map_err(|_| Error::ValidationFailed(format!("invalid note id '{}'", s)))
    }
}

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A single user-owned note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Build an optimistic placeholder for a draft that is being created.
    pub fn placeholder(draft: &NoteDraft) -> Self {
        let now = Utc::now();
        Self {
            id: NoteId::local(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            category: draft.category.clone(),
            tags: draft.tags.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.is_local()
    }

    /// Apply a patch in place. Does not touch `id` or timestamps; the server
    /// is authoritative for `updated_at`.
    pub fn apply_patch(&mut self, patch: &NotePatch) {
        if let Some(ref title) = patch.title {
            self.title = title.clone();
        }
        if let Some(ref content) = patch.content {
            self.content = content.clone();
        }
        if let Some(ref category) = patch.category {
            self.category = normalize_category(category.clone());
        }
        if let Some(ref tags) = patch.tags {
            self.tags = normalize_tags(tags.iter().cloned());
        }
    }

    /// Full request body describing this note's current fields.
    pub fn to_draft(&self) -> NoteDraft {
        NoteDraft {
            title: self.title.clone(),
            content: self.content.clone(),
            category: self.category.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Body of a create (and, merged with the current note, an update) request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category: None,
            tags: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Trim and validate. Title and content must be non-empty after
    /// trimming; category and tags are normalized.
    pub fn normalized(self) -> Result<Self> {
        let title = self.title.trim().to_string();
        let content = self.content.trim().to_string();
        if title.is_empty() {
            return Err(Error::ValidationFailed("title must not be empty".to_string()));
        }
        if content.is_empty() {
            return Err(Error::ValidationFailed(
                "content must not be empty".to_string(),
            ));
        }
        Ok(Self {
            title,
            content,
            category: normalize_category(self.category),
            tags: normalize_tags(self.tags),
        })
    }
}

/// Partial update of a note. `None` fields are left untouched;
/// `category: Some(None)` clears the category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

impl NotePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(Some(category.into()));
        self
    }

    pub fn clear_category(mut self) -> Self {
        self.category = Some(None);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.category.is_none() && self.tags.is_none()
    }

    /// Trim title/content and reject values that would become empty.
    pub fn normalized(self) -> Result<Self> {
        let title = match self.title {
            Some(t) => {
                let t = t.trim().to_string();
                if t.is_empty() {
                    return Err(Error::ValidationFailed("title must not be empty".to_string()));
                }
                Some(t)
            }
            None => None,
        };
        let content = match self.content {
            Some(c) => {
                let c = c.trim().to_string();
                if c.is_empty() {
                    return Err(Error::ValidationFailed(
                        "content must not be empty".to_string(),
                    ));
                }
                Some(c)
            }
            None => None,
        };
        Ok(Self {
            title,
            content,
            category: self.category.map(normalize_category),
            tags: self.tags.map(normalize_tags),
        })
    }
}

/// Trim tags, drop empties and duplicates, keep first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Trim a category; blank means uncategorized.
pub fn normalize_category(category: Option<String>) -> Option<String> {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Result of a delete call. A 404 is reported as `AlreadyGone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyGone,
}

// =============================================================================
// IDENTITY AND SESSION TYPES
// =============================================================================

/// Authenticated identity as returned by the server. Treated as opaque
/// apart from the display fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Login / registration input.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Trim the username and require both fields to be non-blank.
    /// The password is passed through untouched.
    pub fn validated(self) -> Result<Self> {
        let username = self.username.trim().to_string();
        if username.is_empty() {
            return Err(Error::ValidationFailed(
                "username must not be empty".to_string(),
            ));
        }
        if self.password.trim().is_empty() {
            return Err(Error::ValidationFailed(
                "password must not be empty".to_string(),
            ));
        }
        Ok(Self {
            username,
            password: self.password,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful login: the identity plus a token when the server issues one.
#[derive(Clone, PartialEq)]
pub struct AuthGrant {
    pub token: Option<String>,
    pub user: User,
}

impl fmt::Debug for AuthGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGrant")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .finish()
    }
}

/// How credentials travel with each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// `Authorization: Bearer <token>` from the credential store.
    #[default]
    Bearer,
    /// Same-origin session cookie kept in the client's cookie jar.
    Cookie,
}

impl FromStr for AuthMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bearer" | "token" => Ok(Self::Bearer),
            "cookie" | "session" => Ok(Self::Cookie),
            _ => Err(Error::Config(format!("unknown auth mode: {}", s))),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer => write!(f, "bearer"),
            Self::Cookie => write!(f, "cookie"),
        }
    }
}

/// Authentication state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Initializing,
    Authenticated,
    Anonymous,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Anonymous => write!(f, "anonymous"),
        }
    }
}

/// Snapshot of the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub loading: bool,
}

impl Session {
    /// Session at process start, before restoration.
    pub fn initializing() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    pub fn authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn state(&self) -> SessionState {
        if self.loading {
            SessionState::Initializing
        } else if self.user.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::initializing()
    }
}
