//! Wire types for the Paper Trail REST API.

use chrono::{DateTime, NaiveDateTime, Utc};
use papertrail_core::{normalize_category, normalize_tags, AuthGrant, Note, NoteId, User};
use serde::{Deserialize, Deserializer, Serialize};

/// Body of `POST /login` and `POST /register`.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialsBody<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response of `POST /login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

impl LoginResponse {
    /// Combine with the identity (either embedded or fetched separately).
    pub fn into_grant(self, user: User) -> AuthGrant {
        AuthGrant {
            token: self.access_token.filter(|t| !t.is_empty()),
            user,
        }
    }
}

/// A note as the server sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<TagsField>,
    #[serde(alias = "createdAt", deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "updatedAt", deserialize_with = "optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Tags arrive either as a list or as the comma-joined column value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsField {
    List(Vec<String>),
    Csv(String),
}

impl From<NoteRecord> for Note {
    fn from(record: NoteRecord) -> Self {
        let tags = match record.tags {
            Some(TagsField::List(list)) => normalize_tags(list),
            Some(TagsField::Csv(csv)) => normalize_tags(csv.split(',')),
            None => Vec::new(),
        };
        // A server that only tracks creation time reports no updated_at.
        let updated_at = record
            .updated_at
            .map(|u| u.max(record.created_at))
            .unwrap_or(record.created_at);
        Note {
            id: NoteId::Server(record.id),
            title: record.title,
            content: record.content,
            category: normalize_category(record.category),
            tags,
            created_at: record.created_at,
            updated_at,
        }
    }
}

/// Error body. FastAPI-style servers use `detail`, which is either a string
/// or a list of validation errors; others use `message` or `error`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Best human-readable message in the body, if any.
    pub fn message(&self) -> Option<String> {
        if let Some(ref m) = self.message {
            if !m.trim().is_empty() {
                return Some(m.trim().to_string());
            }
        }
        self.detail
            .as_ref()
            .and_then(value_message)
            .or_else(|| self.error.as_ref().and_then(value_message))
    }
}

fn value_message(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Array(items) => {
            let msgs: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    item.get("msg")
                        .or_else(|| item.get("message"))
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        serde_json::Value::Object(map) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        _ => None,
    }
}

/// Accept RFC 3339 as well as naive ISO timestamps (assumed UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw))),
        None => Ok(None),
    }
}
