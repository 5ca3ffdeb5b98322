//! Mapping of HTTP failures onto the client error kinds.

use papertrail_core::Error;
use reqwest::StatusCode;

use crate::types::ErrorBody;

/// Build the client error for a non-success response body.
///
/// The message comes from the body's `message`/`detail`/`error` field when
/// present, otherwise from the status reason phrase.
pub fn error_from_response(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message())
        .or_else(|| {
            let trimmed = body.trim();
            // Plain-text bodies are shown as-is when short; HTML error pages are not.
            (!trimmed.is_empty() && trimmed.len() <= 200 && !trimmed.starts_with('<'))
                .then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    // 404 stays a rejection; callers decide what a missing note means.
    if status == StatusCode::UNAUTHORIZED {
        Error::Unauthorized(message)
    } else {
        Error::rejected(status.as_u16(), message)
    }
}

/// Map a `reqwest` send/receive failure.
pub fn error_from_transport(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        return Error::NetworkUnreachable(format!("request timed out: {}", e));
    }
    if e.is_connect() {
        return Error::NetworkUnreachable(format!("cannot connect to server: {}", e));
    }
    Error::from(e)
}
