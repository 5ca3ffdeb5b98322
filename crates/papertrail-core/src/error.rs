//! Error types for the Paper Trail client.

use thiserror::Error;

/// Result type alias using Paper Trail's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for client operations.
///
/// Transport failures are normalized into these variants before they reach
/// the session or note store; no `reqwest` error escapes to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No response was received (connection refused, DNS, timeout).
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    /// The server answered 401; the session is no longer valid.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Client-side validation failed before any network call.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The server rejected the request with a non-401 status.
    #[error("Server rejected request ({status}): {message}")]
    ServerRejected { status: u16, message: String },

    /// Operation invoked in an invalid session or store state.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Note not present in the local collection
    #[error("Not found: {0}")]
    NotFound(String),

    /// Success status with a body that could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential storage failed
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Fieldless classification of [`Error`] for callers that branch on category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NetworkUnreachable,
    Unauthorized,
    ValidationFailed,
    ServerRejected,
    PreconditionFailed,
    NotFound,
    InvalidResponse,
    Config,
    Storage,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NetworkUnreachable(_) => ErrorKind::NetworkUnreachable,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Error::ServerRejected { .. } => ErrorKind::ServerRejected,
            Error::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidResponse(_) => ErrorKind::InvalidResponse,
            Error::Config(_) => ErrorKind::Config,
            Error::Storage(_) => ErrorKind::Storage,
        }
    }

    /// True when the server reported the session as invalid.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }

    /// Shorthand for a server rejection.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Error::ServerRejected {
            status,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::NetworkUnreachable => "network_unreachable",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::ServerRejected => "server_rejected",
            ErrorKind::PreconditionFailed => "precondition_failed",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::Config => "config",
            ErrorKind::Storage => "storage",
        };
        f.write_str(name)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidResponse(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Error::InvalidResponse(e.to_string());
        }
        if let Some(status) = e.status() {
            if status.as_u16() == 401 {
                return Error::Unauthorized(e.to_string());
            }
            return Error::rejected(status.as_u16(), e.to_string());
        }
        if e.is_builder() {
            return Error::Config(e.to_string());
        }
        Error::NetworkUnreachable(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_network() {
        let err = Error::NetworkUnreachable("connection refused".to_string());
        assert_eq!(err.to_string(), "Network unreachable: connection refused");
    }

    #[test]
    fn test_error_display_server_rejected() {
        let err = Error::rejected(400, "Username already registered");
        assert_eq!(
            err.to_string(),
            "Server rejected request (400): Username already registered"
        );
    }

    #[test]
    fn test_error_display_precondition() {
        let err = Error::PreconditionFailed("not authenticated".to_string());
        assert_eq!(err.to_string(), "Precondition failed: not authenticated");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::Unauthorized("x".into()).kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            Error::ValidationFailed("x".into()).kind(),
            ErrorKind::ValidationFailed
        );
        assert_eq!(Error::rejected(409, "x").kind(), ErrorKind::ServerRejected);
        assert_eq!(Error::Storage("x".into()).kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(Error::Unauthorized("expired".into()).is_unauthorized());
        assert!(!Error::rejected(403, "forbidden").is_unauthorized());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::NetworkUnreachable.to_string(), "network_unreachable");
        assert_eq!(ErrorKind::ServerRejected.to_string(), "server_rejected");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        match err {
            Error::Storage(msg) => assert!(msg.contains("access denied")),
            _ => panic!("Expected Storage error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
