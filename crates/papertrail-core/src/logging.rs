//! Structured logging field name constants for the Paper Trail client.
//!
//! All crates use these constants so log lines from the transport, the
//! session manager and the note store can be queried by the same fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Client state could not be kept consistent |
//! | WARN  | Recoverable issue, fallback applied (forced logout, failed logout call) |
//! | INFO  | Lifecycle events (restore outcome, login, logout) |
//! | DEBUG | Decision points (stale response discarded, rollback applied) |
//! | TRACE | Per-request detail |
//!
//! Tokens and passwords are never logged.

// ─── Identity fields ───────────────────────────────────────────────────────

/// Component within the client.
/// Values: "transport", "session", "notes", "query"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "login", "restore", "load", "create", "update", "delete"
pub const OPERATION: &str = "op";

/// Username of the session owner.
pub const USERNAME: &str = "username";

/// Session epoch the operation was issued under.
pub const SESSION_EPOCH: &str = "session_epoch";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note id being operated on.
pub const NOTE_ID: &str = "note_id";

/// Search text applied to a view.
pub const QUERY: &str = "query";

// ─── Request fields ────────────────────────────────────────────────────────

/// HTTP method.
pub const METHOD: &str = "method";

/// Request path relative to the base URL.
pub const PATH: &str = "path";

/// HTTP status code.
pub const STATUS: &str = "status";

/// Monotonic sequence number of a load or per-note mutation.
pub const SEQUENCE: &str = "seq";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of notes returned or held.
pub const RESULT_COUNT: &str = "result_count";

/// Store revision after the change.
pub const REVISION: &str = "revision";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Error kind when an operation fails.
pub const ERROR_KIND: &str = "error_kind";
