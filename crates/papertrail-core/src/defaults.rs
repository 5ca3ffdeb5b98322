//! Centralized default constants for the Paper Trail client.
//!
//! Every crate in the workspace reads its defaults from here instead of
//! defining its own literals.

// =============================================================================
// SERVER
// =============================================================================

/// Default API base URL (local development server).
pub const BASE_URL: &str = "http://localhost:8000";

/// Default path prefix placed between the base URL and every route.
pub const API_PREFIX: &str = "";

/// Default request timeout in seconds.
pub const TIMEOUT_SECS: u64 = 30;

// =============================================================================
// ROUTES
// =============================================================================

pub const ROUTE_LOGIN: &str = "/login";
pub const ROUTE_REGISTER: &str = "/register";
pub const ROUTE_LOGOUT: &str = "/logout";
pub const ROUTE_ME: &str = "/me";
pub const ROUTE_NOTES: &str = "/notes";

/// Server-side search, relative to the notes route.
pub const ROUTE_NOTES_SEARCH: &str = "/search";

// =============================================================================
// CLIENT STATE
// =============================================================================

/// Display prefix for optimistic placeholder ids.
pub const PLACEHOLDER_PREFIX: &str = "tmp-";

/// Event bus buffer. Lagging subscribers lose the oldest events.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// CREDENTIAL STORAGE
// =============================================================================

/// Directory name under the platform config dir.
pub const APP_DIR: &str = "papertrail";

/// Bearer token file name inside [`APP_DIR`].
pub const TOKEN_FILE: &str = "token";
