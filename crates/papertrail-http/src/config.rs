//! Transport configuration.
//!
//! Configuration is read from environment variables (after `.env` has been
//! loaded by the binary) or built directly in code.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `PAPERTRAIL_BASE_URL` | `http://localhost:8000` | server base URL |
//! | `PAPERTRAIL_API_PREFIX` | (empty) | path prefix, e.g. `/api` |
//! | `PAPERTRAIL_AUTH_MODE` | `bearer` | `bearer` or `cookie` |
//! | `PAPERTRAIL_TIMEOUT` | `30` | request timeout in seconds |
//! | `PAPERTRAIL_TOKEN_FILE` | (platform config dir) | bearer token file |
//! | `PAPERTRAIL_AUTH_ROUTES` | `flat` | `flat` (`/login`) or `namespaced` (`/auth/login`) |
//!
//! # Example
//!
//! ```rust
//! use papertrail_http::ClientConfig;
//!
//! let config = ClientConfig {
//!     base_url: "http://localhost:8000".to_string(),
//!     api_prefix: "/api".to_string(),
//!     ..Default::default()
//! };
//! assert_eq!(config.url("/notes"), "http://localhost:8000/api/notes");
//! ```

use papertrail_core::{defaults, AuthMode};
use std::env;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid base URL '{0}': {1}")]
    InvalidUrl(String, String),

    #[error("Invalid auth mode: {0}")]
    InvalidAuthMode(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for papertrail_core::Error {
    fn from(e: ConfigError) -> Self {
        papertrail_core::Error::Config(e.to_string())
    }
}

/// Route paths of the REST contract, relative to base URL + prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoutes {
    pub login: String,
    pub register: String,
    pub logout: String,
    pub me: String,
    pub notes: String,
    /// Appended to `notes` for server-side search.
    pub notes_search: String,
}

impl Default for ApiRoutes {
    fn default() -> Self {
        Self {
            login: defaults::ROUTE_LOGIN.to_string(),
            register: defaults::ROUTE_REGISTER.to_string(),
            logout: defaults::ROUTE_LOGOUT.to_string(),
            me: defaults::ROUTE_ME.to_string(),
            notes: defaults::ROUTE_NOTES.to_string(),
            notes_search: defaults::ROUTE_NOTES_SEARCH.to_string(),
        }
    }
}

impl ApiRoutes {
    /// Auth routes under `/auth/*`, as served behind an `/api` gateway.
    /// The `/api` part itself belongs in `api_prefix`.
    pub fn auth_namespaced() -> Self {
        Self {
            login: "/auth/login".to_string(),
            register: "/auth/register".to_string(),
            logout: "/auth/logout".to_string(),
            me: "/auth/me".to_string(),
            ..Self::default()
        }
    }

    /// Route set by name: `flat` or `namespaced`.
    pub fn for_style(style: &str) -> ConfigResult<Self> {
        match style.trim().to_ascii_lowercase().as_str() {
            "" | "flat" => Ok(Self::default()),
            "namespaced" | "auth" => Ok(Self::auth_namespaced()),
            other => Err(ConfigError::Validation(format!(
                "unknown auth route style '{}' (expected 'flat' or 'namespaced')",
                other
            ))),
        }
    }

    pub fn note(&self, id: i64) -> String {
        format!("{}/{}", self.notes.trim_end_matches('/'), id)
    }

    pub fn search(&self) -> String {
        format!("{}{}", self.notes.trim_end_matches('/'), self.notes_search)
    }
}

/// Configuration of the HTTP transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_prefix: String,
    pub auth_mode: AuthMode,
    pub timeout_seconds: u64,
    pub routes: ApiRoutes,
    /// Where the bearer token is persisted. `None` selects the platform
    /// default chosen by the client crate.
    pub token_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            api_prefix: defaults::API_PREFIX.to_string(),
            auth_mode: AuthMode::default(),
            timeout_seconds: defaults::TIMEOUT_SECS,
            routes: ApiRoutes::default(),
            token_file: None,
        }
    }
}

impl ClientConfig {
    /// Load from `PAPERTRAIL_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Ok(url) = env::var("PAPERTRAIL_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(prefix) = env::var("PAPERTRAIL_API_PREFIX") {
            config.api_prefix = prefix;
        }
        if let Ok(mode) = env::var("PAPERTRAIL_AUTH_MODE") {
            config.auth_mode = mode
                .parse()
                .map_err(|_| ConfigError::InvalidAuthMode(mode.clone()))?;
        }
        if let Ok(timeout) = env::var("PAPERTRAIL_TIMEOUT") {
            config.timeout_seconds = timeout.parse().map_err(|_| {
                ConfigError::Validation(format!("PAPERTRAIL_TIMEOUT is not a number: {}", timeout))
            })?;
        }
        if let Ok(style) = env::var("PAPERTRAIL_AUTH_ROUTES") {
            config.routes = ApiRoutes::for_style(&style)?;
        }
        if let Ok(path) = env::var("PAPERTRAIL_TOKEN_FILE") {
            config.token_file = Some(PathBuf::from(path));
        }

        config.validate()?;
        debug!(
            base_url = %config.base_url,
            api_prefix = %config.api_prefix,
            auth_mode = %config.auth_mode,
            login_route = %config.routes.login,
            timeout_seconds = config.timeout_seconds,
            "Loaded client configuration from environment"
        );
        Ok(config)
    }

    /// Check the base URL and timeout.
    pub fn validate(&self) -> ConfigResult<()> {
        let parsed = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::InvalidUrl(self.base_url.clone(), e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(
                self.base_url.clone(),
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// Absolute URL for a route path.
    pub fn url(&self, path: &str) -> String {
        let prefix = self.api_prefix.trim_matches('/');
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if prefix.is_empty() {
            format!("{}/{}", base, path)
        } else {
            format!("{}/{}/{}", base, prefix, path)
        }
    }
}
