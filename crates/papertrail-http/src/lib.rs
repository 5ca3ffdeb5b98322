//! # papertrail-http
//!
//! HTTP transport for the Paper Trail REST API.
//!
//! [`HttpTransport`] implements [`papertrail_core::NotesApi`] on top of
//! `reqwest`. It resolves routes against a configurable base URL, attaches
//! credentials to every request according to the configured
//! [`papertrail_core::AuthMode`], and normalizes every failure into
//! [`papertrail_core::Error`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use papertrail_core::{MemoryCredentialStore, NotesApi};
//! use papertrail_http::{ClientConfig, HttpTransport};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClientConfig::from_env().unwrap();
//!     let transport = HttpTransport::new(config, Arc::new(MemoryCredentialStore::new())).unwrap();
//!     let notes = transport.list_notes().await;
//! }
//! ```

mod backend;
pub mod config;
pub mod error;
pub mod types;

pub use backend::HttpTransport;
pub use config::{ApiRoutes, ClientConfig, ConfigError, ConfigResult};
pub use error::error_from_response;
