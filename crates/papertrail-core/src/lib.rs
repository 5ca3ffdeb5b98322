//! # papertrail-core
//!
//! Core types, traits, and abstractions for the Paper Trail client.
//!
//! This crate provides the note and session data model, the error type
//! shared by every layer, and the two ports the client depends on: the REST
//! API ([`NotesApi`]) and durable credential storage ([`CredentialStore`]).

pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod traits;

// In-memory API double, also exported to dependent crates' tests
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types at crate root
pub use error::{Error, ErrorKind, Result};
pub use events::{ClientEvent, EventBus, EventEnvelope};
pub use models::*;
pub use traits::*;
