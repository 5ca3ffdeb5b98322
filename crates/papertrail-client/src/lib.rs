//! # papertrail-client
//!
//! Session-and-data layer of the Paper Trail client.
//!
//! - [`SessionManager`] tracks who is logged in and restores a persisted
//!   session at startup.
//! - [`NoteStore`] caches the user's notes and applies create, update and
//!   delete optimistically, rolling back when the server refuses.
//! - [`NoteView`] derives filtered and sorted views without network calls.
//! - [`PaperTrail`] wires them to an HTTP transport.
//!
//! ## Example
//!
//! ```no_run
//! use papertrail_client::PaperTrail;
//! use papertrail_core::{Credentials, NoteDraft};
//!
//! # async fn demo() -> papertrail_core::Result<()> {
//! let client = PaperTrail::from_env()?;
//! client.session().restore().await?;
//! client.session().login(Credentials::new("alice", "pw")).await?;
//! client.notes().load().await?;
//! client.notes().create(NoteDraft::new("First", "Hello")).await?;
//! client.teardown();
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod credentials;
pub mod notes;
mod optimistic;
pub mod session;
pub mod view;

pub use context::PaperTrail;
pub use credentials::{store_for_config, FileCredentialStore};
pub use notes::NoteStore;
pub use session::SessionManager;
pub use view::NoteView;

// Query types used with views
pub use papertrail_search::{CategoryFilter, NoteQuery, SortKey};
