//! # papertrail-search
//!
//! Local query engine for Paper Trail notes.
//!
//! This crate provides:
//! - Case-insensitive text search over title, content and tags
//! - Exact-match category filtering with an `All` sentinel
//! - Newest, recently-updated and locale-aware title ordering
//! - Category enumeration for filter controls
//!
//! Nothing here performs I/O or mutates its input.
//!
//! ## Example
//!
//! ```
//! use papertrail_search::{CategoryFilter, NoteQuery, SortKey};
//!
//! let query = NoteQuery::new()
//!     .search("meeting")
//!     .category(CategoryFilter::only("Work"))
//!     .sort(SortKey::Title);
//! assert!(query.apply(&[]).is_empty());
//! ```

pub mod categories;
pub mod collation;
pub mod query;

pub use categories::categories;
pub use collation::compare_titles;
pub use query::{CategoryFilter, NoteQuery, SortKey};
