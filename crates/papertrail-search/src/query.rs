//! Search, category filter and sort over a note collection.
//!
//! Everything here is pure: the input slice is never modified and every call
//! returns a fresh `Vec`. Applying the same query twice to the same
//! collection yields the same result.

use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use papertrail_core::{Error, Note, Result};
use tracing::trace;

use crate::collation::compare_titles;

/// Category restriction of a view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum CategoryFilter {
    /// No restriction.
    #[default]
    All,
    /// Only notes whose category equals this value exactly.
    Only(String),
}

impl CategoryFilter {
    pub fn only(category: impl Into<String>) -> Self {
        CategoryFilter::Only(category.into())
    }

    /// Uncategorized notes never match a specific filter.
    pub fn matches(&self, note: &Note) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => note.category.as_deref() == Some(wanted.as_str()),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = Infallible;

    /// `"all"` (any case) or a blank string selects [`CategoryFilter::All`].
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Only(s.to_string()))
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => write!(f, "all"),
            CategoryFilter::Only(category) => write!(f, "{}", category),
        }
    }
}

/// Ordering of a view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Newest first.
    #[default]
    CreatedAt,
    /// Most recently modified first.
    UpdatedAt,
    /// Alphabetical, locale-aware.
    Title,
}

impl SortKey {
    /// Compare two notes under this key. Ties break by ascending id so the
    /// order is total.
    pub fn compare(&self, a: &Note, b: &Note) -> Ordering {
        let primary = match self {
            SortKey::CreatedAt => b.created_at.cmp(&a.created_at),
            SortKey::UpdatedAt => b.updated_at.cmp(&a.updated_at),
            SortKey::Title => compare_titles(&a.title, &b.title),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "created" | "created_at" | "createdat" | "newest" => Ok(SortKey::CreatedAt),
            "updated" | "updated_at" | "updatedat" | "modified" => Ok(SortKey::UpdatedAt),
            "title" | "alpha" | "alphabetical" => Ok(SortKey::Title),
            other => Err(Error::ValidationFailed(format!(
                "unknown sort key '{}' (expected created, updated or title)",
                other
            ))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::CreatedAt => write!(f, "created"),
            SortKey::UpdatedAt => write!(f, "updated"),
            SortKey::Title => write!(f, "title"),
        }
    }
}

/// What a list view shows: search text, category filter and sort key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NoteQuery {
    pub search: String,
    pub category: CategoryFilter,
    pub sort: SortKey,
}

impl NoteQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    pub fn category(mut self, filter: CategoryFilter) -> Self {
        self.category = filter;
        self
    }

    pub fn sort(mut self, key: SortKey) -> Self {
        self.sort = key;
        self
    }

    /// Case-insensitive substring match on title, content or any tag,
    /// combined with the category filter. Blank search text matches all.
    pub fn matches(&self, note: &Note) -> bool {
        self.category.matches(note) && text_matches(&self.needle(), note)
    }

    /// Filter and sort `notes` into a new vector.
    pub fn apply(&self, notes: &[Note]) -> Vec<Note> {
        let needle = self.needle();
        let mut view: Vec<Note> = notes
            .iter()
            .filter(|n| self.category.matches(n) && text_matches(&needle, n))
            .cloned()
            .collect();
        view.sort_by(|a, b| self.sort.compare(a, b));

        trace!(
            component = "query",
            query = %self.search,
            category = %self.category,
            sort = %self.sort,
            input_count = notes.len(),
            result_count = view.len(),
            "Applied note query"
        );
        view
    }

    fn needle(&self) -> String {
        self.search.trim().to_lowercase()
    }
}

fn text_matches(needle: &str, note: &Note) -> bool {
    if needle.is_empty() {
        return true;
    }
    note.title.to_lowercase().contains(needle)
        || note.content.to_lowercase().contains(needle)
        || note.tags.iter().any(|t| t.to_lowercase().contains(needle))
}
