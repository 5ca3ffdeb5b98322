//! Memoized query views over the note store.

use std::sync::Arc;

use papertrail_core::Note;
use papertrail_search::{categories, NoteQuery};
use tracing::trace;

use crate::notes::NoteStore;

struct Cached {
    revision: u64,
    query: NoteQuery,
    notes: Arc<[Note]>,
}

/// A filtered, sorted view that is recomputed only when the store's
/// revision or the query changes. Never touches the network.
pub struct NoteView {
    store: NoteStore,
    query: NoteQuery,
    cached: Option<Cached>,
    categories: Option<(u64, Arc<[String]>)>,
    computations: u64,
}

impl NoteView {
    pub fn new(store: NoteStore) -> Self {
        Self::with_query(store, NoteQuery::default())
    }

    pub fn with_query(store: NoteStore, query: NoteQuery) -> Self {
        Self {
            store,
            query,
            cached: None,
            categories: None,
            computations: 0,
        }
    }

    pub fn query(&self) -> &NoteQuery {
        &self.query
    }

    pub fn set_query(&mut self, query: NoteQuery) {
        self.query = query;
    }

    /// Current result, recomputed if stale.
    pub fn notes(&mut self) -> Arc<[Note]> {
        let (revision, all) = self.store.snapshot();
        if let Some(cached) = &self.cached {
            if cached.revision == revision && cached.query == self.query {
                return cached.notes.clone();
            }
        }

        let notes: Arc<[Note]> = self.query.apply(&all).into();
        self.computations += 1;
        trace!(
            component = "query",
            revision,
            result_count = notes.len(),
            "Recomputed note view"
        );
        self.cached = Some(Cached {
            revision,
            query: self.query.clone(),
            notes: notes.clone(),
        });
        notes
    }

    /// Distinct categories of the whole collection, first-seen order.
    pub fn categories(&mut self) -> Arc<[String]> {
        let (revision, all) = self.store.snapshot();
        match &self.categories {
            Some((cached_rev, list)) if *cached_rev == revision => list.clone(),
            _ => {
                let list: Arc<[String]> = categories(&all).into();
                self.categories = Some((revision, list.clone()));
                list
            }
        }
    }

    /// How many times the result was recomputed.
    pub fn computations(&self) -> u64 {
        self.computations
    }
}
