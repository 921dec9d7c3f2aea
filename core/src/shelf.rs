//! Session state: saved categories, search history, current results and the transient
//! selection/visibility flags, kept in step with a [`StateStore`].

use crate::search::{SearchError, SearchTicket};
use crate::{BookRecord, CategorySet, PersistenceBridge, RecentSearchLog, StateStore, StoreError};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error)]
pub enum ShelfError {
    #[error("choose a category before saving")]
    InvalidCategorySelection,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the results area should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchStatus {
    NotSearched,
    Loaded { query: String, count: usize },
    NoResults { query: String },
    Failed { query: String, message: String },
}

pub struct Shelf<S> {
    bridge: PersistenceBridge<S>,
    categories: CategorySet,
    recent: RecentSearchLog,
    results: Vec<BookRecord>,
    status: SearchStatus,
    visible: HashMap<String, bool>,
    selected: Option<String>,
    issued_seq: u64,
}

impl<S: StateStore> Shelf<S> {
    /// Loads persisted state and starts a fresh session on top of it.
    pub fn open(store: S) -> Self {
        let bridge = PersistenceBridge::new(store);
        let loaded = bridge.load_state();
        tracing::debug!(
            categories = loaded.categories.len(),
            recent = loaded.recent.len(),
            "shelf state loaded"
        );
        Self {
            bridge,
            categories: loaded.categories,
            recent: loaded.recent,
            results: Vec::new(),
            status: SearchStatus::NotSearched,
            visible: HashMap::new(),
            selected: None,
            issued_seq: 0,
        }
    }

    pub fn bridge(&self) -> &PersistenceBridge<S> { &self.bridge }

    pub fn categories(&self) -> &CategorySet { &self.categories }

    pub fn recent(&self) -> &RecentSearchLog { &self.recent }

    pub fn results(&self) -> &[BookRecord] { &self.results }

    pub fn status(&self) -> &SearchStatus { &self.status }

    pub fn list_categories(&self) -> Vec<String> { self.categories.names().map(str::to_string).collect() }

    pub fn books_in(&self, category: &str) -> &[BookRecord] { self.categories.books_in(category) }

    pub fn find_result(&self, id: &str) -> Option<&BookRecord> { self.results.iter().find(|b| b.id == id) }

    // --- categories ---

    pub fn add_to_category(&mut self, book: BookRecord, category: &str) -> Result<&CategorySet, ShelfError> {
        tracing::debug!(book = %book.id, category, "adding book");
        self.categories.add(book, category);
        self.persist_categories()
    }

    pub fn remove_from_category(&mut self, book_id: &str, category: &str) -> Result<&CategorySet, ShelfError> {
        let removed = self.categories.remove(book_id, category);
        tracing::debug!(book = book_id, category, removed, "removing book");
        self.persist_categories()
    }

    /// Free-text category creation. Blank or existing names leave the set unchanged.
    pub fn create_category(&mut self, name: &str) -> Result<&CategorySet, ShelfError> {
        if !self.categories.create(name) {
            return Ok(&self.categories);
        }
        self.persist_categories()
    }

    fn persist_categories(&mut self) -> Result<&CategorySet, ShelfError> {
        self.bridge.save_category_set(&self.categories)?;
        Ok(&self.categories)
    }

    // --- selection and visibility ---

    pub fn select_category(&mut self, name: &str) { self.selected = Some(name.to_string()); }

    pub fn clear_selection(&mut self) { self.selected = None; }

    pub fn selected(&self) -> Option<&str> { self.selected.as_deref() }

    /// Saves into the selected category. Nothing changes when no category is selected.
    pub fn save_to_selected(&mut self, book: BookRecord) -> Result<&CategorySet, ShelfError> {
        let category = match self.selected.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(ShelfError::InvalidCategorySelection),
        };
        self.add_to_category(book, &category)
    }

    /// Flips a category between expanded and collapsed. Returns the new state.
    pub fn toggle_visibility(&mut self, category: &str) -> bool {
        let flag = self.visible.entry(category.to_string()).or_insert(false);
        *flag = !*flag;
        *flag
    }

    pub fn is_visible(&self, category: &str) -> bool { self.visible.get(category).copied().unwrap_or(false) }

    // --- search ---

    /// Issues a ticket for `query`. Blank queries are refused before any request is made.
    pub fn begin_search(&mut self, query: &str) -> Result<SearchTicket, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        self.issued_seq += 1;
        Ok(SearchTicket { seq: self.issued_seq, query: query.to_string() })
    }

    /// Applies a lookup outcome as one transition. Outcomes for anything but the latest
    /// ticket are dropped without touching state.
    pub fn finish_search(
        &mut self,
        ticket: SearchTicket,
        outcome: Result<Vec<BookRecord>, SearchError>,
        now: OffsetDateTime,
    ) -> Result<&[BookRecord], SearchError> {
        if ticket.seq != self.issued_seq {
            tracing::debug!(seq = ticket.seq, latest = self.issued_seq, "discarding stale search response");
            return Err(SearchError::Superseded { seq: ticket.seq });
        }
        match outcome {
            Ok(books) => {
                self.status = if books.is_empty() {
                    SearchStatus::NoResults { query: ticket.query.clone() }
                } else {
                    SearchStatus::Loaded { query: ticket.query.clone(), count: books.len() }
                };
                self.results = books;
                self.recent.record(ticket.query, now);
                if let Err(err) = self.bridge.save_recent_search_log(&self.recent) {
                    tracing::error!(error = %err, "saving recent searches failed");
                }
                Ok(&self.results)
            }
            Err(err) => {
                self.status = SearchStatus::Failed { query: ticket.query, message: err.to_string() };
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{CATEGORIES_KEY, RECENT_SEARCHES_KEY};
    use crate::MemoryStore;
    use time::macros::datetime;

    fn book(id: &str) -> BookRecord { BookRecord::new(id, format!("Title {id}")) }

    #[test]
    fn save_requires_selection() {
        let store = MemoryStore::new();
        let mut shelf = Shelf::open(store.clone());
        let err = shelf.save_to_selected(book("A1")).unwrap_err();
        assert!(matches!(err, ShelfError::InvalidCategorySelection));
        shelf.select_category("   ");
        assert!(matches!(shelf.save_to_selected(book("A1")), Err(ShelfError::InvalidCategorySelection)));
        assert!(store.raw(CATEGORIES_KEY).is_none());

        shelf.select_category("Terror");
        shelf.save_to_selected(book("A1")).unwrap();
        assert_eq!(shelf.books_in("Terror").len(), 1);
        assert!(store.raw(CATEGORIES_KEY).unwrap().contains("A1"));
    }

    #[test]
    fn visibility_defaults_collapsed_and_toggles() {
        let mut shelf = Shelf::open(MemoryStore::new());
        assert!(!shelf.is_visible("Terror"));
        assert!(shelf.toggle_visibility("Terror"));
        assert!(shelf.is_visible("Terror"));
        assert!(!shelf.is_visible("Aventuras"));
        assert!(!shelf.toggle_visibility("Terror"));
    }

    #[test]
    fn failed_search_keeps_previous_results() {
        let store = MemoryStore::new();
        let mut shelf = Shelf::open(store.clone());
        let t0 = datetime!(2024-01-01 00:00 UTC);
        let ticket = shelf.begin_search("Dune").unwrap();
        shelf.finish_search(ticket, Ok(vec![book("A1")]), t0).unwrap();
        let saved_log = store.raw(RECENT_SEARCHES_KEY).unwrap();

        let ticket = shelf.begin_search("Hobbit").unwrap();
        let err = shelf.finish_search(ticket, Err(SearchError::Status(503)), t0).unwrap_err();
        assert_eq!(err, SearchError::Status(503));
        assert_eq!(shelf.results(), &[book("A1")]);
        assert_eq!(shelf.recent().len(), 1);
        assert_eq!(store.raw(RECENT_SEARCHES_KEY).unwrap(), saved_log);
        assert!(matches!(shelf.status(), SearchStatus::Failed { query, .. } if query == "Hobbit"));
    }

    #[test]
    fn empty_response_is_no_results_not_failure() {
        let mut shelf = Shelf::open(MemoryStore::new());
        assert_eq!(shelf.status(), &SearchStatus::NotSearched);
        let ticket = shelf.begin_search("zzzz").unwrap();
        shelf.finish_search(ticket, Ok(vec![]), datetime!(2024-01-01 00:00 UTC)).unwrap();
        assert_eq!(shelf.status(), &SearchStatus::NoResults { query: "zzzz".into() });
        assert_eq!(shelf.recent().len(), 1);
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut shelf = Shelf::open(MemoryStore::new());
        let t0 = datetime!(2024-01-01 00:00 UTC);
        let first = shelf.begin_search("Dune").unwrap();
        let second = shelf.begin_search("Hobbit").unwrap();
        shelf.finish_search(second, Ok(vec![book("B1")]), t0).unwrap();
        let err = shelf.finish_search(first, Ok(vec![book("A1")]), t0).unwrap_err();
        assert_eq!(err, SearchError::Superseded { seq: 1 });
        assert_eq!(shelf.results(), &[book("B1")]);
        assert_eq!(shelf.recent().queries().collect::<Vec<_>>(), ["Hobbit"]);
    }

    #[test]
    fn blank_query_is_refused() {
        let mut shelf = Shelf::open(MemoryStore::new());
        assert_eq!(shelf.begin_search(" \t ").unwrap_err(), SearchError::EmptyQuery);
    }

    #[test]
    fn create_category_persists_only_on_change() {
        let store = MemoryStore::new();
        let mut shelf = Shelf::open(store.clone());
        shelf.create_category("Terror").unwrap();
        assert!(store.raw(CATEGORIES_KEY).is_none());
        shelf.create_category("Poesía").unwrap();
        assert!(store.raw(CATEGORIES_KEY).unwrap().contains("Poesía"));
        assert_eq!(shelf.list_categories().last().map(String::as_str), Some("Poesía"));
    }
}
