pub mod book;
pub mod categories;
pub mod persist;
pub mod recent;
pub mod search;
pub mod shelf;

pub use book::BookRecord;
pub use categories::{CategorySet, SEED_CATEGORIES};
pub use persist::{LoadedState, MemoryStore, PersistenceBridge, SledStore, StateStore, StoreError};
pub use recent::{RecentSearch, RecentSearchLog, RECENT_SEARCH_LIMIT};
pub use search::{Catalog, LookupRequest, SearchConfig, SearchController, SearchError, SearchTicket};
pub use shelf::{SearchStatus, Shelf, ShelfError};
