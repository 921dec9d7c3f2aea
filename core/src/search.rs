use crate::{BookRecord, Shelf, StateStore};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;

pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/books/v1/volumes";
/// Results requested per lookup.
pub const DEFAULT_MAX_RESULTS: u32 = 10;
/// Upper bound accepted by the volumes endpoint.
pub const MAX_RESULTS_CAP: u32 = 40;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("search text is empty")]
    EmptyQuery,
    #[error("catalog request failed: {0}")]
    Transport(String),
    #[error("catalog did not answer within {seconds}s")]
    Timeout { seconds: u64 },
    #[error("catalog returned status {0}")]
    Status(u16),
    #[error("catalog response could not be read: {0}")]
    Malformed(String),
    #[error("response to request #{seq} arrived after a newer search")]
    Superseded { seq: u64 },
}

impl SearchError {
    /// Network-level failures: connect, DNS, timeout.
    pub fn is_transport(&self) -> bool {
        matches!(self, SearchError::Transport(_) | SearchError::Timeout { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub endpoint: String,
    pub max_results: u32,
    /// Value for the `printType` filter, `None` to request every volume type.
    pub result_type_filter: Option<String>,
    pub timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            result_type_filter: Some("books".to_string()),
            timeout: Duration::from_secs(10),
        }
    }
}

impl SearchConfig {
    pub fn max_results(&self) -> u32 { self.max_results.clamp(1, MAX_RESULTS_CAP) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub query: String,
    pub max_results: u32,
    pub print_type: Option<String>,
}

/// External book lookup service.
pub trait Catalog: Send + Sync {
    fn lookup(&self, request: &LookupRequest) -> impl Future<Output = Result<Vec<BookRecord>, SearchError>> + Send;
}

/// Handle for one issued search. Only the most recently issued ticket may apply its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub seq: u64,
    pub query: String,
}

pub struct SearchController<C> {
    catalog: C,
    config: SearchConfig,
}

impl<C: Catalog> SearchController<C> {
    pub fn new(catalog: C, config: SearchConfig) -> Self { Self { catalog, config } }

    pub fn config(&self) -> &SearchConfig { &self.config }

    pub fn catalog(&self) -> &C { &self.catalog }

    pub fn request_for(&self, query: &str) -> LookupRequest {
        LookupRequest {
            query: query.to_string(),
            max_results: self.config.max_results(),
            print_type: self.config.result_type_filter.clone(),
        }
    }

    /// Runs the lookup for `ticket`. Does not touch any shelf state.
    pub async fn fetch(&self, ticket: &SearchTicket) -> Result<Vec<BookRecord>, SearchError> {
        let request = self.request_for(&ticket.query);
        let mut books = self.catalog.lookup(&request).await.map_err(|err| {
            tracing::warn!(seq = ticket.seq, query = %ticket.query, error = %err, "catalog lookup failed");
            err
        })?;
        books.truncate(request.max_results as usize);
        Ok(books)
    }

    /// Begin, fetch and apply in one go, for callers that own the shelf exclusively.
    pub async fn search<S: StateStore>(&self, shelf: &mut Shelf<S>, query: &str) -> Result<Vec<BookRecord>, SearchError> {
        let ticket = shelf.begin_search(query)?;
        let outcome = self.fetch(&ticket).await;
        shelf.finish_search(ticket, outcome, OffsetDateTime::now_utc()).map(<[BookRecord]>::to_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_results_is_clamped() {
        let mut config = SearchConfig::default();
        assert_eq!(config.max_results(), 10);
        config.max_results = 500;
        assert_eq!(config.max_results(), MAX_RESULTS_CAP);
        config.max_results = 0;
        assert_eq!(config.max_results(), 1);
    }

    #[test]
    fn transport_class() {
        assert!(SearchError::Timeout { seconds: 10 }.is_transport());
        assert!(SearchError::Transport("dns".into()).is_transport());
        assert!(!SearchError::Status(503).is_transport());
        assert!(!SearchError::Malformed("eof".into()).is_transport());
    }
}
