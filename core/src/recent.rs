use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const RECENT_SEARCH_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSearch {
    pub query: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl RecentSearch {
    pub fn new(query: impl Into<String>, at: OffsetDateTime) -> Self {
        let timestamp = (at.unix_timestamp_nanos() / 1_000_000) as i64;
        Self { query: query.into(), timestamp }
    }

    pub fn at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp_nanos(self.timestamp as i128 * 1_000_000)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}

/// Most-recent-first history of successful queries, never longer than [`RECENT_SEARCH_LIMIT`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecentSearchLog {
    entries: Vec<RecentSearch>,
}

impl RecentSearchLog {
    pub fn new() -> Self { Self::default() }

    pub fn record(&mut self, query: impl Into<String>, at: OffsetDateTime) {
        self.entries.insert(0, RecentSearch::new(query, at));
        self.entries.truncate(RECENT_SEARCH_LIMIT);
    }

    pub fn entries(&self) -> &[RecentSearch] { &self.entries }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn queries(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.query.as_str())
    }

    /// Trims a log read from storage that may exceed the cap.
    pub(crate) fn normalize(mut self) -> Self {
        self.entries.truncate(RECENT_SEARCH_LIMIT);
        self
    }
}
