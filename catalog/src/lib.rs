use anyhow::{anyhow, Result};
use reqwest::{header, Client};
use shelf_core::{BookRecord, Catalog, LookupRequest, SearchConfig, SearchError};
use std::time::Duration;
use url::Url;

pub mod volumes;

use volumes::VolumesResponse;

pub const USER_AGENT: &str = concat!("shelf/", env!("CARGO_PKG_VERSION"));

/// Volumes-endpoint client. One connection pool per instance.
#[derive(Clone)]
pub struct GoogleBooks {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl GoogleBooks {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| anyhow!("invalid catalog endpoint {}: {e}", config.endpoint))?;
        if !endpoint.scheme().starts_with("http") {
            return Err(anyhow!("catalog endpoint must be http(s): {endpoint}"));
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, endpoint, timeout: config.timeout })
    }

    pub fn endpoint(&self) -> &Url { &self.endpoint }

    fn classify(&self, err: reqwest::Error) -> SearchError {
        // Malformed is reserved for bodies that arrived whole but did not parse.
        if err.is_timeout() {
            SearchError::Timeout { seconds: self.timeout.as_secs() }
        } else {
            SearchError::Transport(err.to_string())
        }
    }
}

impl Catalog for GoogleBooks {
    async fn lookup(&self, request: &LookupRequest) -> Result<Vec<BookRecord>, SearchError> {
        let mut params: Vec<(&str, String)> = vec![("q", request.query.clone()), ("maxResults", request.max_results.to_string())];
        if let Some(print_type) = &request.print_type {
            params.push(("printType", print_type.clone()));
        }
        tracing::debug!(endpoint = %self.endpoint, query = %request.query, "catalog lookup");

        let resp = self
            .client
            .get(self.endpoint.clone())
            .header(header::ACCEPT, "application/json")
            .query(&params)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(%status, "catalog returned an error status");
            return Err(SearchError::Status(status.as_u16()));
        }
        let bytes = resp.bytes().await.map_err(|e| self.classify(e))?;
        let parsed: VolumesResponse = serde_json::from_slice(&bytes).map_err(|e| SearchError::Malformed(e.to_string()))?;
        let books = parsed.into_books();
        tracing::debug!(hits = books.len(), "catalog lookup complete");
        Ok(books)
    }
}
