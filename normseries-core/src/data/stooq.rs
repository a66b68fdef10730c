//! Stooq daily CSV fetcher.
//!
//! Stooq serves the full daily history as `Date,Open,High,Low,Close,Volume`
//! with no authentication, but rejects requests without a browser-like
//! user agent. No retries: any failure aborts the run.

use reqwest::blocking::Client;
use tracing::debug;

use super::provider::{FetchError, PriceSource};
use crate::config::IngestConfig;

/// Blocking HTTP source for Stooq (or any endpoint with a `{symbol}` template).
pub struct StooqSource {
    client: Client,
    config: IngestConfig,
}

impl StooqSource {
    pub fn new(config: &IngestConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

impl PriceSource for StooqSource {
    fn name(&self) -> &str {
        "stooq"
    }

    fn fetch_csv(&self, symbol: &str) -> Result<String, FetchError> {
        let url = self.config.source_url(symbol);
        debug!(%url, "GET");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|source| FetchError::Network {
                url: url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = resp.text().map_err(|source| FetchError::Network {
            url: url.clone(),
            source,
        })?;
        debug!(%url, bytes = body.len(), "fetched");
        Ok(body)
    }
}
