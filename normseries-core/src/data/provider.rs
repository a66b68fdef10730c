//! Price source trait and fetch errors.
//!
//! The PriceSource trait abstracts over where raw CSV comes from (Stooq over
//! HTTP, or an in-memory table) so the pipeline can run against fixtures.

use std::collections::HashMap;
use std::thread;
use thiserror::Error;
use tracing::debug;

use crate::config::Symbols;

/// Errors while retrieving raw CSV. All of them abort the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} @ {url}")]
    Status { status: u16, url: String },

    #[error("network error @ {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Something that returns the full daily history CSV for a symbol.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch the raw `Date,Open,High,Low,Close,Volume` text for a symbol.
    fn fetch_csv(&self, symbol: &str) -> Result<String, FetchError>;
}

/// Raw CSV bodies for both instruments.
#[derive(Debug, Clone)]
pub struct FetchedPair {
    pub voo: String,
    pub qqq: String,
}

/// Fetch both instruments concurrently.
///
/// The VOO request runs on its own scoped thread while QQQ runs on the
/// caller's, so both are in flight before either result is inspected. If
/// either fails the whole pair fails; the VOO error wins when both do.
pub fn fetch_pair(source: &dyn PriceSource, symbols: &Symbols) -> Result<FetchedPair, FetchError> {
    debug!(source = source.name(), voo = %symbols.voo, qqq = %symbols.qqq, "fetching pair");
    thread::scope(|scope| {
        let voo = scope.spawn(|| source.fetch_csv(&symbols.voo));
        let qqq = source.fetch_csv(&symbols.qqq);
        let voo = voo
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
        Ok(FetchedPair {
            voo: voo?,
            qqq: qqq?,
        })
    })
}

/// In-memory source keyed by symbol. Unknown symbols answer like a 404.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    bodies: HashMap<String, String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(symbol.into(), body.into());
        self
    }
}

impl PriceSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch_csv(&self, symbol: &str) -> Result<String, FetchError> {
        self.bodies
            .get(symbol)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: format!("static://{symbol}"),
            })
    }
}
