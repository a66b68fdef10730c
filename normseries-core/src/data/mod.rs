//! Price data: sources, the Stooq HTTP fetcher and the CSV parser.

pub mod parse;
pub mod provider;
pub mod stooq;

pub use parse::{parse_closes, ParseError, NULL_SENTINEL};
pub use provider::{fetch_pair, FetchError, FetchedPair, PriceSource, StaticSource};
pub use stooq::StooqSource;
