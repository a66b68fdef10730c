//! normseries core: fetch daily closes, normalize against a base date, append to a JSON series.
//!
//! One run is a linear pipeline:
//! - Fetch raw CSV for both instruments concurrently ([`data::PriceSource`])
//! - Parse each body into a date → close map ([`data::parse_closes`])
//! - Load the persisted document ([`store::SeriesStore`])
//! - Merge new dates into it ([`merge::merge`])
//! - Persist the result atomically
//!
//! [`pipeline::run_once`] wires the steps together.

pub mod config;
pub mod data;
pub mod domain;
pub mod merge;
pub mod pipeline;
pub mod store;

pub use config::{ConfigError, IngestConfig, ResumePolicy, Symbols};
pub use domain::{Instrument, ObservationRow, PriceMap, SeriesDocument};
pub use merge::{merge, MergeError, MergeOutcome, MergeReport};
pub use pipeline::{run_once, IngestError, RunSummary};
pub use store::{SeriesStatus, SeriesStore, StoreError};
