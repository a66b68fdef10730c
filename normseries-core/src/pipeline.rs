//! One ingestion run: fetch → parse → load → merge → save.

use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::data::{fetch_pair, parse_closes, FetchError, ParseError, PriceSource};
use crate::merge::{merge, MergeError, MergeOutcome};
use crate::store::{SeriesStore, StoreError};

/// Any failure that aborts a run. Nothing is persisted when one occurs.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub outcome: MergeOutcome,
    /// Whether the document was written this run.
    pub persisted: bool,
    pub total_rows: usize,
    pub path: PathBuf,
}

/// Run one ingestion pass.
///
/// Safe to repeat within a period: a run that finds nothing new leaves the
/// file untouched. With `dry_run` the merge is computed but never saved.
pub fn run_once(
    config: &IngestConfig,
    source: &dyn PriceSource,
    dry_run: bool,
) -> Result<RunSummary, IngestError> {
    let fetched = fetch_pair(source, &config.symbols)?;
    let voo = parse_closes(&config.symbols.voo, &fetched.voo)?;
    let qqq = parse_closes(&config.symbols.qqq, &fetched.qqq)?;

    let store = SeriesStore::from_config(config);
    let mut doc = store.load()?;
    if doc.base_date != config.base_date {
        warn!(
            stored = %doc.base_date,
            configured = %config.base_date,
            "stored base date differs from configuration; keeping stored"
        );
    }

    let report = merge(&mut doc, &voo, &qqq, config.resume)?;

    match &report.outcome {
        MergeOutcome::BasePending { missing } => warn!(
            base_date = %doc.base_date,
            ?missing,
            "base close missing for base date; will wait until available"
        ),
        MergeOutcome::NoNewRows => info!("no new rows to append"),
        MergeOutcome::Appended { count, last } => {
            info!(count, last = %last, "appended rows")
        }
    }

    let persisted = report.needs_save() && !dry_run;
    if persisted {
        store.save(&doc)?;
    } else if dry_run && report.needs_save() {
        info!(path = %store.path().display(), "dry run; not saving");
    }

    Ok(RunSummary {
        outcome: report.outcome,
        persisted,
        total_rows: doc.series.len(),
        path: store.path().to_path_buf(),
    })
}
