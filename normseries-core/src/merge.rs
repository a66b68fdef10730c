//! Merge freshly parsed closes into the persisted document.
//!
//! Candidate dates are the intersection of both instruments' dates on or
//! after the base date. Where appending resumes is governed by
//! [`ResumePolicy`]; rows already persisted are never rewritten.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ResumePolicy;
use crate::domain::{
    is_valid_close, normalize, Instrument, ObservationRow, PriceMap, SeriesDocument,
};

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("last persisted date {last_date} is no longer present in the fetched history")]
    LastDateMissing { last_date: NaiveDate },
}

/// What a merge did to the document.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The base-date close is not yet published for these instruments.
    BasePending { missing: Vec<Instrument> },
    /// Nothing new past the last persisted row.
    NoNewRows,
    Appended { count: usize, last: NaiveDate },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub outcome: MergeOutcome,
    /// Base closes that were null before this merge and are now set.
    pub base_filled: Vec<Instrument>,
}

impl MergeReport {
    /// Whether the document differs from what was loaded and should be saved.
    ///
    /// A pending base date is always saved, matching a first run that only
    /// creates the document.
    pub fn needs_save(&self) -> bool {
        match self.outcome {
            MergeOutcome::BasePending { .. } | MergeOutcome::Appended { .. } => true,
            MergeOutcome::NoNewRows => !self.base_filled.is_empty(),
        }
    }
}

/// Merge price maps into `doc` in place.
///
/// On error the document may already have base closes filled in memory; the
/// caller must not persist it.
pub fn merge(
    doc: &mut SeriesDocument,
    voo: &PriceMap,
    qqq: &PriceMap,
    policy: ResumePolicy,
) -> Result<MergeReport, MergeError> {
    let base_filled = fill_base_closes(doc, voo, qqq);

    let missing: Vec<Instrument> = Instrument::ALL
        .into_iter()
        .filter(|i| doc.base_close(*i).is_none())
        .collect();
    let (Some(voo_base), Some(qqq_base)) = (doc.voo_base_close, doc.qqq_base_close) else {
        return Ok(MergeReport {
            outcome: MergeOutcome::BasePending { missing },
            base_filled,
        });
    };

    let candidates = candidate_dates(voo, qqq, doc.base_date);
    let start = start_index(&candidates, doc.last_date(), policy)?;

    let mut rows = Vec::new();
    for date in &candidates[start..] {
        let (Some(&voo_close), Some(&qqq_close)) = (voo.get(date), qqq.get(date)) else {
            continue;
        };
        if !is_valid_close(voo_close) || !is_valid_close(qqq_close) {
            debug!(%date, voo_close, qqq_close, "skipping date with invalid close");
            continue;
        }
        let voo_n = normalize(voo_close, voo_base);
        let qqq_n = normalize(qqq_close, qqq_base);
        if !voo_n.is_finite() || !qqq_n.is_finite() {
            debug!(%date, voo_n, qqq_n, "skipping date with non-finite normalized value");
            continue;
        }
        rows.push(ObservationRow {
            date: *date,
            voo_close,
            qqq_close,
            voo_n,
            qqq_n,
        });
    }

    let outcome = match rows.last() {
        None => MergeOutcome::NoNewRows,
        Some(last) => MergeOutcome::Appended {
            count: rows.len(),
            last: last.date,
        },
    };
    doc.series.extend(rows);

    Ok(MergeReport {
        outcome,
        base_filled,
    })
}

/// Set any null base close from the base-date entry of its map. Returns the
/// instruments that were filled.
fn fill_base_closes(doc: &mut SeriesDocument, voo: &PriceMap, qqq: &PriceMap) -> Vec<Instrument> {
    let base_date = doc.base_date;
    let mut filled = Vec::new();

    for (instrument, closes) in [(Instrument::Voo, voo), (Instrument::Qqq, qqq)] {
        let slot = doc.base_close_mut(instrument);
        if slot.is_some() {
            continue;
        }
        if let Some(&close) = closes.get(&base_date).filter(|c| is_valid_close(**c)) {
            *slot = Some(close);
            filled.push(instrument);
        }
    }
    filled
}

/// Dates present in both maps, on or after `base_date`, ascending.
pub fn candidate_dates(voo: &PriceMap, qqq: &PriceMap, base_date: NaiveDate) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = voo
        .keys()
        .filter(|d| **d >= base_date && qqq.contains_key(*d))
        .copied()
        .collect();
    dates.sort_unstable();
    dates
}

/// Index of the first candidate to consider.
fn start_index(
    candidates: &[NaiveDate],
    last_date: Option<NaiveDate>,
    policy: ResumePolicy,
) -> Result<usize, MergeError> {
    let Some(last_date) = last_date else {
        return Ok(0);
    };

    match candidates.binary_search(&last_date) {
        Ok(idx) => Ok(idx + 1),
        Err(_) => match policy {
            ResumePolicy::Strict => Err(MergeError::LastDateMissing { last_date }),
            ResumePolicy::AfterLast => {
                warn!(%last_date, "last persisted date missing from fetched history; resuming after it");
                Ok(candidates.partition_point(|d| *d <= last_date))
            }
        },
    }
}
