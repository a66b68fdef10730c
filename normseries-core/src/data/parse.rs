//! CSV → date/close map.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::debug;

use crate::domain::PriceMap;

/// Value Stooq writes in place of a missing price.
pub const NULL_SENTINEL: &str = "NULL";

/// Body Stooq returns for an unknown symbol.
const NO_DATA_BODY: &str = "No data";

const DATE_COLUMN: &str = "Date";
const CLOSE_COLUMN: &str = "Close";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no data returned for symbol '{symbol}'")]
    NoData { symbol: String },

    #[error("CSV header for '{symbol}' has no '{column}' column")]
    MissingColumn {
        symbol: String,
        column: &'static str,
    },

    #[error("malformed CSV for '{symbol}': {source}")]
    Csv {
        symbol: String,
        #[source]
        source: csv::Error,
    },
}

/// Parse a daily history CSV into closes keyed by date.
///
/// Rows with an empty or unparseable date, or an empty, `NULL` or
/// non-numeric close, are dropped. Close values are otherwise taken as
/// reported; positivity is checked at merge time. Input order does not
/// matter.
pub fn parse_closes(symbol: &str, text: &str) -> Result<PriceMap, ParseError> {
    let body = text.trim();
    if body.is_empty() || body.eq_ignore_ascii_case(NO_DATA_BODY) {
        return Err(ParseError::NoData {
            symbol: symbol.to_string(),
        });
    }

    let csv_err = |source: csv::Error| ParseError::Csv {
        symbol: symbol.to_string(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader.headers().map_err(csv_err)?.clone();
    let date_idx = column_index(symbol, &headers, DATE_COLUMN)?;
    let close_idx = column_index(symbol, &headers, CLOSE_COLUMN)?;

    let mut closes = PriceMap::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        match parse_row(&record, date_idx, close_idx) {
            Some((date, close)) => {
                closes.insert(date, close);
            }
            None => skipped += 1,
        }
    }

    debug!(symbol, rows = closes.len(), skipped, "parsed closes");
    Ok(closes)
}

fn column_index(
    symbol: &str,
    headers: &StringRecord,
    column: &'static str,
) -> Result<usize, ParseError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(column))
        .ok_or_else(|| ParseError::MissingColumn {
            symbol: symbol.to_string(),
            column,
        })
}

fn parse_row(record: &StringRecord, date_idx: usize, close_idx: usize) -> Option<(NaiveDate, f64)> {
    let date = record.get(date_idx).filter(|d| !d.is_empty())?;
    let close = record
        .get(close_idx)
        .filter(|c| !c.is_empty() && *c != NULL_SENTINEL)?;

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let close = close.parse::<f64>().ok()?;
    Some((date, close))
}
