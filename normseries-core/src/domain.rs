//! Domain types: instruments, price maps and the persisted series document.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Decimal places kept in normalized values.
pub const NORMALIZED_PLACES: i32 = 6;

/// Date → closing price for one instrument. Key-unique, unordered.
pub type PriceMap = HashMap<NaiveDate, f64>;

/// One of the two tracked instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    Voo,
    Qqq,
}

impl Instrument {
    pub const ALL: [Instrument; 2] = [Instrument::Voo, Instrument::Qqq];

    pub fn ticker(self) -> &'static str {
        match self {
            Instrument::Voo => "VOO",
            Instrument::Qqq => "QQQ",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ticker())
    }
}

/// A close is usable only if it is a positive, finite number.
pub fn is_valid_close(close: f64) -> bool {
    close.is_finite() && close > 0.0
}

/// Round half away from zero to `places` decimal places.
///
/// Values too large to scale are already integral and come back unchanged.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// `close / base_close`, rounded to [`NORMALIZED_PLACES`].
pub fn normalize(close: f64, base_close: f64) -> f64 {
    round_to(close / base_close, NORMALIZED_PLACES)
}

/// One appended observation: both closes and both normalized values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRow {
    pub date: NaiveDate,
    pub voo_close: f64,
    pub qqq_close: f64,
    pub voo_n: f64,
    pub qqq_n: f64,
}

impl ObservationRow {
    pub fn close(&self, instrument: Instrument) -> f64 {
        match instrument {
            Instrument::Voo => self.voo_close,
            Instrument::Qqq => self.qqq_close,
        }
    }

    pub fn normalized(&self, instrument: Instrument) -> f64 {
        match instrument {
            Instrument::Voo => self.voo_n,
            Instrument::Qqq => self.qqq_n,
        }
    }
}

/// The persisted normalized-series document.
///
/// Base closes are filled at most once; rows are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDocument {
    pub base_date: NaiveDate,
    pub voo_base_close: Option<f64>,
    pub qqq_base_close: Option<f64>,
    #[serde(default)]
    pub series: Vec<ObservationRow>,
}

impl SeriesDocument {
    /// Empty document: no base closes, no rows.
    pub fn new(base_date: NaiveDate) -> Self {
        Self {
            base_date,
            voo_base_close: None,
            qqq_base_close: None,
            series: Vec::new(),
        }
    }

    pub fn base_close(&self, instrument: Instrument) -> Option<f64> {
        match instrument {
            Instrument::Voo => self.voo_base_close,
            Instrument::Qqq => self.qqq_base_close,
        }
    }

    pub(crate) fn base_close_mut(&mut self, instrument: Instrument) -> &mut Option<f64> {
        match instrument {
            Instrument::Voo => &mut self.voo_base_close,
            Instrument::Qqq => &mut self.qqq_base_close,
        }
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.series.last().map(|row| row.date)
    }

    /// Check the structural invariants of a loaded document.
    pub fn validate(&self) -> Result<(), String> {
        for instrument in Instrument::ALL {
            match self.base_close(instrument) {
                Some(base) if !is_valid_close(base) => {
                    return Err(format!("{instrument} base close {base} is not a positive number"));
                }
                None if !self.series.is_empty() => {
                    return Err(format!("series has rows but {instrument} base close is null"));
                }
                _ => {}
            }
        }

        let mut prev: Option<NaiveDate> = None;
        for row in &self.series {
            if row.date < self.base_date {
                return Err(format!(
                    "row {} precedes base date {}",
                    row.date, self.base_date
                ));
            }
            if let Some(prev) = prev {
                if row.date <= prev {
                    return Err(format!(
                        "series not strictly ascending: {} follows {prev}",
                        row.date
                    ));
                }
            }
            for instrument in Instrument::ALL {
                let close = row.close(instrument);
                if !is_valid_close(close) {
                    return Err(format!("row {} has invalid {instrument} close {close}", row.date));
                }
            }
            prev = Some(row.date);
        }
        Ok(())
    }
}
