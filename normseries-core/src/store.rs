//! JSON persistence for the series document.
//!
//! - A missing file (or directory) loads as a fresh document
//! - An existing file that fails to parse or validate is `Corrupt`; no repair
//! - Writes go to `{file}.tmp` and are renamed into place

use chrono::NaiveDate;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::config::IngestConfig;
use crate::domain::{Instrument, SeriesDocument};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("corrupt state file {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serialize series document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File-backed store for one [`SeriesDocument`].
#[derive(Debug, Clone)]
pub struct SeriesStore {
    path: PathBuf,
    base_date: NaiveDate,
}

impl SeriesStore {
    /// `base_date` seeds the document when no file exists yet.
    pub fn new(path: impl Into<PathBuf>, base_date: NaiveDate) -> Self {
        Self {
            path: path.into(),
            base_date,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(&config.output, config.base_date)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted document, or a fresh one if nothing is stored yet.
    pub fn load(&self) -> Result<SeriesDocument, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file; starting fresh");
                return Ok(SeriesDocument::new(self.base_date));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let doc: SeriesDocument =
            serde_json::from_str(&content).map_err(|e| self.corrupt(e.to_string()))?;
        doc.validate().map_err(|reason| self.corrupt(reason))?;
        Ok(doc)
    }

    /// Overwrite the stored document. Parent directories are created as needed.
    pub fn save(&self, doc: &SeriesDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(doc)?;
        let tmp_path = self.tmp_path();
        write_synced(&tmp_path, json.as_bytes()).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io {
                path: tmp_path.clone(),
                source,
            }
        })?;

        fs::rename(&tmp_path, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io {
                path: self.path.clone(),
                source,
            }
        })?;

        debug!(path = %self.path.display(), rows = doc.series.len(), "saved series");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("series.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn corrupt(&self, reason: String) -> StoreError {
        StoreError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Write `bytes` to `path` and flush them to disk before returning.
fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Read-only summary of a persisted document.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub base_date: NaiveDate,
    pub voo_base_close: Option<f64>,
    pub qqq_base_close: Option<f64>,
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Normalized values on the last row, VOO then QQQ.
    pub latest: Option<(f64, f64)>,
}

impl SeriesStatus {
    pub fn read(store: &SeriesStore) -> Result<Self, StoreError> {
        let exists = store.path().exists();
        let doc = store.load()?;
        let last = doc.series.last();
        Ok(Self {
            path: store.path().to_path_buf(),
            exists,
            base_date: doc.base_date,
            voo_base_close: doc.voo_base_close,
            qqq_base_close: doc.qqq_base_close,
            rows: doc.series.len(),
            first_date: doc.series.first().map(|r| r.date),
            last_date: last.map(|r| r.date),
            latest: last.map(|r| {
                (
                    r.normalized(Instrument::Voo),
                    r.normalized(Instrument::Qqq),
                )
            }),
        })
    }
}

fn fmt_opt<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

impl fmt::Display for SeriesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "State file: {}", self.path.display())?;
        if !self.exists {
            writeln!(f, "  (not created yet)")?;
        }
        writeln!(f, "  Base date:      {}", self.base_date)?;
        writeln!(f, "  VOO base close: {}", fmt_opt(self.voo_base_close))?;
        writeln!(f, "  QQQ base close: {}", fmt_opt(self.qqq_base_close))?;
        writeln!(f, "  Rows:           {}", self.rows)?;
        writeln!(
            f,
            "  Range:          {} .. {}",
            fmt_opt(self.first_date),
            fmt_opt(self.last_date)
        )?;
        if let Some((voo_n, qqq_n)) = self.latest {
            write!(f, "  Latest:         VOO {voo_n:.6}  QQQ {qqq_n:.6}")?;
        }
        Ok(())
    }
}
