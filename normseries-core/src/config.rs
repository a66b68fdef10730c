//! Ingestion configuration.
//!
//! Every field has a compiled-in default, so running without a config file
//! reproduces the stock behaviour: VOO and QQQ from Stooq, normalized against
//! 2025-10-15, written to `data/series.json`. A TOML file may override any
//! subset of fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::domain::Instrument;

/// Placeholder substituted with the source symbol in [`IngestConfig::url_template`].
pub const SYMBOL_PLACEHOLDER: &str = "{symbol}";

const DEFAULT_URL_TEMPLATE: &str = "https://stooq.com/q/d/l/?s={symbol}&i=d";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
const DEFAULT_OUTPUT: &str = "data/series.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Date whose close is normalized to 1.0.
pub fn default_base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 15).expect("2025-10-15 is a valid date")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where appending resumes relative to the last persisted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResumePolicy {
    /// Append candidates strictly after the last persisted date, even if that
    /// date has disappeared from the fetched history.
    #[default]
    AfterLast,
    /// Fail when the last persisted date is missing from the fetched history.
    Strict,
}

/// Source-specific symbol per tracked instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Symbols {
    pub voo: String,
    pub qqq: String,
}

impl Symbols {
    pub fn get(&self, instrument: Instrument) -> &str {
        match instrument {
            Instrument::Voo => &self.voo,
            Instrument::Qqq => &self.qqq,
        }
    }
}

impl Default for Symbols {
    fn default() -> Self {
        Self {
            voo: "voo.us".into(),
            qqq: "qqq.us".into(),
        }
    }
}

/// Full configuration for one ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Normalization base date. Only used when the document is created; an
    /// existing document keeps its own.
    pub base_date: NaiveDate,
    /// Path of the persisted JSON document.
    pub output: PathBuf,
    /// Download URL with a `{symbol}` placeholder.
    pub url_template: String,
    pub user_agent: String,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
    pub resume: ResumePolicy,
    pub symbols: Symbols,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            base_date: default_base_date(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            url_template: DEFAULT_URL_TEMPLATE.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            resume: ResumePolicy::default(),
            symbols: Symbols::default(),
        }
    }
}

impl IngestConfig {
    /// Load a config from a TOML file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.url_template.contains(SYMBOL_PLACEHOLDER) {
            return Err(ConfigError::Invalid(format!(
                "url_template must contain {SYMBOL_PLACEHOLDER}: {}",
                self.url_template
            )));
        }
        for instrument in Instrument::ALL {
            if self.symbols.get(instrument).trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "symbol for {instrument} is empty"
                )));
            }
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output path is empty".into()));
        }
        Ok(())
    }

    /// Download URL for a source symbol.
    pub fn source_url(&self, symbol: &str) -> String {
        self.url_template.replace(SYMBOL_PLACEHOLDER, symbol)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
