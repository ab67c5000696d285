//! Series provider trait and structured error types.
//!
//! The `SeriesProvider` trait abstracts over where realized-volatility series
//! come from (an external returns panel, or the synthetic generator) so the
//! runner can make the fallback decision explicitly and tests can swap sources.
//! Providers are acquired and owned by the caller; nothing in this crate opens
//! or closes a connection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Series, SeriesError};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("ticker not found: {ticker}")]
    TickerNotFound { ticker: String },

    #[error("no observations for '{ticker}' between {start} and {end}")]
    NoData {
        ticker: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("empty date range: start {start} is after end {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed series: {0}")]
    Series(#[from] SeriesError),
}

impl From<csv::Error> for DataError {
    fn from(e: csv::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    External,
    Synthetic,
}

/// A source of per-ticker realized-volatility series.
pub trait SeriesProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Provenance tag for series produced by this provider.
    fn source(&self) -> DataSource;

    /// Daily realized-volatility proxy (absolute return) for `ticker` over the
    /// inclusive range `[start, end]`.
    fn fetch_series(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series<NaiveDate>, DataError>;
}

/// Strip a share-class or exchange suffix: `"BRK.B"` → `"BRK"`.
pub fn clean_ticker(ticker: &str) -> &str {
    ticker.split('.').next().unwrap_or(ticker).trim()
}
