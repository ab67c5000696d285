//! Daily returns panel loaded from CSV.
//!
//! Expected columns: `ticker,date,ret`. The realized-volatility proxy is the
//! absolute daily return. Tickers are cleaned of share-class suffixes on load,
//! so `BRK.B` and `BRK` address the same series. Blank or non-numeric returns
//! (delisting codes and the like) are skipped.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use super::provider::{clean_ticker, DataError, DataSource, SeriesProvider};
use crate::domain::Series;

#[derive(Debug, Deserialize)]
struct ReturnRow {
    ticker: String,
    date: String,
    ret: Option<String>,
}

/// In-memory returns panel acting as the external data source.
#[derive(Debug, Clone, Default)]
pub struct CsvReturnsProvider {
    name: String,
    returns: HashMap<String, BTreeMap<NaiveDate, f64>>,
}

impl CsvReturnsProvider {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        Self::load(reader, "csv".to_string())
    }

    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let file = File::open(path)?;
        Self::load(file, path.display().to_string())
    }

    fn load<R: Read>(reader: R, name: String) -> Result<Self, DataError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut returns: HashMap<String, BTreeMap<NaiveDate, f64>> = HashMap::new();
        let mut skipped = 0usize;
        for (line, row) in rdr.deserialize::<ReturnRow>().enumerate() {
            let row = row?;
            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
                DataError::Parse(format!("row {}: bad date '{}': {e}", line + 2, row.date))
            })?;
            let Some(ret) = row.ret.as_deref().and_then(|r| r.parse::<f64>().ok()) else {
                skipped += 1;
                continue;
            };
            returns
                .entry(clean_ticker(&row.ticker).to_string())
                .or_default()
                .insert(date, ret.abs());
        }

        debug!(
            source = %name,
            tickers = returns.len(),
            skipped,
            "loaded returns panel"
        );
        Ok(Self { name, returns })
    }

    /// Tickers present in the panel, sorted.
    pub fn tickers(&self) -> Vec<&str> {
        let mut tickers: Vec<&str> = self.returns.keys().map(String::as_str).collect();
        tickers.sort_unstable();
        tickers
    }
}

impl SeriesProvider for CsvReturnsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> DataSource {
        DataSource::External
    }

    fn fetch_series(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series<NaiveDate>, DataError> {
        if start > end {
            return Err(DataError::EmptyRange { start, end });
        }
        let key = clean_ticker(ticker);
        let panel = self
            .returns
            .get(key)
            .ok_or_else(|| DataError::TickerNotFound {
                ticker: key.to_string(),
            })?;

        let series = Series::from_points(panel.range(start..=end).map(|(d, v)| (*d, *v)))?;
        if series.is_empty() {
            return Err(DataError::NoData {
                ticker: key.to_string(),
                start,
                end,
            });
        }
        Ok(series)
    }
}
