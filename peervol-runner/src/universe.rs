//! Universe ingestion from a Compustat-style fundamentals export.
//!
//! Columns used: `tic`, `ipodate`, `gsector`, `mkvaltq`, `rdq`. Other columns
//! are ignored. Each ticker becomes one `EntityRecord`. Inactive companies are
//! kept so selection does not suffer survivorship bias.
//!
//! Unparseable dates are treated as absent. A row without a listing date is
//! excluded and counted, never given a placeholder date.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use peervol_core::EntityRecord;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("failed to open universe file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed universe CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct UniverseRow {
    tic: Option<String>,
    ipodate: Option<String>,
    gsector: Option<String>,
    mkvaltq: Option<String>,
    rdq: Option<String>,
}

/// Parsed universe plus ingestion counts.
#[derive(Debug, Clone, Default)]
pub struct UniverseLoad {
    pub records: Vec<EntityRecord>,
    /// Data rows read from the file.
    pub rows_read: usize,
    /// Rows dropped because `ipodate` was empty or unparseable.
    pub excluded_without_listing: usize,
    /// Rows dropped because `tic` was empty.
    pub excluded_without_ticker: usize,
    /// Rows folded into an earlier record for the same ticker.
    pub merged_rows: usize,
}

/// Load a universe from any CSV reader.
///
/// Rows are grouped by ticker, in first-appearance order, so a quarterly export
/// yields one record per entity carrying every report date. The listing date is
/// the earliest parseable `ipodate` among the ticker's rows. Sector and
/// valuation come from the row with the latest `rdq` (later rows win ties, and
/// rows without `rdq` rank below any dated row).
pub fn load_universe_csv<R: Read>(reader: R) -> Result<UniverseLoad, UniverseError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut load = UniverseLoad::default();
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut latest_row: Vec<Option<NaiveDate>> = Vec::new();
    for row in rdr.deserialize::<UniverseRow>() {
        let row = row?;
        load.rows_read += 1;

        let Some(ticker) = row.tic.filter(|t| !t.is_empty()) else {
            load.excluded_without_ticker += 1;
            continue;
        };
        let Some(listing_date) = row.ipodate.as_deref().and_then(parse_date) else {
            load.excluded_without_listing += 1;
            continue;
        };

        let sector = row.gsector.as_deref().map(normalize_sector).unwrap_or_default();
        let valuation = row
            .mkvaltq
            .as_deref()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(f64::NAN);
        let report = row.rdq.as_deref().and_then(parse_date);

        match position.get(&ticker).copied() {
            Some(i) => {
                load.merged_rows += 1;
                let record = &mut load.records[i];
                record.listing_date = record.listing_date.min(listing_date);
                if report >= latest_row[i] {
                    record.sector = sector;
                    record.valuation = valuation;
                    latest_row[i] = report;
                }
                if let Some(report) = report {
                    record.report_dates.push(report);
                }
            }
            None => {
                let mut record = EntityRecord::new(ticker.clone(), listing_date, sector, valuation);
                if let Some(report) = report {
                    record = record.with_report_date(report);
                }
                position.insert(ticker, load.records.len());
                latest_row.push(report);
                load.records.push(record);
            }
        }
    }

    info!(
        records = load.records.len(),
        rows = load.rows_read,
        merged = load.merged_rows,
        without_listing = load.excluded_without_listing,
        "loaded universe"
    );
    Ok(load)
}

/// Load a universe from a CSV file on disk.
pub fn load_universe_file(path: &Path) -> Result<UniverseLoad, UniverseError> {
    let file = File::open(path).map_err(|source| UniverseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), "reading universe");
    load_universe_csv(file)
}

/// Accepts `YYYY-MM-DD` and `YYYYMMDD`. Anything else is absent.
fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .ok()
}

/// `"45.0"` and `"45"` are the same sector.
fn normalize_sector(s: &str) -> String {
    match s.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.is_finite() => format!("{}", v as i64),
        _ => s.to_string(),
    }
}
