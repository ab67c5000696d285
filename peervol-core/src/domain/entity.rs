//! Entity records: one row of the peer universe.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A listed entity eligible to be a target or a peer.
///
/// `listing_date` is not optional: records without one never enter the
/// universe, so the universe is not biased toward entities that survived long
/// enough to have complete data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub ticker: String,
    pub listing_date: NaiveDate,
    /// Sector classification code (e.g. GICS sector "45").
    pub sector: String,
    /// Valuation metric used for distance ranking (e.g. quarterly market value).
    /// `NaN` when unknown.
    pub valuation: f64,
    /// Fundamentals report (disclosure) dates.
    pub report_dates: Vec<NaiveDate>,
}

impl EntityRecord {
    pub fn new(
        ticker: impl Into<String>,
        listing_date: NaiveDate,
        sector: impl Into<String>,
        valuation: f64,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            listing_date,
            sector: sector.into(),
            valuation,
            report_dates: Vec::new(),
        }
    }

    pub fn with_report_date(mut self, date: NaiveDate) -> Self {
        self.report_dates.push(date);
        self
    }

    /// Most recent fundamentals report date, if any report exists.
    pub fn latest_report_date(&self) -> Option<NaiveDate> {
        self.report_dates.iter().max().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_report_date_is_max() {
        let e = EntityRecord::new("ABC", NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), "45", 1.0)
            .with_report_date(NaiveDate::from_ymd_opt(2021, 5, 1).unwrap())
            .with_report_date(NaiveDate::from_ymd_opt(2020, 5, 1).unwrap());
        assert_eq!(
            e.latest_report_date(),
            NaiveDate::from_ymd_opt(2021, 5, 1)
        );
    }

    #[test]
    fn no_reports_means_no_latest_date() {
        let e = EntityRecord::new("ABC", NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), "45", 1.0);
        assert!(e.latest_report_date().is_none());
    }
}
