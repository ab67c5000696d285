//! Time-indexed numeric series.
//!
//! A `Series` is the unit of exchange between data sources, peer aggregation,
//! and the forecaster. The index is strictly increasing. Non-finite values mark
//! missing observations and stay in place, so positional lags follow the
//! series' own timeline rather than a calendar.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised when a series is constructed from malformed input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    #[error("series index is not strictly increasing at position {position}")]
    NonMonotonicIndex { position: usize },

    #[error("index and values differ in length: {index} vs {values}")]
    LengthMismatch { index: usize, values: usize },
}

/// A numeric series on a strictly increasing index.
///
/// `K` is the time axis: a trading day (`NaiveDate`, the default) or an
/// intraday bucket such as `NaiveDateTime`.
#[derive(Debug, Clone, PartialEq)]
pub struct Series<K = NaiveDate> {
    index: Vec<K>,
    values: Vec<f64>,
}

impl<K: Ord + Copy> Series<K> {
    /// Build a series, rejecting mismatched lengths and unsorted or duplicate keys.
    pub fn new(index: Vec<K>, values: Vec<f64>) -> Result<Self, SeriesError> {
        if index.len() != values.len() {
            return Err(SeriesError::LengthMismatch {
                index: index.len(),
                values: values.len(),
            });
        }
        if let Some(position) = index.windows(2).position(|w| w[0] >= w[1]) {
            return Err(SeriesError::NonMonotonicIndex {
                position: position + 1,
            });
        }
        Ok(Self { index, values })
    }

    /// Build a series from `(key, value)` pairs in index order.
    pub fn from_points<I>(points: I) -> Result<Self, SeriesError>
    where
        I: IntoIterator<Item = (K, f64)>,
    {
        let (index, values): (Vec<K>, Vec<f64>) = points.into_iter().unzip();
        Self::new(index, values)
    }

    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[K] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate `(key, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (K, f64)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }

    /// Value at `key`, if the key is on the index (the value may be missing).
    pub fn get(&self, key: K) -> Option<f64> {
        self.index
            .binary_search(&key)
            .ok()
            .map(|pos| self.values[pos])
    }

    /// Shift values forward by `periods` positions on this series' own index.
    ///
    /// The first `periods` positions become missing. Length and index are unchanged.
    pub fn lag(&self, periods: usize) -> Self {
        let values = (0..self.values.len())
            .map(|i| {
                if i < periods {
                    f64::NAN
                } else {
                    self.values[i - periods]
                }
            })
            .collect();
        Self {
            index: self.index.clone(),
            values,
        }
    }

    /// Drop every position whose value is missing.
    pub fn drop_missing(&self) -> Self {
        let (index, values) = self.iter().filter(|(_, v)| v.is_finite()).unzip();
        Self { index, values }
    }

    /// Number of missing (non-finite) values.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_finite()).count()
    }

    pub fn first_key(&self) -> Option<K> {
        self.index.first().copied()
    }

    pub fn last_key(&self) -> Option<K> {
        self.index.last().copied()
    }
}
