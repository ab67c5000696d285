//! Walk-forward output records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One out-of-sample forecast: the realized value and the model's prediction
/// for the same timestamp. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord<K = NaiveDate> {
    pub timestamp: K,
    pub actual: f64,
    pub forecast: f64,
}

impl<K> ForecastRecord<K> {
    pub fn error(&self) -> f64 {
        self.forecast - self.actual
    }
}
