//! Forecast skill against a naive persistence baseline.
//!
//! Pure functions: forecast records in, error statistics out.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ForecastRecord;

/// Model error, baseline error, and relative improvement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillReport {
    /// RMSE of the model forecast against the actual values.
    pub model_error: f64,
    /// RMSE of the persistence baseline against the actual values.
    pub baseline_error: f64,
    /// `(baseline_error - model_error) / baseline_error`. Positive beats the baseline.
    pub skill_score: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum SkillError {
    #[error("need at least 2 forecast records to form a baseline, got {available}")]
    InsufficientRecords { available: usize },

    #[error("skill score undefined: baseline error is zero (model error {model_error})")]
    UndefinedSkill { model_error: f64 },
}

/// Evaluate forecast records against the persistence baseline.
///
/// The baseline at position `i` is the actual value at `i - 1`. Position 0 has no
/// predecessor and is back-filled with the next baseline value, `actual[0]`, so
/// no row is dropped.
pub fn evaluate<K>(records: &[ForecastRecord<K>]) -> Result<SkillReport, SkillError> {
    if records.len() < 2 {
        return Err(SkillError::InsufficientRecords {
            available: records.len(),
        });
    }

    let actual: Vec<f64> = records.iter().map(|r| r.actual).collect();
    let predicted: Vec<f64> = records.iter().map(|r| r.forecast).collect();
    let baseline = persistence_baseline(&actual);

    let model_error = rmse(&actual, &predicted);
    let baseline_error = rmse(&actual, &baseline);

    if baseline_error == 0.0 {
        return Err(SkillError::UndefinedSkill { model_error });
    }

    Ok(SkillReport {
        model_error,
        baseline_error,
        skill_score: (baseline_error - model_error) / baseline_error,
    })
}

/// Previous-value forecast, with the first position back-filled.
pub fn persistence_baseline(actual: &[f64]) -> Vec<f64> {
    match actual.first() {
        None => Vec::new(),
        Some(&first) => std::iter::once(first)
            .chain(actual[..actual.len() - 1].iter().copied())
            .collect(),
    }
}

/// Root-mean-squared error. Returns NaN for empty input.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return f64::NAN;
    }
    let sse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    (sse / n as f64).sqrt()
}
