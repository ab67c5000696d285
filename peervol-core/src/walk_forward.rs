//! Walk-forward retraining forecaster.
//!
//! Builds a feature frame of `(actual, lag_actual, peer_reference)` rows and, for
//! every step `t` in `window_size..len`, refits OLS from scratch on the
//! half-open window `[t - window_size, t)` and predicts row `t`:
//!
//! ```text
//! actual[t] ~ b0 + b1 * lag_actual[t] + b2 * peer_reference[t]
//! ```
//!
//! The fit for step `t` never sees row `t` or later. Steps are independent, so
//! they may be fitted on the rayon pool; output order and values are the same
//! either way.

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{ForecastRecord, Series};
use crate::regression::{OlsFit, RegressionError};

// ─── Configuration ───────────────────────────────────────────────────

/// What to do when a training window produces a rank-deficient fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Use the minimum-norm coefficients and carry on.
    #[default]
    Proceed,
    /// Same as `Proceed`, but log a warning per degenerate step.
    Warn,
    /// Fail with `ForecastError::DegenerateWindow`.
    Reject,
}

/// Configuration for the walk-forward loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub degenerate_policy: DegeneratePolicy,
    /// Fit steps on the rayon pool (default false).
    pub parallel: bool,
}

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForecastError {
    #[error("window size must be positive")]
    InvalidWindow,

    #[error("insufficient data: need {required} aligned rows, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("degenerate fit at step {step}: design rank {rank} < 3")]
    DegenerateWindow { step: usize, rank: usize },

    #[error("regression error: {0}")]
    Regression(#[from] RegressionError),
}

// ─── Feature frame ───────────────────────────────────────────────────

/// One aligned observation. Every value is finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow<K> {
    pub timestamp: K,
    pub actual: f64,
    pub lag_actual: f64,
    pub peer_reference: f64,
}

impl<K> FeatureRow<K> {
    fn regressors(&self) -> [f64; 2] {
        [self.lag_actual, self.peer_reference]
    }
}

/// Aligned model input: target, its one-step lag, and the peer reference.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame<K> {
    rows: Vec<FeatureRow<K>>,
}

impl<K: Ord + Copy> FeatureFrame<K> {
    /// Lag `actual` by one position on its own index, inner-join with
    /// `peer_reference` on timestamp, and drop rows with any missing value.
    pub fn build(actual: &Series<K>, peer_reference: &Series<K>) -> Self {
        let lagged = actual.lag(1);
        let (a_idx, p_idx) = (actual.index(), peer_reference.index());
        let mut rows = Vec::with_capacity(a_idx.len().min(p_idx.len()));

        let (mut i, mut j) = (0, 0);
        while i < a_idx.len() && j < p_idx.len() {
            match a_idx[i].cmp(&p_idx[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    let row = FeatureRow {
                        timestamp: a_idx[i],
                        actual: actual.values()[i],
                        lag_actual: lagged.values()[i],
                        peer_reference: peer_reference.values()[j],
                    };
                    if row.actual.is_finite()
                        && row.lag_actual.is_finite()
                        && row.peer_reference.is_finite()
                    {
                        rows.push(row);
                    }
                    i += 1;
                    j += 1;
                }
            }
        }

        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow<K>] {
        &self.rows
    }

    /// Training rows for a step: exactly the rows in `[train_start, train_end)`.
    pub fn training_rows(&self, step: &StepSpec) -> &[FeatureRow<K>] {
        &self.rows[step.train_start..step.train_end]
    }
}

// ─── Steps ───────────────────────────────────────────────────────────

/// Index ranges for one walk-forward step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    /// Row being forecast.
    pub step: usize,
    /// Training start row (inclusive).
    pub train_start: usize,
    /// Training end row (exclusive). Always equal to `step`.
    pub train_end: usize,
}

/// Create one step per forecastable row: `window_size..total_rows`.
pub fn create_steps(total_rows: usize, window_size: usize) -> Result<Vec<StepSpec>, ForecastError> {
    if window_size == 0 {
        return Err(ForecastError::InvalidWindow);
    }
    let required = window_size + 1;
    if total_rows < required {
        return Err(ForecastError::InsufficientData {
            required,
            available: total_rows,
        });
    }

    Ok((window_size..total_rows)
        .map(|step| StepSpec {
            step,
            train_start: step - window_size,
            train_end: step,
        })
        .collect())
}

// ─── Results ─────────────────────────────────────────────────────────

/// Fit diagnostics for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFit<K> {
    pub step: usize,
    pub timestamp: K,
    /// `[intercept, lag_actual slope, peer_reference slope]`.
    pub coefficients: Vec<f64>,
    pub rank: usize,
}

impl<K> StepFit<K> {
    pub fn is_degenerate(&self) -> bool {
        self.rank < self.coefficients.len()
    }
}

/// Complete output of a walk-forward run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardRun<K> {
    pub records: Vec<ForecastRecord<K>>,
    pub fits: Vec<StepFit<K>>,
    /// Aligned rows available after preprocessing.
    pub aligned_rows: usize,
}

impl<K> WalkForwardRun<K> {
    /// Steps whose training window was rank-deficient.
    pub fn degenerate_steps(&self) -> Vec<usize> {
        self.fits
            .iter()
            .filter(|f| f.is_degenerate())
            .map(|f| f.step)
            .collect()
    }
}

// ─── Forecaster ──────────────────────────────────────────────────────

/// Walk-forward forecaster with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct WalkForwardForecaster {
    config: ForecastConfig,
}

impl WalkForwardForecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Run the walk-forward loop and return records plus per-step fits.
    pub fn run<K>(
        &self,
        actual: &Series<K>,
        peer_reference: &Series<K>,
        window_size: usize,
    ) -> Result<WalkForwardRun<K>, ForecastError>
    where
        K: Ord + Copy + Send + Sync,
    {
        if window_size == 0 {
            return Err(ForecastError::InvalidWindow);
        }

        let frame = FeatureFrame::build(actual, peer_reference);
        let steps = create_steps(frame.len(), window_size)?;
        debug!(
            aligned_rows = frame.len(),
            steps = steps.len(),
            window_size,
            parallel = self.config.parallel,
            "walk-forward start"
        );

        let outcomes: Vec<(ForecastRecord<K>, StepFit<K>)> = if self.config.parallel {
            steps
                .par_iter()
                .map(|step| fit_step(&frame, step))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            steps
                .iter()
                .map(|step| fit_step(&frame, step))
                .collect::<Result<Vec<_>, _>>()?
        };

        // Policy is applied in step order so warnings and errors are deterministic.
        for (_, fit) in &outcomes {
            if !fit.is_degenerate() {
                continue;
            }
            match self.config.degenerate_policy {
                DegeneratePolicy::Proceed => {}
                DegeneratePolicy::Warn => {
                    warn!(step = fit.step, rank = fit.rank, "rank-deficient training window");
                }
                DegeneratePolicy::Reject => {
                    return Err(ForecastError::DegenerateWindow {
                        step: fit.step,
                        rank: fit.rank,
                    });
                }
            }
        }

        let (records, fits) = outcomes.into_iter().unzip();
        Ok(WalkForwardRun {
            records,
            fits,
            aligned_rows: frame.len(),
        })
    }

    /// Run the walk-forward loop and return only the forecast records.
    pub fn forecast<K>(
        &self,
        actual: &Series<K>,
        peer_reference: &Series<K>,
        window_size: usize,
    ) -> Result<Vec<ForecastRecord<K>>, ForecastError>
    where
        K: Ord + Copy + Send + Sync,
    {
        Ok(self.run(actual, peer_reference, window_size)?.records)
    }
}

/// Forecast `actual` one step ahead at every row after the first `window_size`.
pub fn forecast<K>(
    actual: &Series<K>,
    peer_reference: &Series<K>,
    window_size: usize,
    config: &ForecastConfig,
) -> Result<Vec<ForecastRecord<K>>, ForecastError>
where
    K: Ord + Copy + Send + Sync,
{
    WalkForwardForecaster::new(config.clone()).forecast(actual, peer_reference, window_size)
}

/// Fit one training window from scratch and predict its step row.
fn fit_step<K: Ord + Copy>(
    frame: &FeatureFrame<K>,
    step: &StepSpec,
) -> Result<(ForecastRecord<K>, StepFit<K>), ForecastError> {
    let train = frame.training_rows(step);

    let mut x = Array2::<f64>::zeros((train.len(), 2));
    let mut y = Array1::<f64>::zeros(train.len());
    for (i, row) in train.iter().enumerate() {
        x[[i, 0]] = row.lag_actual;
        x[[i, 1]] = row.peer_reference;
        y[i] = row.actual;
    }

    let fit = OlsFit::fit(x.view(), y.view())?;
    let test = &frame.rows()[step.step];
    let forecast = fit.predict(&test.regressors())?;

    Ok((
        ForecastRecord {
            timestamp: test.timestamp,
            actual: test.actual,
            forecast,
        },
        StepFit {
            step: step.step,
            timestamp: test.timestamp,
            coefficients: fit.coefficients,
            rank: fit.rank,
        },
    ))
}
