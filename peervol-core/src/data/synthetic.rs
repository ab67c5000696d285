//! Synthetic realized-volatility generator.
//!
//! Stand-in for the external source when it is unavailable and the caller
//! explicitly opts in. Produces the same shape as the external provider: one
//! calendar-daily, strictly positive series per ticker. Draws are exponential
//! with volatility clustering:
//!
//! ```text
//! x[i] = 0.7 * x[i-1] + 0.3 * e[i]    for i >= 2
//! ```
//!
//! The stream is seeded from a BLAKE3 hash of the master seed and the ticker,
//! so a ticker always gets the same series regardless of request order.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{clean_ticker, DataError, DataSource, SeriesProvider};
use crate::domain::Series;

/// Deterministic synthetic series provider.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    master_seed: u64,
    /// Mean of the exponential draws.
    scale: f64,
    /// Weight on the previous value in the clustering recursion.
    persistence: f64,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}

impl SyntheticProvider {
    pub const DEFAULT_SEED: u64 = 42;

    pub fn new(master_seed: u64) -> Self {
        Self {
            master_seed,
            scale: 0.02,
            persistence: 0.7,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    fn rng_for(&self, ticker: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(ticker.as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    /// Generate `n` clustered exponential draws for `ticker`.
    pub fn generate(&self, ticker: &str, n: usize) -> Vec<f64> {
        let mut rng = self.rng_for(clean_ticker(ticker));
        let mut values: Vec<f64> = (0..n)
            .map(|_| {
                let u: f64 = rng.gen();
                -self.scale * (1.0 - u).ln()
            })
            .collect();

        for i in 2..n {
            values[i] = self.persistence * values[i - 1] + (1.0 - self.persistence) * values[i];
        }
        values
    }
}

impl SeriesProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
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
        let dates: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();
        let values = self.generate(ticker, dates.len());
        Ok(Series::new(dates, values)?)
    }
}
