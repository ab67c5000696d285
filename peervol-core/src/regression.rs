//! Ordinary least squares with an explicit intercept column.
//!
//! Solves the normal equations `XᵀX β = Xᵀy` through a symmetric
//! eigen-decomposition of `XᵀX` (cyclic Jacobi) and its Moore–Penrose
//! pseudo-inverse. Full-rank fits give the classical OLS solution.
//! Rank-deficient fits (a constant regressor, collinear columns, a window
//! shorter than the parameter count) give the minimum-norm least-squares
//! solution instead of failing; the numerical rank is reported so callers can
//! decide what to do about it.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Eigenvalues of `XᵀX` below this fraction of the largest are treated as zero.
///
/// Eigenvalues of `XᵀX` are squared singular values of `X`, so this drops
/// directions whose singular value is below `1e-6` of the largest. That is
/// much coarser than an SVD pseudo-inverse with `rcond = 1e-15`: a window that
/// is nearly collinear but technically full rank is fitted with the
/// minimum-norm solution and reported with reduced rank. Forming `XᵀX` squares
/// the condition number, so a finer cutoff would admit rounding noise from
/// exactly collinear columns as signal.
pub const RANK_TOLERANCE: f64 = 1e-12;

const MAX_SWEEPS: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegressionError {
    #[error("dimension mismatch: {rows} design rows vs {targets} targets")]
    DimensionMismatch { rows: usize, targets: usize },

    #[error("cannot fit on an empty sample")]
    EmptySample,

    #[error("prediction row has {got} regressors, model expects {expected}")]
    RegressorCount { expected: usize, got: usize },
}

/// A fitted OLS model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    /// Intercept first, then one slope per regressor column.
    pub coefficients: Vec<f64>,
    /// Numerical rank of the design matrix (intercept column included).
    pub rank: usize,
}

impl OlsFit {
    /// Fit `y ~ 1 + x`. `x` holds one column per regressor, without an intercept.
    pub fn fit(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<Self, RegressionError> {
        if x.nrows() != y.len() {
            return Err(RegressionError::DimensionMismatch {
                rows: x.nrows(),
                targets: y.len(),
            });
        }
        if y.is_empty() {
            return Err(RegressionError::EmptySample);
        }

        let mut design = Array2::<f64>::ones((x.nrows(), x.ncols() + 1));
        design.slice_mut(s![.., 1..]).assign(&x);

        let xtx = design.t().dot(&design);
        let xty = design.t().dot(&y);

        let (eigenvalues, eigenvectors) = symmetric_eigen(&xtx);
        let largest = eigenvalues.iter().fold(0.0_f64, |m, &v| m.max(v));
        let threshold = largest * RANK_TOLERANCE;

        let mut beta = Array1::<f64>::zeros(xtx.nrows());
        let mut rank = 0;
        for (i, &lambda) in eigenvalues.iter().enumerate() {
            if lambda <= threshold {
                continue;
            }
            rank += 1;
            let v = eigenvectors.column(i);
            let weight = v.dot(&xty) / lambda;
            beta.scaled_add(weight, &v);
        }

        Ok(Self {
            coefficients: beta.to_vec(),
            rank,
        })
    }

    pub fn intercept(&self) -> f64 {
        self.coefficients[0]
    }

    /// Slopes, one per regressor.
    pub fn slopes(&self) -> &[f64] {
        &self.coefficients[1..]
    }

    /// Number of estimated parameters (intercept included).
    pub fn n_params(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_full_rank(&self) -> bool {
        self.rank == self.n_params()
    }

    /// Predict for one row of regressors (no intercept entry).
    pub fn predict(&self, regressors: &[f64]) -> Result<f64, RegressionError> {
        let slopes = self.slopes();
        if regressors.len() != slopes.len() {
            return Err(RegressionError::RegressorCount {
                expected: slopes.len(),
                got: regressors.len(),
            });
        }
        Ok(self.intercept()
            + slopes
                .iter()
                .zip(regressors)
                .map(|(b, x)| b * x)
                .sum::<f64>())
    }
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues and a matrix whose columns are the matching eigenvectors.
fn symmetric_eigen(matrix: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = matrix.nrows();
    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);

    let total: f64 = a.iter().map(|x| x * x).sum();
    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[[p, q]] * a[[p, q]];
            }
        }
        if off <= f64::EPSILON * f64::EPSILON * total {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    (a.diag().to_owned(), v)
}
