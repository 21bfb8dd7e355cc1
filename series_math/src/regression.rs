//! Ordinary least squares
//!
//! Solves `min ||X b - y||²` through the normal equations `X'X b = X'y` with a
//! Cholesky factorization. A design matrix whose columns are linearly
//! dependent (for example a constant regressor next to a constant series)
//! has no positive-definite `X'X` and is reported as a calculation error.

use crate::{MathError, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Smallest accepted squared ratio between the extreme Cholesky pivots
const CONDITION_LIMIT: f64 = 1e-12;

/// Result of a least squares fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeastSquaresFit {
    /// Estimated coefficients, one per design column
    pub coefficients: Vec<f64>,
    /// In-sample residuals `y - X b`, one per design row
    pub residuals: Vec<f64>,
}

impl LeastSquaresFit {
    /// Residual sum of squares
    pub fn residual_sum_of_squares(&self) -> f64 {
        self.residuals.iter().map(|r| r * r).sum()
    }
}

/// Fit `target ≈ design · b` where `design` is a row-major `rows × cols` matrix
pub fn least_squares(design: &[f64], cols: usize, target: &[f64]) -> Result<LeastSquaresFit> {
    if cols == 0 {
        return Err(MathError::InvalidInput(
            "Design matrix needs at least one column".to_string(),
        ));
    }
    let rows = target.len();
    if design.len() != rows * cols {
        return Err(MathError::InvalidInput(format!(
            "Design matrix has {} cells, expected {} rows x {} columns",
            design.len(),
            rows,
            cols
        )));
    }
    if rows < cols {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} observations to estimate {} coefficients, got {}",
            cols, cols, rows
        )));
    }
    if design.iter().chain(target.iter()).any(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(
            "Least squares input contains non-finite values".to_string(),
        ));
    }

    let x = DMatrix::from_row_slice(rows, cols, design);
    let y = DVector::from_column_slice(target);

    // Unit-norm columns keep the pivot ratio independent of the data's units
    let norms = DVector::from_iterator(cols, x.column_iter().map(|c| c.norm()));
    if norms.iter().any(|&n| n == 0.0) {
        return Err(MathError::CalculationError(
            "Design matrix has an all-zero column".to_string(),
        ));
    }
    let mut scaled = x.clone();
    for (mut column, norm) in scaled.column_iter_mut().zip(norms.iter()) {
        column /= *norm;
    }

    let xtx = scaled.transpose() * &scaled;
    let xty = scaled.transpose() * &y;

    let cholesky = xtx.cholesky().ok_or_else(|| {
        MathError::CalculationError(
            "Normal equations are singular; regressors are collinear".to_string(),
        )
    })?;

    // Rounding can leave a tiny positive pivot on a rank-deficient X'X
    let pivots = cholesky.l().diagonal();
    let max_pivot = pivots.iter().fold(0.0_f64, |acc, p| acc.max(p.abs()));
    let min_pivot = pivots.iter().fold(f64::INFINITY, |acc, p| acc.min(p.abs()));
    if max_pivot == 0.0 || (min_pivot / max_pivot).powi(2) < CONDITION_LIMIT {
        return Err(MathError::CalculationError(
            "Normal equations are numerically singular; regressors are collinear".to_string(),
        ));
    }

    let beta = cholesky.solve(&xty).component_div(&norms);

    if beta.iter().any(|b| !b.is_finite()) {
        return Err(MathError::CalculationError(
            "Least squares produced non-finite coefficients".to_string(),
        ));
    }

    let fitted = &x * &beta;
    let residuals = (&y - fitted).iter().copied().collect();

    Ok(LeastSquaresFit {
        coefficients: beta.iter().copied().collect(),
        residuals,
    })
}
