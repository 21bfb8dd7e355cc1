//! Series transforms used around model fitting

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Difference a series `d` times
///
/// Each pass shortens the series by one element; differencing a series that
/// runs out of elements yields an empty vector.
pub fn difference(data: &[f64], d: usize) -> Vec<f64> {
    let mut result = data.to_vec();
    for _ in 0..d {
        if result.len() < 2 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Undo `d` rounds of differencing for values that continue `history`
///
/// `increments` are values on the `d`-times differenced scale that follow the
/// end of `history`; the result is on the original scale of `history`.
pub fn integrate(increments: &[f64], history: &[f64], d: usize) -> Result<Vec<f64>> {
    if d == 0 {
        return Ok(increments.to_vec());
    }
    if history.len() < d {
        return Err(MathError::InsufficientData(format!(
            "Integrating {} times needs at least {} history values, got {}",
            d,
            d,
            history.len()
        )));
    }

    // levels[k] is history differenced k times
    let mut levels = vec![history.to_vec()];
    for _ in 1..d {
        let next = difference(&levels[levels.len() - 1], 1);
        levels.push(next);
    }

    let mut values = increments.to_vec();
    for level in levels.iter().rev() {
        let mut acc = level[level.len() - 1];
        values = values
            .iter()
            .map(|v| {
                acc += v;
                acc
            })
            .collect();
    }

    Ok(values)
}

/// Scales values linearly so the fitted range maps onto `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    range: f64,
}

impl MinMaxScaler {
    /// Fit the scaler to the observed range of `data`
    pub fn fit(data: &[f64]) -> Result<Self> {
        if data.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot fit a scaler on an empty series".to_string(),
            ));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Cannot fit a scaler on non-finite values".to_string(),
            ));
        }

        let min = data.iter().copied().fold(f64::INFINITY, f64::min);
        let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = if max - min > f64::EPSILON { max - min } else { 1.0 };

        Ok(Self { min, range })
    }

    /// Map a value onto the scaled range
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.range
    }

    /// Map a scaled value back onto the original range
    pub fn inverse(&self, value: f64) -> f64 {
        value * self.range + self.min
    }

    /// Scale every value of a slice
    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.transform(v)).collect()
    }
}
