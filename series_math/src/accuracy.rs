//! Squared-error accuracy metrics
//!
//! Every function compares an `actual` slice against a `predicted` slice of the
//! same, non-zero length.

use crate::{MathError, Result};

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot score an empty series".to_string(),
        ));
    }
    if actual.len() != predicted.len() {
        return Err(MathError::InvalidInput(format!(
            "Actual length ({}) doesn't match predicted length ({})",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

/// Sum of squared differences between actual and predicted values
pub fn sum_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;

    Ok(actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum())
}

/// Mean squared error
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    let sse = sum_squared_error(actual, predicted)?;
    Ok(sse / actual.len() as f64)
}

/// Root mean squared error
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    Ok(mean_squared_error(actual, predicted)?.sqrt())
}
