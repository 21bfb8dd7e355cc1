//! Scoring of weekly forecasts
//!
//! Every strategy is scored by the same routine so results are comparable.
//! The aggregate RMSE divides the total squared error by the number of
//! (week, day) cells, so it is a true RMSE over the whole evaluation window.

use crate::error::{ForecastError, Result};
use series_math::{root_mean_squared_error, sum_squared_error};
use serde::Serialize;
use std::fmt;

/// Forecast accuracy of one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    /// RMSE over every (week, day) pair
    pub overall: f64,
    /// RMSE of each forecast day across all weeks
    pub per_day: Vec<f64>,
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days: Vec<String> = self.per_day.iter().map(|s| format!("{:.1}", s)).collect();
        write!(f, "[{:.3}] {}", self.overall, days.join(", "))
    }
}

/// Score predicted weeks against actual weeks
///
/// Both arguments are row-per-week matrices of equal shape.
pub fn evaluate_forecasts(actual: &[Vec<f64>], predicted: &[Vec<f64>]) -> Result<Score> {
    if actual.is_empty() {
        return Err(ForecastError::EmptyEvaluation);
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::Validation(format!(
            "{} actual weeks but {} predicted weeks",
            actual.len(),
            predicted.len()
        )));
    }

    let days = actual[0].len();
    if days == 0 {
        return Err(ForecastError::EmptyEvaluation);
    }
    for (week, (a, p)) in actual.iter().zip(predicted.iter()).enumerate() {
        if a.len() != days || p.len() != days {
            return Err(ForecastError::Validation(format!(
                "Week {} has {} actual and {} predicted days, expected {}",
                week + 1,
                a.len(),
                p.len(),
                days
            )));
        }
    }

    let mut per_day = Vec::with_capacity(days);
    for day in 0..days {
        let actual_day: Vec<f64> = actual.iter().map(|week| week[day]).collect();
        let predicted_day: Vec<f64> = predicted.iter().map(|week| week[day]).collect();
        per_day.push(root_mean_squared_error(&actual_day, &predicted_day)?);
    }

    let mut total = 0.0;
    for (a, p) in actual.iter().zip(predicted.iter()) {
        total += sum_squared_error(a, p)?;
    }
    let overall = (total / (actual.len() * days) as f64).sqrt();

    Ok(Score { overall, per_day })
}

/// Render a score as `name: [overall] day1, ..., day7`
pub fn summarize_scores(name: &str, score: &Score) -> String {
    format!("{}: {}", name, score)
}
