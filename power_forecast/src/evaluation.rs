//! Walk-forward evaluation
//!
//! Each test week is forecast from the history available before it, then
//! revealed and appended to that history before the next week is forecast.

use crate::data::{History, WeekWindow};
use crate::error::{ForecastError, Result};
use crate::metrics::{evaluate_forecasts, summarize_scores, Score};
use crate::models::{ForecastModel, TrainedForecastModel, WeekForecast};
use serde::Serialize;
use tracing::{debug, info};

/// Forecasts and score of one strategy
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    /// Name of the strategy
    pub name: String,
    /// One forecast per test week, in test order
    pub forecasts: Vec<WeekForecast>,
    /// Accuracy against the test weeks
    pub score: Score,
}

impl EvaluationReport {
    /// One-line summary of the score
    pub fn summary(&self) -> String {
        summarize_scores(&self.name, &self.score)
    }

    /// Serialize the report as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Forecast every test week from the history that precedes it
///
/// The history starts as a copy of `train`; test week `i` is appended only
/// after forecast `i` has been produced.
pub fn walk_forward<T>(
    trained: &T,
    train: &[WeekWindow],
    test: &[WeekWindow],
) -> Result<Vec<WeekForecast>>
where
    T: TrainedForecastModel + ?Sized,
{
    if train.is_empty() {
        return Err(ForecastError::InsufficientHistory(
            "Walk-forward evaluation needs at least one training week".to_string(),
        ));
    }

    let mut history = History::from_weeks(train.to_vec());
    let mut forecasts = Vec::with_capacity(test.len());

    for (step, week) in test.iter().enumerate() {
        let forecast = trained.forecast(&history)?;
        debug!(step, history_weeks = history.len(), "Forecast week");
        forecasts.push(forecast);
        history.push(week.clone());
    }

    Ok(forecasts)
}

/// Train a model once, walk it forward over the test weeks and score it
pub fn evaluate_model<M: ForecastModel>(
    model: &M,
    train: &[WeekWindow],
    test: &[WeekWindow],
) -> Result<EvaluationReport> {
    let trained = model.train(train)?;
    let forecasts = walk_forward(&trained, train, test)?;

    let actual: Vec<Vec<f64>> = test.iter().map(WeekWindow::total_power).collect();
    let predicted: Vec<Vec<f64>> = forecasts.iter().map(|f| f.values().to_vec()).collect();
    let score = evaluate_forecasts(&actual, &predicted)?;

    info!(
        model = model.name(),
        weeks = forecasts.len(),
        rmse = score.overall,
        "Evaluated model"
    );

    Ok(EvaluationReport {
        name: model.name().to_string(),
        forecasts,
        score,
    })
}
