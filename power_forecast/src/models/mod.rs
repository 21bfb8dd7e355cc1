//! Forecasting models for weekly power consumption
//!
//! A [`ForecastModel`] is an untrained description of a strategy. Training it
//! once on the training weeks yields a [`TrainedForecastModel`], which maps the
//! history available so far to the forecast of the following week.

use crate::data::{History, WeekWindow, DAYS_PER_WEEK};
use crate::error::{ForecastError, Result};
use serde::Serialize;
use std::fmt::Debug;

/// Forecast of the seven daily total power values of the next week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekForecast {
    /// Forecasted values
    values: Vec<f64>,
}

impl WeekForecast {
    /// Create a new forecast of exactly one week of finite values
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.len() != DAYS_PER_WEEK {
            return Err(ForecastError::Validation(format!(
                "Forecast has {} values, expected {}",
                values.len(),
                DAYS_PER_WEEK
            )));
        }

        if let Some(day) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::ModelFit(format!(
                "Forecast for day {} is not a finite number",
                day + 1
            )));
        }

        Ok(Self { values })
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of forecasted days
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// A forecast always holds a full week
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Forecast the week following `history`
    fn forecast(&self, history: &History) -> Result<WeekForecast>;
}

/// Forecast model that can be trained on the training weeks
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on the training weeks
    fn train(&self, train: &[WeekWindow]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod arima;
pub mod cnn;
pub mod naive;
