//! Naive persistence baselines
//!
//! These strategies carry no state; training only hands back a copy of the
//! model.

use crate::data::{History, WeekWindow, DAYS_PER_WEEK};
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, TrainedForecastModel, WeekForecast};
use serde::{Deserialize, Serialize};

/// Which past observation a persistence forecast repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Persistence {
    /// Repeat the last known day seven times
    Daily,
    /// Repeat last week day by day
    Weekly,
    /// Repeat the week `lag_weeks` weeks back, day by day
    YearAgo {
        /// Lookback in weeks
        lag_weeks: usize,
    },
}

impl Persistence {
    /// Produce the persistence forecast for the week after `history`
    pub fn forecast(&self, history: &History) -> Result<WeekForecast> {
        let last_week = history.last_week().ok_or_else(|| {
            ForecastError::InsufficientHistory(
                "Persistence forecasts need at least one week of history".to_string(),
            )
        })?;

        match *self {
            Persistence::Daily => {
                WeekForecast::new(vec![last_week.last_total_power(); DAYS_PER_WEEK])
            }
            Persistence::Weekly => WeekForecast::new(last_week.total_power()),
            Persistence::YearAgo { lag_weeks } => {
                let week = history.week_back(lag_weeks).ok_or_else(|| {
                    ForecastError::InsufficientHistory(format!(
                        "Year-over-year persistence needs {} weeks of history, got {}",
                        lag_weeks,
                        history.len()
                    ))
                })?;
                WeekForecast::new(week.total_power())
            }
        }
    }
}

/// Persistence baseline model
#[derive(Debug, Clone)]
pub struct NaiveModel {
    /// Name of the model
    name: String,
    /// Observation repeated by the forecast
    persistence: Persistence,
}

impl NaiveModel {
    /// Repeat the last known day
    pub fn daily() -> Self {
        Self {
            name: "daily".to_string(),
            persistence: Persistence::Daily,
        }
    }

    /// Repeat last week
    pub fn weekly() -> Self {
        Self {
            name: "weekly".to_string(),
            persistence: Persistence::Weekly,
        }
    }

    /// Repeat the week `lag_weeks` back, 52 for the same week last year
    pub fn year_ago(lag_weeks: usize) -> Result<Self> {
        if lag_weeks == 0 {
            return Err(ForecastError::InvalidParameter(
                "Year-over-year lag must be at least one week".to_string(),
            ));
        }

        Ok(Self {
            name: "year-ago".to_string(),
            persistence: Persistence::YearAgo { lag_weeks },
        })
    }

    /// The persistence rule of the model
    pub fn persistence(&self) -> Persistence {
        self.persistence
    }
}

impl ForecastModel for NaiveModel {
    type Trained = NaiveModel;

    fn train(&self, _train: &[WeekWindow]) -> Result<NaiveModel> {
        Ok(self.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for NaiveModel {
    fn forecast(&self, history: &History) -> Result<WeekForecast> {
        self.persistence.forecast(history)
    }
}
