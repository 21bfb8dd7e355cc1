//! Selection of the strategies compared in an experiment

use crate::config::Config;
use crate::data::WeekWindow;
use crate::error::{ForecastError, Result};
use crate::evaluation::{evaluate_model, EvaluationReport};
use crate::models::arima::ArimaModel;
use crate::models::cnn::CnnModel;
use crate::models::naive::NaiveModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Forecasting strategies available to an experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Repeat the last known day
    Daily,
    /// Repeat last week
    Weekly,
    /// Repeat the same week one year earlier
    YearAgo,
    /// Autoregressive model re-fitted every week
    Arima,
    /// Convolutional network trained once
    Cnn,
}

impl StrategyKind {
    /// Every strategy, in reporting order
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Daily,
        StrategyKind::Weekly,
        StrategyKind::YearAgo,
        StrategyKind::Arima,
        StrategyKind::Cnn,
    ];

    /// Build the configured model and run the walk-forward evaluation
    ///
    /// The report carries the strategy's selection name, so summaries read
    /// `arima: ...` whatever order the model was configured with.
    pub fn evaluate(
        &self,
        config: &Config,
        train: &[WeekWindow],
        test: &[WeekWindow],
    ) -> Result<EvaluationReport> {
        let mut report = match self {
            StrategyKind::Daily => evaluate_model(&NaiveModel::daily(), train, test),
            StrategyKind::Weekly => evaluate_model(&NaiveModel::weekly(), train, test),
            StrategyKind::YearAgo => {
                let model = NaiveModel::year_ago(config.naive.year_lag_weeks)?;
                evaluate_model(&model, train, test)
            }
            StrategyKind::Arima => {
                let model = ArimaModel::from_config(&config.arima)?;
                evaluate_model(&model, train, test)
            }
            StrategyKind::Cnn => {
                let model = CnnModel::new(config.cnn.clone())?;
                evaluate_model(&model, train, test)
            }
        }?;

        report.name = self.as_str().to_string();
        Ok(report)
    }

    fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Daily => "daily",
            StrategyKind::Weekly => "weekly",
            StrategyKind::YearAgo => "year-ago",
            StrategyKind::Arima => "arima",
            StrategyKind::Cnn => "cnn",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ForecastError::InvalidParameter(format!(
                    "Unknown strategy '{}', expected one of: daily, weekly, year-ago, arima, cnn",
                    s
                ))
            })
    }
}
