//! # Power Forecast
//!
//! Walk-forward evaluation of weekly household power consumption forecasts.
//!
//! ## Features
//!
//! - Loading of delimited power consumption files, with gap filling and
//!   optional daily resampling
//! - Fixed-offset train/test split into week windows
//! - Forecasting strategies: naive persistence (daily, weekly, year-over-year),
//!   ARIMA re-fitted every week, and a 1-D convolutional network trained once
//! - One shared scoring routine: per-day RMSE and aggregate RMSE
//!
//! ## Quick Start
//!
//! ```no_run
//! use power_forecast::config::Config;
//! use power_forecast::data::{train_test_split, DataLoader};
//! use power_forecast::evaluation::evaluate_model;
//! use power_forecast::models::naive::NaiveModel;
//!
//! # fn main() -> power_forecast::Result<()> {
//! let config = Config::default();
//!
//! // Load daily totals
//! let data = DataLoader::from_config(&config.data)?.load("household_power_daily.csv")?;
//!
//! // Split into training and test weeks
//! let (train, test) = train_test_split(data.rows(), &config.split)?;
//!
//! // Walk a baseline forward over the test weeks
//! let report = evaluate_model(&NaiveModel::weekly(), &train, &test)?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod metrics;
pub mod models;
pub mod strategies;

// Re-export commonly used types
pub use crate::config::Config;
pub use crate::data::{DataLoader, History, Observation, PowerDataset, WeekWindow, DAYS_PER_WEEK};
pub use crate::error::{ForecastError, Result};
pub use crate::evaluation::{evaluate_model, walk_forward, EvaluationReport};
pub use crate::metrics::{evaluate_forecasts, summarize_scores, Score};
pub use crate::models::{ForecastModel, TrainedForecastModel, WeekForecast};
pub use crate::strategies::StrategyKind;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
