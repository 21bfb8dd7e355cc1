//! Experiment configuration
//!
//! Every tunable of an evaluation run lives here and is passed explicitly into
//! the loader, the splitter and the models. All sections are optional in the
//! TOML file and fall back to the defaults below.
//!
//! ```toml
//! [split]
//! test_rows = 328
//!
//! [arima]
//! p = 7
//!
//! [cnn]
//! n_input = 14
//! seed = 7
//! ```

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub split: SplitConfig,
    pub data: DataConfig,
    pub naive: NaiveConfig,
    pub arima: ArimaConfig,
    pub cnn: CnnConfig,
    pub logging: LoggingConfig,
}

/// Fixed-offset train/test split, in rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Rows dropped from the start so training begins on a week boundary
    pub skip_leading: usize,
    /// Rows at the end reserved for the test region
    pub test_rows: usize,
    /// Rows discarded from the end of the test region
    pub drop_trailing: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            skip_leading: 1,
            test_rows: 328,
            drop_trailing: 6,
        }
    }
}

/// Input file handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Field delimiter of the input file
    pub delimiter: char,
    /// Sum rows per calendar date before splitting
    pub resample_daily: bool,
    /// How many rows back a missing value is copied from
    pub fill_lag_rows: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            resample_daily: false,
            // one day of minute readings
            fill_lag_rows: 60 * 24,
        }
    }
}

/// Naive persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NaiveConfig {
    /// Lookback of the year-over-year strategy, in weeks
    pub year_lag_weeks: usize,
}

impl Default for NaiveConfig {
    fn default() -> Self {
        Self { year_lag_weeks: 52 }
    }
}

/// ARIMA order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaConfig {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
}

impl Default for ArimaConfig {
    fn default() -> Self {
        Self { p: 7, d: 0, q: 0 }
    }
}

impl ArimaConfig {
    /// Smallest series the fit will accept
    pub fn min_observations(&self) -> usize {
        self.p + self.d + self.q + 10
    }
}

/// Convolutional network hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CnnConfig {
    /// Trailing readings fed to the network
    pub n_input: usize,
    /// Number of convolution filters
    pub filters: usize,
    /// Width of each convolution kernel
    pub kernel_size: usize,
    /// Max pooling window and stride
    pub pool_size: usize,
    /// Units in the dense hidden layer
    pub hidden_units: usize,
    /// Passes over the training examples
    pub epochs: usize,
    /// Examples per gradient step
    pub batch_size: usize,
    /// Adam step size
    pub learning_rate: f64,
    /// Seed for weight initialization and shuffling
    pub seed: u64,
}

impl Default for CnnConfig {
    fn default() -> Self {
        Self {
            n_input: 14,
            filters: 16,
            kernel_size: 3,
            pool_size: 2,
            hidden_units: 10,
            epochs: 20,
            batch_size: 4,
            learning_rate: 0.001,
            seed: 7,
        }
    }
}

impl CnnConfig {
    /// Length of each filter's output after the valid convolution
    pub fn conv_len(&self) -> usize {
        (self.n_input + 1).saturating_sub(self.kernel_size)
    }

    /// Length of each filter's output after pooling
    pub fn pooled_len(&self) -> usize {
        if self.pool_size == 0 {
            return 0;
        }
        self.conv_len() / self.pool_size
    }

    /// Check the hyperparameters describe a buildable network
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("n_input", self.n_input),
            ("filters", self.filters),
            ("kernel_size", self.kernel_size),
            ("pool_size", self.pool_size),
            ("hidden_units", self.hidden_units),
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ForecastError::InvalidParameter(format!(
                    "cnn.{} must be positive",
                    name
                )));
            }
        }

        if self.kernel_size > self.n_input {
            return Err(ForecastError::InvalidParameter(format!(
                "cnn.kernel_size ({}) exceeds cnn.n_input ({})",
                self.kernel_size, self.n_input
            )));
        }

        if self.pooled_len() == 0 {
            return Err(ForecastError::InvalidParameter(format!(
                "cnn.pool_size ({}) leaves nothing of the {} convolution outputs",
                self.pool_size,
                self.conv_len()
            )));
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ForecastError::InvalidParameter(
                "cnn.learning_rate must be a positive number".to_string(),
            ));
        }

        Ok(())
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.split.drop_trailing > self.split.test_rows {
            return Err(ForecastError::InvalidParameter(format!(
                "split.drop_trailing ({}) exceeds split.test_rows ({})",
                self.split.drop_trailing, self.split.test_rows
            )));
        }

        if !self.data.delimiter.is_ascii() {
            return Err(ForecastError::InvalidParameter(format!(
                "data.delimiter must be an ASCII character, got {:?}",
                self.data.delimiter
            )));
        }

        if self.data.fill_lag_rows == 0 {
            return Err(ForecastError::InvalidParameter(
                "data.fill_lag_rows must be positive".to_string(),
            ));
        }

        if self.naive.year_lag_weeks == 0 {
            return Err(ForecastError::InvalidParameter(
                "naive.year_lag_weeks must be positive".to_string(),
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ForecastError::InvalidParameter(
                "logging.level must not be empty".to_string(),
            ));
        }

        self.cnn.validate()
    }
}
