//! Error types for the power_forecast crate

use thiserror::Error;

/// Custom error types for the power_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Malformed or missing input data
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// A strategy needs more history than is available
    #[error("Insufficient history: {0}")]
    InsufficientHistory(String),

    /// Model fitting or training failed
    #[error("Model fit error: {0}")]
    ModelFit(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Shapes or lengths that don't line up
    #[error("Validation error: {0}")]
    Validation(String),

    /// Nothing to score
    #[error("Evaluation produced no forecasts to score")]
    EmptyEvaluation,

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the CSV reader
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error parsing a configuration file
    #[error("Config error: {0}")]
    Config(String),

    /// Error serializing a report
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error from the numeric primitives
    #[error("Math error: {0}")]
    Math(#[from] series_math::MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::Config(err.to_string())
    }
}
