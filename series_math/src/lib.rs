//! # Series Math
//!
//! Numeric building blocks for forecasting experiments on univariate series.
//! This crate provides the squared-error metrics used for scoring, ordinary
//! least squares for autoregressive fitting, and the small series transforms
//! (differencing, integration, min-max scaling) the models rely on.

use thiserror::Error;

pub mod accuracy;
pub mod regression;
pub mod transform;

pub use accuracy::{mean_squared_error, root_mean_squared_error, sum_squared_error};
pub use regression::{least_squares, LeastSquaresFit};
pub use transform::{difference, integrate, MinMaxScaler};

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;
