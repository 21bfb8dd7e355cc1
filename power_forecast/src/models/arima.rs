//! ARIMA models for weekly power forecasting
//!
//! The trained model keeps only the order: every forecast re-fits the model
//! from scratch on the full history seen so far, then forecasts one week.
//!
//! Estimation is conditional least squares. A pure AR model (`q = 0`) regresses
//! each value on a constant and its `p` lags. With an MA part the two-stage
//! Hannan–Rissanen procedure is used: a long autoregression estimates the
//! innovations, then the series is regressed on its own lags and the lagged
//! innovation estimates.

use crate::config::ArimaConfig;
use crate::data::{History, WeekWindow, DAYS_PER_WEEK};
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, TrainedForecastModel, WeekForecast};
use series_math::{difference, integrate, least_squares};
use statrs::statistics::Statistics;
use std::f64::consts::PI;
use tracing::debug;

/// Variance below which a (differenced) series is treated as constant
const VARIANCE_FLOOR: f64 = 1e-12;

/// Smallest order of the long autoregression in the Hannan–Rissanen first stage
const LONG_AR_MIN_ORDER: usize = 10;

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    /// Model order
    order: ArimaConfig,
}

impl ArimaModel {
    /// Create a new ARIMA(p, d, q) model
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        Self::from_config(&ArimaConfig { p, d, q })
    }

    /// Create a model from the arima section of the configuration
    pub fn from_config(order: &ArimaConfig) -> Result<Self> {
        if order.d > 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "Differencing order {} is not supported, use at most 2",
                order.d
            )));
        }

        Ok(Self {
            name: format!("ARIMA({},{},{})", order.p, order.d, order.q),
            order: *order,
        })
    }

    /// Model order
    pub fn order(&self) -> ArimaConfig {
        self.order
    }
}

impl ForecastModel for ArimaModel {
    type Trained = RefittingArima;

    fn train(&self, train: &[WeekWindow]) -> Result<RefittingArima> {
        // Fit once up front so a hopeless configuration fails before the loop
        let series = crate::data::total_power_series(train);
        let fitted = FittedArima::fit(&series, self.order)?;
        debug!(
            model = %self.name,
            observations = series.len(),
            sigma2 = fitted.sigma2(),
            aic = fitted.aic(),
            "Initial ARIMA fit"
        );

        Ok(RefittingArima {
            order: self.order,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// ARIMA forecaster that re-fits on every call
#[derive(Debug, Clone)]
pub struct RefittingArima {
    order: ArimaConfig,
}

impl TrainedForecastModel for RefittingArima {
    fn forecast(&self, history: &History) -> Result<WeekForecast> {
        let series = history.total_power_series();
        let fitted = FittedArima::fit(&series, self.order)?;
        WeekForecast::new(fitted.forecast(DAYS_PER_WEEK)?)
    }
}

/// ARIMA model fitted to one series
#[derive(Debug, Clone)]
pub struct FittedArima {
    /// Model order
    order: ArimaConfig,
    /// Intercept on the differenced scale
    constant: f64,
    /// Fitted AR coefficients, lag 1 first
    ar_coefficients: Vec<f64>,
    /// Fitted MA coefficients, lag 1 first
    ma_coefficients: Vec<f64>,
    /// The series the model was fitted to
    series: Vec<f64>,
    /// The series differenced `d` times
    differenced: Vec<f64>,
    /// One-step innovations, aligned with `differenced`
    innovations: Vec<f64>,
    /// Innovation variance
    sigma2: f64,
    /// Akaike information criterion
    aic: f64,
    /// Bayesian information criterion
    bic: f64,
}

impl FittedArima {
    /// Fit an ARIMA model of the given order to `series`
    pub fn fit(series: &[f64], order: ArimaConfig) -> Result<Self> {
        let ArimaConfig { p, d, q } = order;

        if series.len() < order.min_observations() {
            return Err(ForecastError::ModelFit(format!(
                "ARIMA({},{},{}) needs at least {} observations, got {}",
                p,
                d,
                q,
                order.min_observations(),
                series.len()
            )));
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ModelFit(
                "Series contains non-finite values".to_string(),
            ));
        }

        let differenced = difference(series, d);
        let variance = differenced.iter().variance();
        if !(variance.is_finite() && variance > VARIANCE_FLOOR) {
            return Err(ForecastError::ModelFit(format!(
                "ARIMA({},{},{}) cannot be fitted to a constant series",
                p, d, q
            )));
        }

        let (constant, ar_coefficients, ma_coefficients) = if q == 0 {
            estimate_ar(&differenced, p)?
        } else {
            estimate_arma(&differenced, p, q)?
        };

        let innovations =
            compute_innovations(&differenced, constant, &ar_coefficients, &ma_coefficients)?;

        // The first p innovations are conditioned away
        let effective = &innovations[p..];
        let n = effective.len() as f64;
        let sigma2 = effective.iter().map(|e| e * e).sum::<f64>() / n;
        let k = (p + q + 1) as f64;
        let log_likelihood = -0.5 * n * (1.0 + (2.0 * PI * sigma2).ln());
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let bic = -2.0 * log_likelihood + k * n.ln();

        Ok(Self {
            order,
            constant,
            ar_coefficients,
            ma_coefficients,
            series: series.to_vec(),
            differenced,
            innovations,
            sigma2,
            aic,
            bic,
        })
    }

    /// Forecast `horizon` steps past the end of the fitted series
    pub fn forecast(&self, horizon: usize) -> Result<Vec<f64>> {
        let mut extended = self.differenced.clone();
        let mut innovations = self.innovations.clone();
        let mut forecasts = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let mut value = self.constant;
            for (i, phi) in self.ar_coefficients.iter().enumerate() {
                value += phi * extended[extended.len() - 1 - i];
            }
            for (j, theta) in self.ma_coefficients.iter().enumerate() {
                value += theta * innovations[innovations.len() - 1 - j];
            }

            extended.push(value);
            // Future innovations have zero expectation
            innovations.push(0.0);
            forecasts.push(value);
        }

        let forecasts = integrate(&forecasts, &self.series, self.order.d)?;
        if forecasts.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ModelFit(
                "ARIMA forecast diverged to non-finite values".to_string(),
            ));
        }

        Ok(forecasts)
    }

    /// Model order
    pub fn order(&self) -> ArimaConfig {
        self.order
    }

    /// Intercept on the differenced scale
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// AR coefficients, lag 1 first
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    /// MA coefficients, lag 1 first
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Innovation variance
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Akaike information criterion
    pub fn aic(&self) -> f64 {
        self.aic
    }

    /// Bayesian information criterion
    pub fn bic(&self) -> f64 {
        self.bic
    }
}

fn fit_error(order: &str, err: series_math::MathError) -> ForecastError {
    ForecastError::ModelFit(format!("{} least squares failed: {}", order, err))
}

/// Regress each value on a constant and its `p` lags
fn estimate_ar(data: &[f64], p: usize) -> Result<(f64, Vec<f64>, Vec<f64>)> {
    let n = data.len();
    let mut design = Vec::with_capacity((n - p) * (p + 1));
    for t in p..n {
        design.push(1.0);
        for i in 1..=p {
            design.push(data[t - i]);
        }
    }

    let fit = least_squares(&design, p + 1, &data[p..])
        .map_err(|e| fit_error(&format!("AR({})", p), e))?;

    Ok((fit.coefficients[0], fit.coefficients[1..].to_vec(), Vec::new()))
}

/// Hannan–Rissanen estimate of an ARMA(p, q) model
fn estimate_arma(data: &[f64], p: usize, q: usize) -> Result<(f64, Vec<f64>, Vec<f64>)> {
    let n = data.len();
    let long_order = (p + q).max(LONG_AR_MIN_ORDER).min(n / 3);
    let start = p.max(long_order + q);
    let cols = 1 + p + q;

    if long_order == 0 || n < start + cols + 1 {
        return Err(ForecastError::ModelFit(format!(
            "ARMA({},{}) needs a longer series than {} observations",
            p, q, n
        )));
    }

    // Stage one: innovations from a long autoregression
    let (long_constant, long_ar, _) = estimate_ar(data, long_order)?;
    let mut innovations = vec![0.0; n];
    for t in long_order..n {
        let predicted: f64 = long_constant
            + long_ar
                .iter()
                .enumerate()
                .map(|(i, phi)| phi * data[t - 1 - i])
                .sum::<f64>();
        innovations[t] = data[t] - predicted;
    }

    // Stage two: regress on own lags and lagged innovations
    let mut design = Vec::with_capacity((n - start) * cols);
    for t in start..n {
        design.push(1.0);
        for i in 1..=p {
            design.push(data[t - i]);
        }
        for j in 1..=q {
            design.push(innovations[t - j]);
        }
    }

    let fit = least_squares(&design, cols, &data[start..])
        .map_err(|e| fit_error(&format!("ARMA({},{})", p, q), e))?;

    Ok((
        fit.coefficients[0],
        fit.coefficients[1..=p].to_vec(),
        fit.coefficients[p + 1..].to_vec(),
    ))
}

/// One-step prediction errors of the fitted recursion
fn compute_innovations(
    data: &[f64],
    constant: f64,
    ar: &[f64],
    ma: &[f64],
) -> Result<Vec<f64>> {
    let p = ar.len();
    let mut innovations = vec![0.0; data.len()];

    for t in p..data.len() {
        let mut predicted = constant;
        for (i, phi) in ar.iter().enumerate() {
            predicted += phi * data[t - 1 - i];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                predicted += theta * innovations[t - 1 - j];
            }
        }
        innovations[t] = data[t] - predicted;
    }

    if innovations.iter().any(|e| !e.is_finite()) {
        return Err(ForecastError::ModelFit(
            "Innovations diverged; the MA part is not invertible".to_string(),
        ));
    }

    Ok(innovations)
}
