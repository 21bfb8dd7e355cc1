//! One-dimensional convolutional network forecaster
//!
//! The network maps the last `n_input` daily readings to the next seven:
//!
//! ```text
//! input (n_input) -> conv1d (filters x kernel, ReLU) -> max pool
//!     -> flatten -> dense (hidden_units, ReLU) -> dense (7)
//! ```
//!
//! It is trained once, on the training weeks, with mean squared error and
//! Adam. Inputs and targets are min-max scaled with the range of the training
//! series; forecasts are mapped back before they are returned.

use crate::config::CnnConfig;
use crate::data::{total_power_series, History, WeekWindow, DAYS_PER_WEEK};
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, TrainedForecastModel, WeekForecast};
use ndarray::{aview1, s, Array, Array1, Array2, ArrayView1, Axis, Dimension, Ix1, Ix2, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use series_math::MinMaxScaler;
use tracing::{debug, info};

/// Pair every `n_input` consecutive readings with the `n_out` readings after them
///
/// Returns the inputs as a `samples × n_input` matrix and the targets as a
/// `samples × n_out` matrix, stepping one reading at a time.
pub fn to_supervised(
    series: &[f64],
    n_input: usize,
    n_out: usize,
) -> Result<(Array2<f64>, Array2<f64>)> {
    if n_input == 0 || n_out == 0 {
        return Err(ForecastError::InvalidParameter(
            "Supervised windows need positive input and output lengths".to_string(),
        ));
    }

    let window = n_input + n_out;
    if series.len() < window {
        return Err(ForecastError::InsufficientHistory(format!(
            "Building training examples needs at least {} readings, got {}",
            window,
            series.len()
        )));
    }

    let samples = series.len() - window + 1;
    let mut inputs = Array2::zeros((samples, n_input));
    let mut targets = Array2::zeros((samples, n_out));
    for start in 0..samples {
        inputs
            .row_mut(start)
            .assign(&aview1(&series[start..start + n_input]));
        targets
            .row_mut(start)
            .assign(&aview1(&series[start + n_input..start + window]));
    }

    Ok((inputs, targets))
}

fn relu(x: f64) -> f64 {
    x.max(0.0)
}

fn outer(column: &Array1<f64>, row: &Array1<f64>) -> Array2<f64> {
    column
        .view()
        .insert_axis(Axis(1))
        .dot(&row.view().insert_axis(Axis(0)))
}

/// Glorot-uniform initialization
fn glorot(shape: (usize, usize), fan_in: usize, fan_out: usize, rng: &mut StdRng) -> Array2<f64> {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    let dist = Uniform::new(-limit, limit);
    Array2::from_shape_fn(shape, |_| dist.sample(&mut *rng))
}

/// Intermediate values of one forward pass, kept for backpropagation
#[derive(Debug)]
struct Activations {
    conv_pre: Array2<f64>,
    /// Winning convolution position of every pooled cell, in flatten order
    pool_argmax: Vec<usize>,
    flat: Array1<f64>,
    hidden_pre: Array1<f64>,
    output: Array1<f64>,
}

impl Activations {
    fn hidden(&self) -> Array1<f64> {
        self.hidden_pre.mapv(relu)
    }
}

#[derive(Debug)]
struct Gradients {
    conv_weights: Array2<f64>,
    conv_bias: Array1<f64>,
    hidden_weights: Array2<f64>,
    hidden_bias: Array1<f64>,
    output_weights: Array2<f64>,
    output_bias: Array1<f64>,
}

impl Gradients {
    fn zeros_like(net: &ConvNet) -> Self {
        Self {
            conv_weights: Array2::zeros(net.conv_weights.raw_dim()),
            conv_bias: Array1::zeros(net.conv_bias.len()),
            hidden_weights: Array2::zeros(net.hidden_weights.raw_dim()),
            hidden_bias: Array1::zeros(net.hidden_bias.len()),
            output_weights: Array2::zeros(net.output_weights.raw_dim()),
            output_bias: Array1::zeros(net.output_bias.len()),
        }
    }
}

/// First and second moment estimates for one parameter tensor
#[derive(Debug, Clone)]
struct Moments<D: Dimension> {
    m: Array<f64, D>,
    v: Array<f64, D>,
}

impl<D: Dimension> Moments<D> {
    fn zeros_like(param: &Array<f64, D>) -> Self {
        Self {
            m: param.mapv(|_| 0.0),
            v: param.mapv(|_| 0.0),
        }
    }
}

/// Adam optimizer (Adaptive Moment Estimation)
#[derive(Debug, Clone)]
struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: i32,
}

impl Adam {
    fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
        }
    }

    fn update<D: Dimension>(
        &self,
        param: &mut Array<f64, D>,
        grad: &Array<f64, D>,
        moments: &mut Moments<D>,
    ) {
        let (beta1, beta2) = (self.beta1, self.beta2);
        let bias1 = 1.0 - beta1.powi(self.step);
        let bias2 = 1.0 - beta2.powi(self.step);
        let (learning_rate, epsilon) = (self.learning_rate, self.epsilon);

        Zip::from(param)
            .and(&mut moments.m)
            .and(&mut moments.v)
            .and(grad)
            .for_each(|p, m, v, &g| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                let m_hat = *m / bias1;
                let v_hat = *v / bias2;
                *p -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
            });
    }
}

#[derive(Debug, Clone)]
struct NetMoments {
    conv_weights: Moments<Ix2>,
    conv_bias: Moments<Ix1>,
    hidden_weights: Moments<Ix2>,
    hidden_bias: Moments<Ix1>,
    output_weights: Moments<Ix2>,
    output_bias: Moments<Ix1>,
}

impl NetMoments {
    fn zeros_like(net: &ConvNet) -> Self {
        Self {
            conv_weights: Moments::zeros_like(&net.conv_weights),
            conv_bias: Moments::zeros_like(&net.conv_bias),
            hidden_weights: Moments::zeros_like(&net.hidden_weights),
            hidden_bias: Moments::zeros_like(&net.hidden_bias),
            output_weights: Moments::zeros_like(&net.output_weights),
            output_bias: Moments::zeros_like(&net.output_bias),
        }
    }
}

/// Convolution, pooling and two dense layers
#[derive(Debug, Clone)]
pub struct ConvNet {
    /// Convolution kernels (filters × kernel_size)
    conv_weights: Array2<f64>,
    conv_bias: Array1<f64>,
    /// Hidden layer weights (hidden_units × filters·pooled_len)
    hidden_weights: Array2<f64>,
    hidden_bias: Array1<f64>,
    /// Output layer weights (outputs × hidden_units)
    output_weights: Array2<f64>,
    output_bias: Array1<f64>,
    n_input: usize,
    pool_size: usize,
    pooled_len: usize,
}

impl ConvNet {
    /// Create a network with Glorot-initialized weights and zero biases
    pub fn new(config: &CnnConfig, outputs: usize, rng: &mut StdRng) -> Result<Self> {
        config.validate()?;
        if outputs == 0 {
            return Err(ForecastError::InvalidParameter(
                "Network needs at least one output".to_string(),
            ));
        }

        let pooled_len = config.pooled_len();
        let flat_len = config.filters * pooled_len;

        let conv_weights = glorot(
            (config.filters, config.kernel_size),
            config.kernel_size,
            config.kernel_size * config.filters,
            rng,
        );
        let hidden_weights = glorot(
            (config.hidden_units, flat_len),
            flat_len,
            config.hidden_units,
            rng,
        );
        let output_weights = glorot(
            (outputs, config.hidden_units),
            config.hidden_units,
            outputs,
            rng,
        );

        Ok(Self {
            conv_weights,
            conv_bias: Array1::zeros(config.filters),
            hidden_weights,
            hidden_bias: Array1::zeros(config.hidden_units),
            output_weights,
            output_bias: Array1::zeros(outputs),
            n_input: config.n_input,
            pool_size: config.pool_size,
            pooled_len,
        })
    }

    /// Number of readings the network expects
    pub fn n_input(&self) -> usize {
        self.n_input
    }

    /// Number of trainable parameters
    pub fn num_parameters(&self) -> usize {
        self.conv_weights.len()
            + self.conv_bias.len()
            + self.hidden_weights.len()
            + self.hidden_bias.len()
            + self.output_weights.len()
            + self.output_bias.len()
    }

    fn forward(&self, input: ArrayView1<f64>) -> Activations {
        let filters = self.conv_weights.nrows();
        let kernel = self.conv_weights.ncols();
        let conv_len = self.n_input + 1 - kernel;

        let mut conv_pre = Array2::zeros((filters, conv_len));
        for f in 0..filters {
            let weights = self.conv_weights.row(f);
            for t in 0..conv_len {
                conv_pre[[f, t]] = self.conv_bias[f] + weights.dot(&input.slice(s![t..t + kernel]));
            }
        }
        let conv_act = conv_pre.mapv(relu);

        let mut flat = Array1::zeros(filters * self.pooled_len);
        let mut pool_argmax = vec![0; filters * self.pooled_len];
        for f in 0..filters {
            for j in 0..self.pooled_len {
                let begin = j * self.pool_size;
                let mut best = begin;
                for t in begin + 1..begin + self.pool_size {
                    if conv_act[[f, t]] > conv_act[[f, best]] {
                        best = t;
                    }
                }
                let cell = f * self.pooled_len + j;
                flat[cell] = conv_act[[f, best]];
                pool_argmax[cell] = best;
            }
        }

        let hidden_pre = self.hidden_weights.dot(&flat) + &self.hidden_bias;
        let hidden = hidden_pre.mapv(relu);
        let output = self.output_weights.dot(&hidden) + &self.output_bias;

        Activations {
            conv_pre,
            pool_argmax,
            flat,
            hidden_pre,
            output,
        }
    }

    /// Accumulate the gradients of one example into `grads`
    fn backward(
        &self,
        input: ArrayView1<f64>,
        acts: &Activations,
        d_output: &Array1<f64>,
        grads: &mut Gradients,
    ) {
        grads.output_weights += &outer(d_output, &acts.hidden());
        grads.output_bias += d_output;

        let d_hidden = self.output_weights.t().dot(d_output)
            * &acts.hidden_pre.mapv(|z| if z > 0.0 { 1.0 } else { 0.0 });
        grads.hidden_weights += &outer(&d_hidden, &acts.flat);
        grads.hidden_bias += &d_hidden;

        let d_flat = self.hidden_weights.t().dot(&d_hidden);

        // Max pooling routes each gradient to the winning position only
        let mut d_conv = Array2::<f64>::zeros(acts.conv_pre.raw_dim());
        for (cell, &t) in acts.pool_argmax.iter().enumerate() {
            let f = cell / self.pooled_len;
            d_conv[[f, t]] += d_flat[cell];
        }
        d_conv.zip_mut_with(&acts.conv_pre, |g, &z| {
            if z <= 0.0 {
                *g = 0.0;
            }
        });

        let kernel = self.conv_weights.ncols();
        for ((f, t), &g) in d_conv.indexed_iter() {
            if g == 0.0 {
                continue;
            }
            grads.conv_bias[f] += g;
            for k in 0..kernel {
                grads.conv_weights[[f, k]] += g * input[t + k];
            }
        }
    }

    fn apply(&mut self, grads: &Gradients, adam: &Adam, moments: &mut NetMoments) {
        adam.update(
            &mut self.conv_weights,
            &grads.conv_weights,
            &mut moments.conv_weights,
        );
        adam.update(&mut self.conv_bias, &grads.conv_bias, &mut moments.conv_bias);
        adam.update(
            &mut self.hidden_weights,
            &grads.hidden_weights,
            &mut moments.hidden_weights,
        );
        adam.update(
            &mut self.hidden_bias,
            &grads.hidden_bias,
            &mut moments.hidden_bias,
        );
        adam.update(
            &mut self.output_weights,
            &grads.output_weights,
            &mut moments.output_weights,
        );
        adam.update(
            &mut self.output_bias,
            &grads.output_bias,
            &mut moments.output_bias,
        );
    }

    /// Train on `inputs` (samples × n_input) against `targets` (samples × outputs)
    ///
    /// Returns the mean squared error of every epoch.
    pub fn fit(
        &mut self,
        inputs: &Array2<f64>,
        targets: &Array2<f64>,
        config: &CnnConfig,
        rng: &mut StdRng,
    ) -> Result<Vec<f64>> {
        let samples = inputs.nrows();
        let outputs = self.output_bias.len();
        if samples == 0 || targets.nrows() != samples {
            return Err(ForecastError::Validation(format!(
                "Expected matching non-empty inputs and targets, got {} and {} rows",
                samples,
                targets.nrows()
            )));
        }
        if inputs.ncols() != self.n_input || targets.ncols() != outputs {
            return Err(ForecastError::Validation(format!(
                "Expected {} inputs and {} targets per example, got {} and {}",
                self.n_input,
                outputs,
                inputs.ncols(),
                targets.ncols()
            )));
        }

        let mut adam = Adam::new(config.learning_rate);
        let mut moments = NetMoments::zeros_like(self);
        let mut order: Vec<usize> = (0..samples).collect();
        let mut losses = Vec::with_capacity(config.epochs);

        for epoch in 0..config.epochs {
            order.shuffle(rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(config.batch_size) {
                let mut grads = Gradients::zeros_like(self);
                let scale = 2.0 / (outputs * batch.len()) as f64;

                for &i in batch {
                    let input = inputs.row(i);
                    let acts = self.forward(input);
                    let error = &acts.output - &targets.row(i);
                    epoch_loss += error.mapv(|e| e * e).sum() / outputs as f64;
                    let d_output = error * scale;
                    self.backward(input, &acts, &d_output, &mut grads);
                }

                adam.step += 1;
                self.apply(&grads, &adam, &mut moments);
            }

            let mean_loss = epoch_loss / samples as f64;
            debug!(epoch = epoch + 1, loss = mean_loss, "CNN training epoch");
            if !mean_loss.is_finite() {
                return Err(ForecastError::ModelFit(format!(
                    "CNN training loss became non-finite in epoch {}",
                    epoch + 1
                )));
            }
            losses.push(mean_loss);
        }

        Ok(losses)
    }

    /// Run the network on one input window
    pub fn predict(&self, input: &[f64]) -> Result<Array1<f64>> {
        if input.len() != self.n_input {
            return Err(ForecastError::Validation(format!(
                "Network expects {} inputs, got {}",
                self.n_input,
                input.len()
            )));
        }

        Ok(self.forward(aview1(input)).output)
    }
}

/// Convolutional network model
#[derive(Debug, Clone)]
pub struct CnnModel {
    /// Name of the model
    name: String,
    /// Network and training hyperparameters
    config: CnnConfig,
}

impl CnnModel {
    /// Create a new model from validated hyperparameters
    pub fn new(config: CnnConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            name: "cnn".to_string(),
            config,
        })
    }

    /// Network and training hyperparameters
    pub fn config(&self) -> &CnnConfig {
        &self.config
    }
}

impl ForecastModel for CnnModel {
    type Trained = TrainedCnn;

    fn train(&self, train: &[WeekWindow]) -> Result<TrainedCnn> {
        let series = total_power_series(train);
        let min_len = self.config.n_input + DAYS_PER_WEEK;
        if series.len() < min_len {
            return Err(ForecastError::InsufficientHistory(format!(
                "CNN training needs at least {} readings, got {}",
                min_len,
                series.len()
            )));
        }

        let scaler = MinMaxScaler::fit(&series)?;
        let scaled = scaler.transform_all(&series);
        let (inputs, targets) = to_supervised(&scaled, self.config.n_input, DAYS_PER_WEEK)?;

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut network = ConvNet::new(&self.config, DAYS_PER_WEEK, &mut rng)?;
        let losses = network.fit(&inputs, &targets, &self.config, &mut rng)?;

        info!(
            model = %self.name,
            examples = inputs.nrows(),
            parameters = network.num_parameters(),
            final_loss = losses.last().copied().unwrap_or(f64::NAN),
            "Trained CNN"
        );

        Ok(TrainedCnn {
            network,
            scaler,
            losses,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Trained convolutional forecaster
#[derive(Debug, Clone)]
pub struct TrainedCnn {
    network: ConvNet,
    scaler: MinMaxScaler,
    /// Mean squared error of every training epoch, on the scaled data
    losses: Vec<f64>,
}

impl TrainedCnn {
    /// Training loss of every epoch
    pub fn training_losses(&self) -> &[f64] {
        &self.losses
    }

    /// The trained network
    pub fn network(&self) -> &ConvNet {
        &self.network
    }
}

impl TrainedForecastModel for TrainedCnn {
    fn forecast(&self, history: &History) -> Result<WeekForecast> {
        let series = history.total_power_series();
        let n_input = self.network.n_input();
        if series.len() < n_input {
            return Err(ForecastError::InsufficientHistory(format!(
                "CNN forecasts need the last {} readings, history has {}",
                n_input,
                series.len()
            )));
        }

        let input = self.scaler.transform_all(&series[series.len() - n_input..]);
        let output = self.network.predict(&input)?;

        WeekForecast::new(output.iter().map(|&v| self.scaler.inverse(v)).collect())
    }
}
