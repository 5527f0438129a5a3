use ndarray::{Array1, Array2, ArrayView2, Axis};
use ndarray_rand::rand_distr::StandardNormal;
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{Result, RainbowError};
use crate::optimizer::{Optimizer, OptimizerWrapper};
use super::initialization::WeightInit;
use super::traits::{Layer as LayerTrait, LayerGradients};

/// Factorised Gaussian noise, already passed through `f(x) = sign(x) * sqrt(|x|)`.
#[derive(Clone, Debug)]
struct FactorizedNoise {
    input: Array1<f32>,
    output: Array1<f32>,
}

impl FactorizedNoise {
    fn sample<R: Rng>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let mut scaled = |n: usize| {
            Array1::from_iter((0..n).map(|_| {
                let x: f32 = rng.sample(StandardNormal);
                x.signum() * x.abs().sqrt()
            }))
        };
        let input = scaled(input_size);
        let output = scaled(output_size);
        FactorizedNoise { input, output }
    }

    fn weights(&self) -> Array2<f32> {
        self.input
            .view()
            .insert_axis(Axis(1))
            .dot(&self.output.view().insert_axis(Axis(0)))
    }
}

/// Dense layer whose weights are `mu + sigma * noise`, with the noise re-sampled by
/// [`LayerTrait::reset_noise`]. Until noise is sampled the layer acts with its mean weights.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NoisyLayer {
    pub weight_mu: Array2<f32>,
    pub weight_sigma: Array2<f32>,
    pub bias_mu: Array1<f32>,
    pub bias_sigma: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    noise: Option<FactorizedNoise>,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

impl NoisyLayer {
    /// `sigma_zero` is the initial noise scale before dividing by `sqrt(input_size)`.
    pub fn new<R: Rng>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        sigma_zero: f32,
        rng: &mut R,
    ) -> Self {
        let bound = 1.0 / (input_size as f32).sqrt();
        let init = WeightInit::Uniform { min: -bound, max: bound };
        let sigma = sigma_zero / (input_size as f32).sqrt();
        NoisyLayer {
            weight_mu: init.initialize_weights((input_size, output_size), rng),
            weight_sigma: Array2::from_elem((input_size, output_size), sigma),
            bias_mu: init.initialize_biases(output_size, rng),
            bias_sigma: Array1::from_elem(output_size, sigma),
            activation,
            noise: None,
            pre_activation_output: None,
            inputs: None,
        }
    }

    /// Weights and biases used by the current forward pass.
    fn effective_parameters(&self) -> (Array2<f32>, Array1<f32>) {
        match &self.noise {
            Some(noise) => (
                &self.weight_mu + &(&self.weight_sigma * &noise.weights()),
                &self.bias_mu + &(&self.bias_sigma * &noise.output),
            ),
            None => (self.weight_mu.clone(), self.bias_mu.clone()),
        }
    }

    /// Drop the current noise sample so the layer acts with its mean weights.
    pub fn clear_noise(&mut self) {
        self.noise = None;
    }
}

impl LayerTrait for NoisyLayer {
    fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let (weights, biases) = self.effective_parameters();
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&weights) + &biases.view().insert_axis(Axis(0));
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Result<(Array2<f32>, LayerGradients)> {
        let (pre_activation_output, inputs) = match (&self.pre_activation_output, &self.inputs) {
            (Some(p), Some(i)) => (p, i),
            _ => {
                return Err(RainbowError::precondition(
                    "forward_batch() must be called before backward_batch()",
                ))
            }
        };

        let activation_deriv = self.activation.derivative_batch(pre_activation_output.view());
        let adjusted_error = output_errors.to_owned() * &activation_deriv;
        let weight_gradients = inputs.t().dot(&adjusted_error);
        let bias_gradients = adjusted_error.sum_axis(Axis(0));
        let (weights, _) = self.effective_parameters();
        let input_errors = adjusted_error.dot(&weights.t());

        let sigma = match &self.noise {
            Some(noise) => (&weight_gradients * &noise.weights(), &bias_gradients * &noise.output),
            None => (
                Array2::zeros(self.weight_sigma.dim()),
                Array1::zeros(self.bias_sigma.dim()),
            ),
        };

        Ok((
            input_errors,
            LayerGradients {
                weights: weight_gradients,
                biases: bias_gradients,
                sigma: Some(sigma),
            },
        ))
    }

    fn apply_gradients(
        &mut self,
        gradients: &LayerGradients,
        optimizer: &mut OptimizerWrapper,
        slot: usize,
        learning_rate: f32,
    ) {
        optimizer.update_weights(slot, &mut self.weight_mu, &gradients.weights, learning_rate);
        optimizer.update_biases(slot, &mut self.bias_mu, &gradients.biases, learning_rate);
        if let Some((weight_sigma, bias_sigma)) = &gradients.sigma {
            optimizer.update_weights(slot + 1, &mut self.weight_sigma, weight_sigma, learning_rate);
            optimizer.update_biases(slot + 1, &mut self.bias_sigma, bias_sigma, learning_rate);
        }
    }

    fn reset_noise<R: Rng>(&mut self, rng: &mut R) {
        self.noise = Some(FactorizedNoise::sample(self.input_size(), self.output_size(), rng));
    }

    fn output_size(&self) -> usize {
        self.weight_mu.shape()[1]
    }

    fn input_size(&self) -> usize {
        self.weight_mu.shape()[0]
    }
}
