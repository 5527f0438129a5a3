use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{Result, RainbowError};
use crate::optimizer::{Optimizer, OptimizerWrapper};
use super::initialization::WeightInit;
use super::traits::{Layer as LayerTrait, LayerGradients};

/// A fully connected (dense) layer in a neural network
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

impl DenseLayer {
    /// Create a new dense layer, initialised for its activation (He for ReLU, Xavier for linear).
    pub fn new<R: Rng>(input_size: usize, output_size: usize, activation: Activation, rng: &mut R) -> Self {
        Self::new_with_init(input_size, output_size, activation, WeightInit::for_activation(&activation), rng)
    }

    pub fn new_with_init<R: Rng>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Self {
        let weights = init.initialize_weights((input_size, output_size), rng);
        let biases = init.initialize_biases(output_size, rng);
        DenseLayer {
            weights,
            biases,
            activation,
            pre_activation_output: None,
            inputs: None,
        }
    }

    pub fn with_weights(mut self, weights: Array2<f32>) -> Self {
        assert_eq!(weights.dim(), self.weights.dim());
        self.weights = weights;
        self
    }

    pub fn with_biases(mut self, biases: Array1<f32>) -> Self {
        assert_eq!(biases.dim(), self.biases.dim());
        self.biases = biases;
        self
    }
}

impl LayerTrait for DenseLayer {
    fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
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
        let input_errors = adjusted_error.dot(&self.weights.t());

        Ok((
            input_errors,
            LayerGradients {
                weights: weight_gradients,
                biases: bias_gradients,
                sigma: None,
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
        optimizer.update_weights(slot, &mut self.weights, &gradients.weights, learning_rate);
        optimizer.update_biases(slot, &mut self.biases, &gradients.biases, learning_rate);
    }

    fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }

    fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::SGD;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_forward_shape() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut layer = DenseLayer::new(3, 5, Activation::Relu, &mut rng);
        let out = layer.forward_batch(array![[1.0, 2.0, 3.0], [0.0, 0.0, 0.0]].view());
        assert_eq!(out.dim(), (2, 5));
        assert!(out.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_backward_requires_forward() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = DenseLayer::new(2, 2, Activation::Linear, &mut rng);
        assert!(layer.backward_batch(array![[1.0, 1.0]].view()).is_err());
    }

    #[test]
    fn test_gradient_step_reduces_squared_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut layer = DenseLayer::new(2, 1, Activation::Linear, &mut rng);
        let mut optimizer = OptimizerWrapper::SGD(SGD::new());
        let input = array![[1.0, -1.0]];
        let target = 3.0;

        let out = layer.forward_batch(input.view());
        let before = (out[[0, 0]] - target).powi(2);
        let error = array![[out[[0, 0]] - target]];
        let (_, grads) = layer.backward_batch(error.view()).unwrap();
        layer.apply_gradients(&grads, &mut optimizer, 0, 0.1);

        let out = layer.forward_batch(input.view());
        let after = (out[[0, 0]] - target).powi(2);
        assert!(after < before);
    }
}
