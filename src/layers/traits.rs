use ndarray::{Array1, Array2, ArrayView2};
use rand::Rng;

use crate::error::Result;
use crate::optimizer::OptimizerWrapper;

/// Parameter gradients produced by one layer's backward pass.
#[derive(Debug, Clone)]
pub struct LayerGradients {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    /// Gradients of the noise scales, present for noisy layers only
    pub sigma: Option<(Array2<f32>, Array1<f32>)>,
}

impl LayerGradients {
    pub fn squared_norm(&self) -> f32 {
        let mut sum = self.weights.iter().map(|g| g * g).sum::<f32>()
            + self.biases.iter().map(|g| g * g).sum::<f32>();
        if let Some((w, b)) = &self.sigma {
            sum += w.iter().map(|g| g * g).sum::<f32>() + b.iter().map(|g| g * g).sum::<f32>();
        }
        sum
    }

    pub fn scale(&mut self, factor: f32) {
        self.weights.mapv_inplace(|g| g * factor);
        self.biases.mapv_inplace(|g| g * factor);
        if let Some((w, b)) = &mut self.sigma {
            w.mapv_inplace(|g| g * factor);
            b.mapv_inplace(|g| g * factor);
        }
    }

    pub fn is_finite(&self) -> bool {
        let finite = self.weights.iter().all(|g| g.is_finite()) && self.biases.iter().all(|g| g.is_finite());
        match &self.sigma {
            Some((w, b)) => finite && w.iter().all(|g| g.is_finite()) && b.iter().all(|g| g.is_finite()),
            None => finite,
        }
    }
}

/// Trait defining the interface for value-network layers
pub trait Layer {
    /// Perform forward propagation for a batch of inputs, caching what backward needs
    fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32>;

    /// Backpropagate output errors; returns the errors w.r.t. the inputs and the parameter gradients
    fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Result<(Array2<f32>, LayerGradients)>;

    /// Apply one optimiser step. A layer owns optimiser slots `slot` and `slot + 1`.
    fn apply_gradients(
        &mut self,
        gradients: &LayerGradients,
        optimizer: &mut OptimizerWrapper,
        slot: usize,
        learning_rate: f32,
    );

    /// Re-sample parameter noise; layers without noise ignore it
    fn reset_noise<R: Rng>(&mut self, _rng: &mut R) {}

    /// Get the output size of the layer
    fn output_size(&self) -> usize;

    /// Get the input size of the layer
    fn input_size(&self) -> usize;
}
