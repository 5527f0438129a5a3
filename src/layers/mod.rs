//! # Layers Module
//!
//! Building blocks of the value network. Every layer caches its inputs and
//! pre-activations on `forward_batch` so the following `backward_batch` can compute
//! parameter gradients without an autodiff tape.
//!
//! - [`DenseLayer`]: fully connected layer
//! - [`NoisyLayer`]: fully connected layer with factorised Gaussian parameter noise,
//!   used for exploration instead of (or on top of) epsilon-greedy
//! - [`NetLayer`]: tagged union of the two, chosen once when the network is built

pub mod traits;
pub mod dense;
pub mod noisy;
pub mod initialization;

use ndarray::{Array2, ArrayView2};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::Result;
use crate::optimizer::OptimizerWrapper;

pub use traits::{Layer as LayerTrait, LayerGradients};
pub use dense::DenseLayer;
pub use noisy::NoisyLayer;
pub use initialization::WeightInit;

/// How the network's layers are built.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum LayerKind {
    Dense,
    Noisy { sigma_zero: f32 },
}

impl LayerKind {
    pub fn build<R: Rng>(&self, input_size: usize, output_size: usize, activation: Activation, rng: &mut R) -> NetLayer {
        match self {
            LayerKind::Dense => NetLayer::Dense(DenseLayer::new(input_size, output_size, activation, rng)),
            LayerKind::Noisy { sigma_zero } => {
                NetLayer::Noisy(NoisyLayer::new(input_size, output_size, activation, *sigma_zero, rng))
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum NetLayer {
    Dense(DenseLayer),
    Noisy(NoisyLayer),
}

impl LayerTrait for NetLayer {
    fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        match self {
            NetLayer::Dense(layer) => layer.forward_batch(inputs),
            NetLayer::Noisy(layer) => layer.forward_batch(inputs),
        }
    }

    fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Result<(Array2<f32>, LayerGradients)> {
        match self {
            NetLayer::Dense(layer) => layer.backward_batch(output_errors),
            NetLayer::Noisy(layer) => layer.backward_batch(output_errors),
        }
    }

    fn apply_gradients(
        &mut self,
        gradients: &LayerGradients,
        optimizer: &mut OptimizerWrapper,
        slot: usize,
        learning_rate: f32,
    ) {
        match self {
            NetLayer::Dense(layer) => layer.apply_gradients(gradients, optimizer, slot, learning_rate),
            NetLayer::Noisy(layer) => layer.apply_gradients(gradients, optimizer, slot, learning_rate),
        }
    }

    fn reset_noise<R: Rng>(&mut self, rng: &mut R) {
        if let NetLayer::Noisy(layer) = self {
            layer.reset_noise(rng);
        }
    }

    fn output_size(&self) -> usize {
        match self {
            NetLayer::Dense(layer) => layer.output_size(),
            NetLayer::Noisy(layer) => layer.output_size(),
        }
    }

    fn input_size(&self) -> usize {
        match self {
            NetLayer::Dense(layer) => layer.input_size(),
            NetLayer::Noisy(layer) => layer.input_size(),
        }
    }
}
