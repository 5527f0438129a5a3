//! # Network Module
//!
//! The function approximator behind the agent. [`ValueNetwork`] is the capability the agent
//! relies on; [`RainbowNetwork`] is the ndarray implementation shipped with the crate, and
//! [`ValueNetworkPair`] holds the online and target copies.

pub mod pair;
pub mod rainbow_net;

use std::fs;
use std::path::Path;

use ndarray::{Array3, ArrayView2, ArrayView3};

use crate::error::Result;
use crate::optimizer::GradientClipper;

pub use pair::ValueNetworkPair;
pub use rainbow_net::{Head, NetworkSpec, OutputKind, RainbowNetwork};

/// A differentiable map from observations to per-action value distributions.
///
/// Outputs have shape `(batch, actions, atoms)`. For a categorical network each
/// `(sample, action)` row is a probability vector; a scalar network has a single atom
/// holding the Q value.
pub trait ValueNetwork: Clone {
    fn input_size(&self) -> usize;

    fn num_actions(&self) -> usize;

    fn atoms(&self) -> usize;

    /// Evaluate a batch of observations, caching what [`ValueNetwork::backward`] needs.
    fn forward(&mut self, observations: ArrayView2<f32>) -> Result<Array3<f32>>;

    /// Backpropagate `output_gradient` (taken with respect to the outputs before the
    /// softmax) through the most recent forward pass and take one optimiser step.
    /// Returns the global gradient norm measured before clipping.
    fn backward(&mut self, output_gradient: ArrayView3<f32>, clipper: &GradientClipper) -> Result<f32>;

    /// Re-sample parameter noise. Networks without noisy layers ignore this.
    fn reset_noise(&mut self);

    /// Overwrite `target`'s parameters with a copy of this network's.
    fn clone_parameters_into(&self, target: &mut Self);

    /// Opaque parameter blob.
    fn parameters(&self) -> Result<Vec<u8>>;

    fn load_parameters(&mut self, blob: &[u8]) -> Result<()>;

    /// Write the parameter blob to a file.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.parameters()?)?;
        Ok(())
    }

    /// Read a parameter blob written by [`ValueNetwork::save`].
    fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let blob = fs::read(path)?;
        self.load_parameters(&blob)
    }
}
