//! # Loss Module
//!
//! Training losses, reported per sample so they can double as replay priorities.

pub mod functions;

use ndarray::{Array1, Array2, ArrayView2};

pub use functions::{CategoricalCrossEntropy, HuberLoss, Loss};

/// The loss an agent trains with, fixed by its return model.
#[derive(Clone, Copy, Debug)]
pub enum LossWrapper {
    CrossEntropy(CategoricalCrossEntropy),
    Huber(HuberLoss),
}

impl Loss for LossWrapper {
    fn per_sample(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array1<f32> {
        match self {
            LossWrapper::CrossEntropy(loss) => loss.per_sample(predictions, targets),
            LossWrapper::Huber(loss) => loss.per_sample(predictions, targets),
        }
    }

    fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array2<f32> {
        match self {
            LossWrapper::CrossEntropy(loss) => loss.gradient_batch(predictions, targets),
            LossWrapper::Huber(loss) => loss.gradient_batch(predictions, targets),
        }
    }
}
