use ndarray::{Array2, ArrayView2, Axis};
use serde::{Serialize, Deserialize};

/// Activation applied after a layer's affine transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
}

impl Activation {
    /// Apply the activation function to a batch of input arrays in-place.
    pub fn apply_batch(&self, inputs: &mut Array2<f32>) {
        match self {
            Activation::Relu => {
                inputs.mapv_inplace(|v| v.max(0.0));
            }
            Activation::Linear => {}
        }
    }

    /// Compute the derivative of the activation function for a batch of pre-activations.
    pub fn derivative_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => {
                inputs.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
            }
            Activation::Linear => {
                // Derivative of linear activation is always 1
                Array2::ones(inputs.dim())
            }
        }
    }
}

/// Row-wise softmax over the last axis, shifted by the row maximum for stability.
pub fn softmax_rows(logits: ArrayView2<f32>) -> Array2<f32> {
    let mut out = logits.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        row.mapv_inplace(|x| (x - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|x| x / sum);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_relu_batch() {
        let mut x = array![[-1.0, 0.0, 2.0]];
        Activation::Relu.apply_batch(&mut x);
        assert_eq!(x, array![[0.0, 0.0, 2.0]]);
        let d = Activation::Relu.derivative_batch(array![[-1.0, 0.5]].view());
        assert_eq!(d, array![[0.0, 1.0]]);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let logits = array![[1.0, 2.0, 3.0], [1000.0, 1000.0, -1000.0]];
        let p = softmax_rows(logits.view());
        for row in p.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-6);
            assert!(row.iter().all(|&v| v >= 0.0));
        }
        assert!((p[[1, 0]] - 0.5).abs() < 1e-6);
    }
}
