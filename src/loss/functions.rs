use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Floor applied to probabilities before taking logarithms
const LOG_EPSILON: f32 = 1e-8;

/// Trait defining the interface for per-sample training losses.
///
/// Rows of `predictions` and `targets` are samples. The agent weights each sample's loss by
/// its importance-sampling weight, so losses are reported per row rather than averaged.
pub trait Loss: Send + Sync {
    /// Loss of every row
    fn per_sample(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array1<f32>;

    /// Gradient of each row's loss with respect to the pre-activation outputs
    /// (logits for [`CategoricalCrossEntropy`], raw values for [`HuberLoss`])
    fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array2<f32>;
}

/// Cross-entropy between a projected target distribution and a softmax prediction.
///
/// `predictions` are probabilities. Combined with the softmax, the gradient with respect
/// to the logits reduces to `p - m`.
#[derive(Clone, Copy, Debug)]
pub struct CategoricalCrossEntropy;

impl Loss for CategoricalCrossEntropy {
    fn per_sample(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array1<f32> {
        predictions
            .axis_iter(Axis(0))
            .zip(targets.axis_iter(Axis(0)))
            .map(|(p, m)| {
                -m.iter()
                    .zip(p.iter())
                    .map(|(&m, &p)| m * p.max(LOG_EPSILON).ln())
                    .sum::<f32>()
            })
            .collect()
    }

    fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array2<f32> {
        &predictions - &targets
    }
}

/// Huber loss (smooth L1) on scalar values
#[derive(Clone, Copy, Debug)]
pub struct HuberLoss {
    pub delta: f32,
}

impl HuberLoss {
    pub fn new(delta: f32) -> Self {
        HuberLoss { delta }
    }
}

impl Default for HuberLoss {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Loss for HuberLoss {
    fn per_sample(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array1<f32> {
        let diff = &predictions - &targets;
        diff.mapv(|x| {
            let abs_x = x.abs();
            if abs_x <= self.delta {
                0.5 * x * x
            } else {
                self.delta * abs_x - 0.5 * self.delta * self.delta
            }
        })
        .sum_axis(Axis(1))
    }

    fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array2<f32> {
        let diff = &predictions - &targets;
        diff.mapv(|x| x.clamp(-self.delta, self.delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cross_entropy_matches_definition() {
        let p = array![[0.5, 0.5], [0.25, 0.75]];
        let m = array![[1.0, 0.0], [0.0, 1.0]];
        let loss = CategoricalCrossEntropy.per_sample(p.view(), m.view());
        assert!((loss[0] - 2f32.ln()).abs() < 1e-6);
        assert!((loss[1] + 0.75f32.ln()).abs() < 1e-6);

        let grad = CategoricalCrossEntropy.gradient_batch(p.view(), m.view());
        assert_eq!(grad, array![[-0.5, 0.5], [0.25, -0.25]]);
    }

    #[test]
    fn test_cross_entropy_zero_probability_is_finite() {
        let p = array![[0.0, 1.0]];
        let m = array![[1.0, 0.0]];
        let loss = CategoricalCrossEntropy.per_sample(p.view(), m.view());
        assert!(loss[0].is_finite());
        assert!(loss[0] > 10.0);
    }

    #[test]
    fn test_huber_regions() {
        let huber = HuberLoss::default();
        let pred = array![[0.5], [3.0]];
        let target = array![[0.0], [0.0]];
        let loss = huber.per_sample(pred.view(), target.view());
        assert!((loss[0] - 0.125).abs() < 1e-6);
        assert!((loss[1] - 2.5).abs() < 1e-6);

        let grad = huber.gradient_batch(pred.view(), target.view());
        assert_eq!(grad, array![[0.5], [1.0]]);
    }
}
