//! Bootstrap target construction.
//!
//! [`TargetSelection`] decides which next action the target network is evaluated at;
//! [`ReturnModel`] turns network outputs into Q values and builds the per-sample training
//! targets (a projected distribution or a scalar TD target).
use ndarray::{s, Array2, ArrayView2, ArrayView3, Axis};

use crate::distributional::Support;
use crate::error::{Result, RainbowError};
use crate::loss::{CategoricalCrossEntropy, HuberLoss, LossWrapper};
use super::explorer::argmax;

/// How the bootstrap action is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSelection {
    /// Online network picks the action, target network evaluates it
    Double,
    /// Target network both picks and evaluates
    Max,
}

impl TargetSelection {
    pub fn from_no_double(no_double: bool) -> Self {
        if no_double {
            TargetSelection::Max
        } else {
            TargetSelection::Double
        }
    }

    /// Target network output row per sample at its bootstrap action.
    ///
    /// `Double` picks the action greedily on `online_next` and `Max` on `target_next`;
    /// both read the row from `target_next`. `online_next` is only required for `Double`.
    pub fn bootstrap_rows(
        &self,
        model: &ReturnModel,
        online_next: Option<ArrayView3<f32>>,
        target_next: ArrayView3<f32>,
    ) -> Result<Array2<f32>> {
        let actions = match (self, online_next) {
            (TargetSelection::Double, Some(online_next)) => {
                if online_next.dim() != target_next.dim() {
                    return Err(RainbowError::dimension_mismatch(
                        format!("{:?}", target_next.dim()),
                        format!("{:?}", online_next.dim()),
                    ));
                }
                bootstrap_actions(model.q_values(online_next).view())
            }
            (TargetSelection::Double, None) => {
                return Err(RainbowError::precondition(
                    "double target selection needs the online network's next-state outputs",
                ))
            }
            (TargetSelection::Max, _) => bootstrap_actions(model.q_values(target_next).view()),
        };

        let (batch, _, atoms) = target_next.dim();
        let mut rows = Array2::zeros((batch, atoms));
        for (i, &a) in actions.iter().enumerate() {
            rows.row_mut(i).assign(&target_next.slice(s![i, a, ..]));
        }
        Ok(rows)
    }
}

/// What a network output row represents.
#[derive(Debug, Clone)]
pub enum ReturnModel {
    /// Probabilities over a fixed support
    Categorical(Support),
    /// A single Q value per action
    Scalar,
}

impl ReturnModel {
    pub fn atoms(&self) -> usize {
        match self {
            ReturnModel::Categorical(support) => support.len(),
            ReturnModel::Scalar => 1,
        }
    }

    /// Q value per (sample, action) from `(batch, actions, atoms)` outputs.
    pub fn q_values(&self, outputs: ArrayView3<f32>) -> Array2<f32> {
        match self {
            ReturnModel::Categorical(support) => support.expectations(outputs),
            ReturnModel::Scalar => outputs.index_axis(Axis(2), 0).to_owned(),
        }
    }

    /// Training target per sample from the target network's output rows at the
    /// bootstrap actions. `discounts` are the compounded `gamma^n` of each transition.
    pub fn targets(
        &self,
        next: ArrayView2<f32>,
        rewards: &[f32],
        discounts: &[f32],
        dones: &[bool],
    ) -> Result<Array2<f32>> {
        match self {
            ReturnModel::Categorical(support) => support.project_batch(next, rewards, discounts, dones),
            ReturnModel::Scalar => {
                let mut targets = Array2::zeros((next.nrows(), 1));
                for (i, mut row) in targets.axis_iter_mut(Axis(0)).enumerate() {
                    let bootstrap = if dones[i] { 0.0 } else { discounts[i] * next[[i, 0]] };
                    row[0] = rewards[i] + bootstrap;
                }
                if targets.iter().any(|v| !v.is_finite()) {
                    return Err(RainbowError::NumericalError("non-finite TD target".to_string()));
                }
                Ok(targets)
            }
        }
    }

    /// Cross-entropy for distributions, Huber for scalars.
    pub fn loss(&self) -> LossWrapper {
        match self {
            ReturnModel::Categorical(_) => LossWrapper::CrossEntropy(CategoricalCrossEntropy),
            ReturnModel::Scalar => LossWrapper::Huber(HuberLoss::default()),
        }
    }
}

/// Bootstrap action per sample.
pub fn bootstrap_actions(q_values: ArrayView2<f32>) -> Vec<usize> {
    q_values.axis_iter(Axis(0)).map(argmax).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_scalar_targets() {
        let model = ReturnModel::Scalar;
        let next = array![[2.0], [5.0]];
        let targets = model
            .targets(next.view(), &[1.0, 1.0], &[0.5, 0.5], &[false, true])
            .unwrap();
        assert_eq!(targets, array![[2.0], [1.0]]);
    }

    #[test]
    fn test_q_values_from_distributions() {
        let model = ReturnModel::Categorical(Support::new(3, 0.0, 2.0).unwrap());
        let outputs = array![[[0.0, 0.0, 1.0], [1.0, 0.0, 0.0]]];
        assert_eq!(model.q_values(outputs.view()), array![[2.0, 0.0]]);
        assert_eq!(bootstrap_actions(model.q_values(outputs.view()).view()), vec![0]);
    }

    /// Online prefers action 1, target prefers action 0; the rows differ per action.
    fn disagreeing_outputs() -> (ndarray::Array3<f32>, ndarray::Array3<f32>) {
        let online = array![[[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]];
        let target = array![[[0.0, 0.2, 0.8], [0.6, 0.4, 0.0]]];
        (online, target)
    }

    #[test]
    fn test_double_reads_target_at_online_argmax() {
        let model = ReturnModel::Categorical(Support::new(3, 0.0, 2.0).unwrap());
        let (online, target) = disagreeing_outputs();
        let rows = TargetSelection::Double
            .bootstrap_rows(&model, Some(online.view()), target.view())
            .unwrap();
        assert_eq!(rows, array![[0.6, 0.4, 0.0]]);
    }

    #[test]
    fn test_max_reads_target_at_own_argmax() {
        let model = ReturnModel::Categorical(Support::new(3, 0.0, 2.0).unwrap());
        let (online, target) = disagreeing_outputs();
        let rows = TargetSelection::Max
            .bootstrap_rows(&model, Some(online.view()), target.view())
            .unwrap();
        assert_eq!(rows, array![[0.0, 0.2, 0.8]]);
        let without_online = TargetSelection::Max.bootstrap_rows(&model, None, target.view()).unwrap();
        assert_eq!(without_online, rows);
    }

    #[test]
    fn test_double_scalar_rows() {
        let online = array![[[0.1], [3.0]], [[5.0], [0.2]]];
        let target = array![[[7.0], [-1.0]], [[4.0], [9.0]]];
        let rows = TargetSelection::Double
            .bootstrap_rows(&ReturnModel::Scalar, Some(online.view()), target.view())
            .unwrap();
        assert_eq!(rows, array![[-1.0], [4.0]]);
        assert!(TargetSelection::Double
            .bootstrap_rows(&ReturnModel::Scalar, None, target.view())
            .unwrap_err()
            .is_precondition());
    }

    #[test]
    fn test_loss_follows_return_model() {
        use crate::loss::Loss;

        let categorical = ReturnModel::Categorical(Support::new(3, 0.0, 2.0).unwrap());
        assert!(matches!(categorical.loss(), LossWrapper::CrossEntropy(_)));
        let p = array![[0.5, 0.5, 0.0]];
        let m = array![[0.0, 1.0, 0.0]];
        assert_eq!(categorical.loss().gradient_batch(p.view(), m.view()), array![[0.5, -0.5, 0.0]]);

        let scalar = ReturnModel::Scalar.loss();
        assert!(matches!(scalar, LossWrapper::Huber(HuberLoss { delta }) if delta == 1.0));
        assert_eq!(scalar.gradient_batch(array![[5.0]].view(), array![[1.0]].view()), array![[1.0]]);
    }

    #[test]
    fn test_selection_from_toggle() {
        assert_eq!(TargetSelection::from_no_double(false), TargetSelection::Double);
        assert_eq!(TargetSelection::from_no_double(true), TargetSelection::Max);
    }
}
