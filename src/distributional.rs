//! Categorical value distributions and the distributional Bellman projection.
//!
//! A [`Support`] is a fixed grid of `atoms` values spanning `[min_val, max_val]`. A value
//! distribution is a probability vector over that grid. Shifting the grid by a Bellman
//! update (`r + gamma^n * z`) moves the atoms off the grid; [`Support::project`] puts the
//! mass back by splitting each shifted atom between its two neighbouring grid points.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayView3, Axis};
use serde::{Serialize, Deserialize};

use crate::error::{Result, RainbowError};

/// Distance under which a shifted atom counts as landing exactly on a grid point.
const SNAP_TOLERANCE: f32 = 1e-5;

/// Fixed, evenly spaced set of atoms.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Support {
    min_val: f32,
    max_val: f32,
    atoms: Array1<f32>,
    delta: f32,
}

impl Support {
    pub fn new(atoms: usize, min_val: f32, max_val: f32) -> Result<Self> {
        if atoms < 2 {
            return Err(RainbowError::invalid_parameter(
                "atoms".to_string(),
                format!("need at least 2 atoms, got {}", atoms),
            ));
        }
        if !min_val.is_finite() || !max_val.is_finite() || min_val >= max_val {
            return Err(RainbowError::invalid_parameter(
                "min_val".to_string(),
                format!("min_val ({}) must be finite and below max_val ({})", min_val, max_val),
            ));
        }

        let delta = (max_val - min_val) / (atoms - 1) as f32;
        let atoms = Array1::from_iter((0..atoms).map(|i| min_val + i as f32 * delta));
        Ok(Support { min_val, max_val, atoms, delta })
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atoms(&self) -> ArrayView1<f32> {
        self.atoms.view()
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn min_val(&self) -> f32 {
        self.min_val
    }

    pub fn max_val(&self) -> f32 {
        self.max_val
    }

    /// Expected value of one distribution.
    pub fn expectation(&self, probs: ArrayView1<f32>) -> f32 {
        probs.dot(&self.atoms)
    }

    /// Expected value per (sample, action) for a `(batch, actions, atoms)` array.
    pub fn expectations(&self, probs: ArrayView3<f32>) -> Array2<f32> {
        let (batch, actions, _) = probs.dim();
        let mut values = Array2::zeros((batch, actions));
        for ((i, a), value) in values.indexed_iter_mut() {
            *value = probs.slice(ndarray::s![i, a, ..]).dot(&self.atoms);
        }
        values
    }

    /// Project `r + discount * z` (or just `r` when `done`) back onto the support.
    ///
    /// `discount` is the already-compounded `gamma^n` of the transition. The input must be
    /// a probability vector over this support; the output is one as well.
    pub fn project(&self, probs: ArrayView1<f32>, reward: f32, discount: f32, done: bool) -> Result<Array1<f32>> {
        if probs.len() != self.len() {
            return Err(RainbowError::dimension_mismatch(
                format!("{} atoms", self.len()),
                format!("{} atoms", probs.len()),
            ));
        }

        let last = (self.len() - 1) as f32;
        let mut projected = Array1::<f32>::zeros(self.len());

        for (&z, &p) in self.atoms.iter().zip(probs.iter()) {
            let tz = if done { reward } else { reward + discount * z };
            if !tz.is_finite() || !p.is_finite() {
                return Err(RainbowError::NumericalError(format!(
                    "non-finite Bellman target (tz = {}, p = {})",
                    tz, p
                )));
            }
            let tz = tz.clamp(self.min_val, self.max_val);

            let mut b = ((tz - self.min_val) / self.delta).clamp(0.0, last);
            if (b - b.round()).abs() < SNAP_TOLERANCE {
                b = b.round();
            }
            let l = b.floor();
            let u = b.ceil();

            if l == u {
                projected[l as usize] += p;
            } else {
                projected[l as usize] += p * (u - b);
                projected[u as usize] += p * (b - l);
            }
        }

        Ok(projected)
    }

    /// Row-wise [`Support::project`] for a batch of next-state distributions.
    pub fn project_batch(
        &self,
        probs: ArrayView2<f32>,
        rewards: &[f32],
        discounts: &[f32],
        dones: &[bool],
    ) -> Result<Array2<f32>> {
        let batch = probs.nrows();
        if rewards.len() != batch || discounts.len() != batch || dones.len() != batch {
            return Err(RainbowError::dimension_mismatch(
                format!("{} rewards/discounts/dones", batch),
                format!("{}/{}/{}", rewards.len(), discounts.len(), dones.len()),
            ));
        }

        let mut targets = Array2::zeros((batch, self.len()));
        for (i, row) in probs.axis_iter(Axis(0)).enumerate() {
            let projected = self.project(row, rewards[i], discounts[i], dones[i])?;
            targets.row_mut(i).assign(&projected);
        }
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_support_grid() {
        let support = Support::new(5, 0.0, 4.0).unwrap();
        assert_eq!(support.atoms(), array![0.0, 1.0, 2.0, 3.0, 4.0].view());
        assert_eq!(support.delta(), 1.0);
    }

    #[test]
    fn test_invalid_support() {
        assert!(Support::new(1, 0.0, 1.0).is_err());
        assert!(Support::new(5, 1.0, 1.0).is_err());
        assert!(Support::new(5, 2.0, -1.0).is_err());
    }

    #[test]
    fn test_exact_landing_does_not_split() {
        let support = Support::new(5, 0.0, 4.0).unwrap();
        let probs = array![0.0, 1.0, 0.0, 0.0, 0.0];
        // 1 + 1.0 * 1 = 2 lands on atom 2
        let projected = support.project(probs.view(), 1.0, 1.0, false).unwrap();
        assert_eq!(projected, array![0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_split_between_neighbours() {
        let support = Support::new(5, 0.0, 4.0).unwrap();
        let probs = array![1.0, 0.0, 0.0, 0.0, 0.0];
        let projected = support.project(probs.view(), 1.25, 0.9, false).unwrap();
        assert!((projected[1] - 0.75).abs() < 1e-6);
        assert!((projected[2] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_terminal_collapses_to_reward() {
        let support = Support::new(5, 0.0, 4.0).unwrap();
        let probs = array![0.5, 0.25, 0.125, 0.125, 0.0];
        let projected = support.project(probs.view(), 3.0, 0.99, true).unwrap();
        assert_eq!(projected, array![0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_targets_outside_range_are_clamped() {
        let support = Support::new(3, -1.0, 1.0).unwrap();
        let probs = array![0.5, 0.25, 0.25];
        let projected = support.project(probs.view(), 10.0, 1.0, false).unwrap();
        assert_eq!(projected, array![0.0, 0.0, 1.0]);
        let projected = support.project(probs.view(), -10.0, 1.0, false).unwrap();
        assert_eq!(projected, array![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_identity_shift_is_unchanged() {
        let support = Support::new(21, 0.0, 500.0).unwrap();
        let probs = Array1::from_iter((0..21).map(|i| (i + 1) as f32));
        let probs = &probs / probs.sum();
        let projected = support.project(probs.view(), 0.0, 1.0, false).unwrap();
        for (a, b) in projected.iter().zip(probs.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_nan_reward_is_surfaced() {
        let support = Support::new(3, 0.0, 2.0).unwrap();
        let probs = array![1.0, 0.0, 0.0];
        let err = support.project(probs.view(), f32::NAN, 1.0, false).unwrap_err();
        assert!(matches!(err, RainbowError::NumericalError(_)));
    }

    #[test]
    fn test_expectations() {
        let support = Support::new(3, 0.0, 2.0).unwrap();
        let probs = array![[[1.0, 0.0, 0.0], [0.0, 0.5, 0.5]]];
        let values = support.expectations(probs.view());
        assert_eq!(values, array![[0.0, 1.5]]);
    }
}
