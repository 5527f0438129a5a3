//! Action selection over expected action values.
use ndarray::ArrayView1;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: ArrayView1<f32>) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Epsilon-greedy explorer with a fixed epsilon.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub struct EpsilonGreedy {
    pub eps: f32,
}

impl EpsilonGreedy {
    pub fn new(eps: f32) -> Self {
        Self { eps }
    }

    /// Greedy action, replaced by a uniformly random one with probability `eps`.
    /// With `eps == 0` no randomness is drawn.
    pub fn action(&self, q_values: ArrayView1<f32>, rng: &mut impl Rng) -> usize {
        if self.eps > 0.0 && rng.gen::<f32>() < self.eps {
            rng.gen_range(0..q_values.len())
        } else {
            argmax(q_values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_argmax_ties_go_to_lowest_index() {
        assert_eq!(argmax(array![1.0, 3.0, 3.0, 2.0].view()), 1);
        assert_eq!(argmax(array![0.0, 0.0].view()), 0);
        assert_eq!(argmax(array![-1.0].view()), 0);
    }

    #[test]
    fn test_greedy_when_eps_is_zero() {
        let explorer = EpsilonGreedy::new(0.0);
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            assert_eq!(explorer.action(array![0.1, 0.5, 0.2].view(), &mut rng), 1);
        }
    }

    #[test]
    fn test_random_when_eps_is_one() {
        let explorer = EpsilonGreedy::new(1.0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [false; 3];
        for _ in 0..200 {
            seen[explorer.action(array![0.1, 0.5, 0.2].view(), &mut rng)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
