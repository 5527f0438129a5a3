//! Scheduling the exponent of importance weight for prioritized replay.
use serde::{Deserialize, Serialize};

/// Linear schedule of β from `beta_start` to `beta_end` over `anneal_period` sampling calls.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct BetaScheduler {
    /// Initial value of β.
    pub beta_start: f32,

    /// Final value of β.
    pub beta_end: f32,

    /// Sampling calls after which β stays at `beta_end`.
    pub anneal_period: usize,
}

impl BetaScheduler {
    pub fn new(beta_start: f32, beta_end: f32, anneal_period: usize) -> Self {
        Self { beta_start, beta_end, anneal_period }
    }

    pub fn beta(&self, n_samples: usize) -> f32 {
        if n_samples >= self.anneal_period {
            self.beta_end
        } else {
            let d = self.beta_end - self.beta_start;
            self.beta_start + d * (n_samples as f32 / self.anneal_period as f32)
        }
    }
}
