use ndarray::Array1;
use serde::{Serialize, Deserialize};

/// One environment step as seen by the agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub done: bool,
}

/// A composite n-step transition as stored in replay memory.
///
/// `reward` is the discounted return over `n` steps and `next_observation` is the
/// observation `n` steps after `observation`. Bootstrapping from it must discount by
/// `gamma^n`, where `n` may be shorter than the configured horizon at episode ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub observation: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_observation: Array1<f32>,
    pub done: bool,
    pub n: usize,
}

impl Transition {
    /// `gamma^n` for this transition's horizon.
    pub fn bootstrap_discount(&self, gamma: f32) -> f32 {
        gamma.powi(self.n as i32)
    }
}
