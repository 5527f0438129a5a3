use serde::{Serialize, Deserialize};

/// Diagnostics of the most recent training update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainData {
    /// Importance-weighted mean loss of the mini-batch
    pub loss: f32,

    /// Mean expected value of the actions taken in the mini-batch
    pub mean_q: f32,

    /// Global gradient norm before clipping
    pub grad_norm: f32,

    /// Importance-sampling exponent used for the batch (0 for uniform replay)
    pub beta: f32,

    /// Training updates performed so far, this one included
    pub updates: usize,

    /// Environment steps taken when the update ran
    pub steps: usize,
}
