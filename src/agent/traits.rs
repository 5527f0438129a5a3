use ndarray::ArrayView1;

use crate::error::Result;
use crate::metrics::TrainData;

/// The start / step / end protocol a harness drives an episodic agent through.
///
/// `start` begins an episode, `take_step` reports the reward of the previous action and
/// the new observation, `end` reports the final reward. Calling `take_step` or `end`
/// outside an episode is a precondition error.
pub trait EpisodicAgent {
    /// Begin an episode and return the first action.
    fn start(&mut self, observation: ArrayView1<f32>) -> Result<usize>;

    /// Report the reward of the last action and the observation it led to; returns the next action.
    fn take_step(&mut self, reward: f32, observation: ArrayView1<f32>) -> Result<usize>;

    /// Report the final reward and return the episode's total reward.
    fn end(&mut self, reward: f32) -> Result<f32>;

    /// Diagnostics of the most recent training update, `None` before the first one.
    fn get_train_data(&self) -> Option<&TrainData>;
}
