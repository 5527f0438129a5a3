use std::collections::VecDeque;
use serde::{Serialize, Deserialize};

use super::TrainData;

/// Rolling record of episode rewards and the losses sampled alongside them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeTracker {
    /// Rewards of the most recent episodes
    pub episode_rewards: VecDeque<f32>,

    /// `(episode, loss)` pairs recorded with [`EpisodeTracker::record_loss`]
    pub losses: VecDeque<(usize, f32)>,

    history_size: usize,
    episode_count: usize,
    best_reward: Option<f32>,
}

impl EpisodeTracker {
    pub fn new(history_size: usize) -> Self {
        EpisodeTracker {
            episode_rewards: VecDeque::with_capacity(history_size),
            losses: VecDeque::with_capacity(history_size),
            history_size: history_size.max(1),
            episode_count: 0,
            best_reward: None,
        }
    }

    /// Record the total reward of a finished episode.
    pub fn record_episode(&mut self, reward: f32) {
        if self.episode_rewards.len() >= self.history_size {
            self.episode_rewards.pop_front();
        }
        self.episode_rewards.push_back(reward);
        self.episode_count += 1;
        self.best_reward = Some(self.best_reward.map_or(reward, |best| best.max(reward)));
    }

    /// Record the loss of the latest training update, if there was one.
    pub fn record_loss(&mut self, data: Option<&TrainData>) {
        if let Some(data) = data {
            if self.losses.len() >= self.history_size {
                self.losses.pop_front();
            }
            self.losses.push_back((self.episode_count, data.loss));
        }
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn best_reward(&self) -> Option<f32> {
        self.best_reward
    }

    /// Mean reward over the last `window` episodes (fewer if not enough were recorded).
    pub fn mean_reward(&self, window: usize) -> Option<f32> {
        let n = window.min(self.episode_rewards.len());
        if n == 0 {
            return None;
        }
        let sum: f32 = self.episode_rewards.iter().rev().take(n).sum();
        Some(sum / n as f32)
    }
}
