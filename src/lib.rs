//! # Rainbow - Deep Q-Learning with the Rainbow Extensions
//!
//! A single-agent reinforcement learning library for discrete-action, continuous-observation
//! environments. The agent combines the six DQN extensions of Rainbow, each of which can be
//! switched off independently:
//!
//! - **Double Q-learning**: online network selects, target network evaluates
//! - **Prioritized replay**: sum-tree sampling proportional to the last observed loss
//! - **Dueling networks**: separate value and advantage streams
//! - **Multi-step returns**: n-step discounted rewards
//! - **Distributional RL**: categorical value distributions over a fixed support
//! - **Noisy nets**: factorised Gaussian parameter noise for exploration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rainbow::agent::{EpisodicAgent, RainbowAgent};
//! use rainbow::config::RainbowConfig;
//! use ndarray::array;
//!
//! // CartPole: 4 observation features, 2 actions
//! let mut agent = RainbowAgent::new(4, 2, RainbowConfig::default()).unwrap();
//!
//! let observation = array![0.01, -0.02, 0.03, 0.04];
//! let mut action = agent.start(observation.view()).unwrap();
//! // ... step the environment with `action` ...
//! action = agent.take_step(1.0, observation.view()).unwrap();
//! let total = agent.end(1.0).unwrap();
//!
//! if let Some(data) = agent.get_train_data() {
//!     println!("loss {}", data.loss);
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions and row-wise softmax
//! - [`agent`] - The Rainbow agent and its episodic protocol
//! - [`config`] - Agent configuration, YAML/JSON persistence and validation
//! - [`distributional`] - Categorical support and Bellman projection
//! - [`error`] - Error types and result handling
//! - [`layers`] - Dense and noisy layers
//! - [`loss`] - Per-sample training losses
//! - [`metrics`] - Training diagnostics
//! - [`n_step`] - n-step return accumulation
//! - [`network`] - Value network trait, ndarray implementation and online/target pair
//! - [`optimizer`] - Optimization algorithms and gradient clipping
//! - [`replay_buffer`] - Prioritized and uniform experience replay

pub mod activations;
pub mod agent;
pub mod config;
pub mod distributional;
pub mod error;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod n_step;
pub mod network;
pub mod optimizer;
pub mod replay_buffer;

pub use agent::{EpisodicAgent, RainbowAgent};
pub use config::RainbowConfig;
pub use error::{RainbowError, Result};
pub use metrics::TrainData;

#[cfg(test)]
mod tests;
