//! # Agent Module
//!
//! The Rainbow agent and the pieces it is assembled from.
//!
//! ## Core Concepts
//!
//! - **Episodic protocol**: a harness drives the agent through `start`, `take_step` and
//!   `end` ([`EpisodicAgent`]); stepping outside an episode is a precondition error
//! - **Bootstrap targets**: the target network evaluates the next state at an action picked
//!   by the online network (double DQN) or by itself ([`TargetSelection`])
//! - **Return model**: value distributions over a fixed support, or plain scalar Q values
//!   ([`ReturnModel`])
//! - **Exploration**: parameter noise inside the network and/or epsilon-greedy ([`EpsilonGreedy`])
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use rainbow::agent::{EpisodicAgent, RainbowAgent};
//! use rainbow::config::{Features, RainbowConfig};
//! use ndarray::array;
//!
//! // Plain DQN with a target network and 3-step returns
//! let config = RainbowConfig::default().features(Features::vanilla()).eps(0.1);
//! let mut agent = RainbowAgent::new(4, 2, config).unwrap();
//!
//! let action = agent.start(array![0.1, 0.2, -0.3, 0.4].view()).unwrap();
//! ```

pub mod explorer;
pub mod target;
pub mod traits;

mod rainbow;

pub use explorer::{argmax, EpsilonGreedy};
pub use rainbow::RainbowAgent;
pub use target::{ReturnModel, TargetSelection};
pub use traits::EpisodicAgent;
