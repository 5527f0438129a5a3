//! # Metrics Module
//!
//! Diagnostics reported by the agent after each training update, and a small episode
//! reward history for driver loops.

pub mod tracker;
pub mod train_data;

pub use tracker::EpisodeTracker;
pub use train_data::TrainData;
