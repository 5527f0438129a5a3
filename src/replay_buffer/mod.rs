//! # Experience Replay Module
//!
//! Storage for n-step transitions and the two sampling strategies the agent can run with:
//!
//! - [`SumTreeBuffer`]: proportional prioritized replay over a sum tree, with
//!   importance-sampling weights and an annealed β
//! - [`UniformBuffer`]: plain circular buffer with uniform sampling
//!
//! [`ReplayMemory`] selects between them once, at agent construction.

pub mod iw_scheduler;
pub mod prioritized;
pub mod sum_tree;
pub mod transition;
pub mod uniform;

use rand::Rng;

use crate::error::Result;

pub use iw_scheduler::BetaScheduler;
pub use prioritized::{SumTreeBuffer, MIN_PRIORITY};
pub use sum_tree::SumTree;
pub use transition::{Experience, Transition};
pub use uniform::UniformBuffer;

/// Identifies a stored record. The generation detects records evicted after sampling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordHandle {
    pub slot: usize,
    pub generation: u64,
}

/// A sampled mini-batch; `weights[i]` is the importance-sampling weight of `transitions[i]`.
#[derive(Clone, Debug)]
pub struct SampledBatch {
    pub transitions: Vec<Transition>,
    pub weights: Vec<f32>,
    pub handles: Vec<RecordHandle>,
    /// β used for the weights (0 for uniform sampling)
    pub beta: f32,
}

impl SampledBatch {
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Replay strategy chosen at construction.
pub enum ReplayMemory {
    Prioritized(SumTreeBuffer),
    Uniform(UniformBuffer),
}

impl ReplayMemory {
    pub fn push(&mut self, transition: Transition) -> RecordHandle {
        match self {
            ReplayMemory::Prioritized(buffer) => buffer.push(transition),
            ReplayMemory::Uniform(buffer) => buffer.push(transition),
        }
    }

    pub fn sample<R: Rng>(&mut self, batch_size: usize, rng: &mut R) -> Result<SampledBatch> {
        match self {
            ReplayMemory::Prioritized(buffer) => buffer.sample(batch_size, rng),
            ReplayMemory::Uniform(buffer) => buffer.sample(batch_size, rng),
        }
    }

    /// Write back refreshed priorities; uniform replay ignores them.
    pub fn update_priorities(&mut self, handles: &[RecordHandle], priorities: &[f32]) -> Result<()> {
        if let ReplayMemory::Prioritized(buffer) = self {
            for (&handle, &priority) in handles.iter().zip(priorities.iter()) {
                buffer.update_priority(handle, priority)?;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        match self {
            ReplayMemory::Prioritized(buffer) => buffer.len(),
            ReplayMemory::Uniform(buffer) => buffer.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        match self {
            ReplayMemory::Prioritized(buffer) => buffer.capacity(),
            ReplayMemory::Uniform(buffer) => buffer.capacity(),
        }
    }

    pub fn is_prioritized(&self) -> bool {
        matches!(self, ReplayMemory::Prioritized(_))
    }
}
