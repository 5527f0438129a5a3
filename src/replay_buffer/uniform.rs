use rand::seq::index;
use rand::Rng;

use crate::error::{Result, RainbowError};
use super::transition::Transition;
use super::{RecordHandle, SampledBatch};

/// Circular replay store with uniform sampling and unit importance weights.
#[derive(Clone)]
pub struct UniformBuffer {
    buffer: Vec<(Transition, u64)>,
    capacity: usize,
    cursor: usize,
    next_generation: u64,
}

impl UniformBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(RainbowError::invalid_parameter("replay_mem", "Capacity must be greater than 0"));
        }

        Ok(UniformBuffer {
            buffer: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
            next_generation: 0,
        })
    }

    pub fn push(&mut self, transition: Transition) -> RecordHandle {
        let generation = self.next_generation;
        self.next_generation += 1;

        let slot = self.cursor;
        if self.buffer.len() < self.capacity {
            self.buffer.push((transition, generation));
        } else {
            self.buffer[slot] = (transition, generation);
        }
        self.cursor = (self.cursor + 1) % self.capacity;

        RecordHandle { slot, generation }
    }

    /// Draw without replacement when the buffer holds enough records, with replacement otherwise.
    pub fn sample<R: Rng>(&self, batch_size: usize, rng: &mut R) -> Result<SampledBatch> {
        if self.buffer.is_empty() {
            return Err(RainbowError::EmptyBuffer("cannot sample from an empty replay buffer".to_string()));
        }

        let slots: Vec<usize> = if batch_size <= self.buffer.len() {
            index::sample(rng, self.buffer.len(), batch_size).into_vec()
        } else {
            (0..batch_size).map(|_| rng.gen_range(0..self.buffer.len())).collect()
        };

        let mut transitions = Vec::with_capacity(batch_size);
        let mut handles = Vec::with_capacity(batch_size);
        for slot in slots {
            let (transition, generation) = &self.buffer[slot];
            transitions.push(transition.clone());
            handles.push(RecordHandle { slot, generation: *generation });
        }

        Ok(SampledBatch {
            transitions,
            weights: vec![1.0; batch_size],
            handles,
            beta: 0.0,
        })
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
