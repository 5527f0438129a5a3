//! n-step return accumulation.
//!
//! Single environment steps go in, composite [`Transition`]s come out. A transition is
//! emitted once the window holds `n` steps; at episode end the remaining, progressively
//! shorter windows are flushed so every step starts exactly one transition.

use std::collections::VecDeque;

use crate::error::{Result, RainbowError};
use crate::replay_buffer::{Experience, Transition};

#[derive(Clone, Debug)]
pub struct NStepAccumulator {
    n: usize,
    gamma: f32,
    window: VecDeque<Experience>,
}

impl NStepAccumulator {
    pub fn new(n: usize, gamma: f32) -> Result<Self> {
        if n == 0 {
            return Err(RainbowError::invalid_parameter("n_step", "must be at least 1"));
        }
        Ok(NStepAccumulator {
            n,
            gamma,
            window: VecDeque::with_capacity(n),
        })
    }

    pub fn horizon(&self) -> usize {
        self.n
    }

    /// Steps currently waiting for enough successors.
    pub fn pending(&self) -> usize {
        self.window.len()
    }

    /// Add one step. Returns a full-horizon transition once `n` steps are buffered, plus
    /// every partial window when the step is terminal.
    pub fn push(&mut self, step: Experience) -> Vec<Transition> {
        let done = step.done;
        self.window.push_back(step);

        let mut emitted = Vec::new();
        if self.window.len() >= self.n {
            emitted.push(self.emit());
            self.window.pop_front();
        }
        if done {
            emitted.extend(self.flush());
        }
        emitted
    }

    /// Emit every remaining window, each one step shorter than the last.
    pub fn flush(&mut self) -> Vec<Transition> {
        let mut emitted = Vec::with_capacity(self.window.len());
        while !self.window.is_empty() {
            emitted.push(self.emit());
            self.window.pop_front();
        }
        emitted
    }

    /// Drop pending steps without emitting them.
    pub fn clear(&mut self) {
        self.window.clear();
    }

    fn emit(&self) -> Transition {
        let first = &self.window[0];
        let last = &self.window[self.window.len() - 1];

        let mut reward = 0.0;
        let mut discount = 1.0;
        for step in self.window.iter() {
            reward += discount * step.reward;
            discount *= self.gamma;
        }

        Transition {
            observation: first.state.clone(),
            action: first.action,
            reward,
            next_observation: last.next_state.clone(),
            done: last.done,
            n: self.window.len(),
        }
    }
}
