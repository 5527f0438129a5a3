use rand::Rng;

use crate::error::{Result, RainbowError};
use super::iw_scheduler::BetaScheduler;
use super::sum_tree::SumTree;
use super::transition::Transition;
use super::{RecordHandle, SampledBatch};

/// Lowest priority a stored record can hold; zero would make it unsamplable.
pub const MIN_PRIORITY: f32 = 1e-6;

/// A stored transition plus the generation it was written in.
struct PriorityRecord {
    transition: Transition,
    generation: u64,
}

/// Fixed-capacity circular replay store with proportional prioritized sampling.
///
/// New records enter with the current maximum priority so each is replayed at least once
/// before its loss is known. Sampling is stratified: the priority mass is split into
/// `batch_size` equal segments and exactly one record is drawn from each.
pub struct SumTreeBuffer {
    records: Vec<Option<PriorityRecord>>,
    tree: SumTree,
    cursor: usize,
    len: usize,
    next_generation: u64,
    beta: BetaScheduler,
    sample_calls: usize,
}

impl SumTreeBuffer {
    pub fn new(capacity: usize, beta: BetaScheduler) -> Result<Self> {
        if capacity == 0 {
            return Err(RainbowError::invalid_parameter("replay_mem", "Capacity must be greater than 0"));
        }

        Ok(SumTreeBuffer {
            records: (0..capacity).map(|_| None).collect(),
            tree: SumTree::new(capacity)?,
            cursor: 0,
            len: 0,
            next_generation: 0,
            beta,
            sample_calls: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.tree.capacity()
    }

    pub fn total_priority(&self) -> f32 {
        self.tree.total()
    }

    /// Priority given to the next pushed record.
    pub fn max_priority(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.tree.max().max(MIN_PRIORITY)
        }
    }

    /// β that the next call to [`SumTreeBuffer::sample`] will use.
    pub fn beta(&self) -> f32 {
        self.beta.beta(self.sample_calls)
    }

    /// Current priority of a record, `None` once it has been overwritten.
    pub fn priority(&self, handle: RecordHandle) -> Option<f32> {
        self.lookup(handle).map(|_| self.tree.get(handle.slot))
    }

    pub fn tree(&self) -> &SumTree {
        &self.tree
    }

    /// Insert at the write cursor, overwriting the oldest record once full.
    pub fn push(&mut self, transition: Transition) -> RecordHandle {
        let priority = self.max_priority();
        let slot = self.cursor;
        let generation = self.next_generation;

        self.records[slot] = Some(PriorityRecord { transition, generation });
        self.tree.set(slot, priority);

        self.next_generation += 1;
        self.cursor = (self.cursor + 1) % self.capacity();
        self.len = (self.len + 1).min(self.capacity());

        RecordHandle { slot, generation }
    }

    /// Draw `batch_size` records proportionally to priority, with importance weights
    /// `(N * P(i))^-beta` normalised by the batch maximum.
    pub fn sample<R: Rng>(&mut self, batch_size: usize, rng: &mut R) -> Result<SampledBatch> {
        if self.is_empty() {
            return Err(RainbowError::EmptyBuffer("cannot sample from an empty replay buffer".to_string()));
        }
        if batch_size == 0 {
            return Err(RainbowError::invalid_parameter("batch_size", "must be greater than 0"));
        }

        let total = self.tree.total();
        if !total.is_finite() || total <= 0.0 {
            return Err(RainbowError::NumericalError(format!("invalid total priority {}", total)));
        }

        let beta = self.beta.beta(self.sample_calls);
        self.sample_calls += 1;

        let segment = total / batch_size as f32;
        let n = self.len as f32;

        let mut transitions = Vec::with_capacity(batch_size);
        let mut handles = Vec::with_capacity(batch_size);
        let mut weights = Vec::with_capacity(batch_size);

        for i in 0..batch_size {
            let low = segment * i as f32;
            let value = (low + rng.gen::<f32>() * segment).min(total);
            let slot = self.tree.find(value);

            let record = self.records[slot].as_ref().ok_or_else(|| {
                RainbowError::NumericalError(format!("priority descent reached empty slot {}", slot))
            })?;

            let probability = self.tree.get(slot) / total;
            weights.push((n * probability).powf(-beta));
            transitions.push(record.transition.clone());
            handles.push(RecordHandle { slot, generation: record.generation });
        }

        let max_weight = weights.iter().fold(0.0_f32, |max, &w| max.max(w));
        if !max_weight.is_finite() || max_weight <= 0.0 {
            return Err(RainbowError::NumericalError(format!("invalid importance weight {}", max_weight)));
        }
        for w in weights.iter_mut() {
            *w /= max_weight;
        }

        Ok(SampledBatch { transitions, weights, handles, beta })
    }

    /// Overwrite a record's priority (clamped to [`MIN_PRIORITY`]). Returns `false` and
    /// leaves the tree untouched when the record has been evicted since it was sampled.
    pub fn update_priority(&mut self, handle: RecordHandle, priority: f32) -> Result<bool> {
        if !priority.is_finite() {
            return Err(RainbowError::NumericalError(format!("non-finite priority {}", priority)));
        }
        if self.lookup(handle).is_none() {
            return Ok(false);
        }

        self.tree.set(handle.slot, priority.max(MIN_PRIORITY));
        Ok(true)
    }

    fn lookup(&self, handle: RecordHandle) -> Option<&PriorityRecord> {
        self.records
            .get(handle.slot)
            .and_then(|r| r.as_ref())
            .filter(|r| r.generation == handle.generation)
    }
}
