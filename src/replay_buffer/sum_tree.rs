//! Binary tree of partial priority sums.
//!
//! The tree is stored as a flat array in heap order: node `i` has children `2i + 1` and
//! `2i + 2`, and the `capacity` leaves occupy the last `capacity` entries. Every internal
//! node holds the sum of its subtree, so the root is the total priority mass.
use segment_tree::{ops::MaxIgnoreNaN, SegmentPoint};

use crate::error::{Result, RainbowError};

pub struct SumTree {
    capacity: usize,
    tree: Vec<f32>,
    max_tree: SegmentPoint<f32, MaxIgnoreNaN>,
}

impl SumTree {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(RainbowError::invalid_parameter("capacity", "sum tree capacity must be positive"));
        }
        Ok(Self {
            capacity,
            tree: vec![0f32; 2 * capacity - 1],
            max_tree: SegmentPoint::build(vec![0f32; capacity], MaxIgnoreNaN),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total(&self) -> f32 {
        self.tree[0]
    }

    /// Largest leaf priority; zero while the tree is empty.
    pub fn max(&self) -> f32 {
        self.max_tree.query(0, self.capacity)
    }

    /// Priority stored at leaf `ix`.
    pub fn get(&self, ix: usize) -> f32 {
        self.tree[ix + self.capacity - 1]
    }

    /// Set the priority of leaf `ix` and propagate the change to the root.
    pub fn set(&mut self, ix: usize, p: f32) {
        debug_assert!(ix < self.capacity);

        self.max_tree.modify(ix, p);
        let mut node = ix + self.capacity - 1;
        let change = p - self.tree[node];
        self.tree[node] = p;
        while node != 0 {
            node = (node - 1) / 2;
            self.tree[node] += change;
        }
    }

    /// Leaf reached by descending with value `s`: go left while `s` fits in the left
    /// subtree, otherwise subtract the left sum and go right. Empty subtrees are never
    /// entered, so rounding at the right edge cannot select an unused leaf.
    pub fn find(&self, s: f32) -> usize {
        let mut ix = 0;
        let mut s = s;
        loop {
            let left = 2 * ix + 1;
            let right = left + 1;

            if left >= self.tree.len() {
                break;
            }

            if (s <= self.tree[left] && self.tree[left] > 0.0) || self.tree[right] <= 0.0 {
                ix = left;
            } else {
                s -= self.tree[left];
                ix = right;
            }
        }
        ix + 1 - self.capacity
    }

    /// Sum of all leaves computed directly, for invariant checks.
    pub fn leaf_sum(&self) -> f32 {
        self.tree[self.capacity - 1..].iter().sum()
    }

    /// True when every internal node equals the sum of its two children (within `tolerance`).
    pub fn is_consistent(&self, tolerance: f32) -> bool {
        (0..self.capacity - 1).all(|ix| {
            let sum = self.tree[2 * ix + 1] + self.tree[2 * ix + 2];
            (self.tree[ix] - sum).abs() <= tolerance * sum.abs().max(1.0)
        })
    }
}
