//! # Activation Functions Module
//!
//! Hidden layers of the value network use ReLU; output streams stay linear and are
//! normalised by the network head (softmax over atoms for categorical outputs).

pub mod functions;

pub use functions::{softmax_rows, Activation};
