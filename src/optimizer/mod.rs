pub mod gradient_clipper;

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use serde::{Serialize, Deserialize};

pub use gradient_clipper::GradientClipper;

/// Parameter-update rule. Every parameter tensor is addressed by a `slot` so stateful
/// optimisers keep one set of moments per tensor.
pub trait Optimizer {
    /// Called once per gradient step, before any parameter is updated.
    fn begin_step(&mut self) {}
    fn update_weights(&mut self, slot: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32);
    fn update_biases(&mut self, slot: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32);
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl Optimizer for OptimizerWrapper {
    fn begin_step(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.begin_step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.begin_step(),
        }
    }

    fn update_weights(&mut self, slot: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_weights(slot, weights, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_weights(slot, weights, gradients, learning_rate),
        }
    }

    fn update_biases(&mut self, slot: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_biases(slot, biases, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_biases(slot, biases, gradients, learning_rate),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Optimizer for SGD {
    fn update_weights(&mut self, _slot: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        weights.zip_mut_with(gradients, |w, &g| *w -= learning_rate * g);
    }

    fn update_biases(&mut self, _slot: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        biases.zip_mut_with(gradients, |b, &g| *b -= learning_rate * g);
    }
}

/// Adam with bias correction. Moments are created lazily per slot.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: HashMap<usize, Array2<f32>>,
    v_weights: HashMap<usize, Array2<f32>>,
    m_biases: HashMap<usize, Array1<f32>>,
    v_biases: HashMap<usize, Array1<f32>>,
    pub t: i32,
}

impl Adam {
    pub fn new(beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights: HashMap::new(),
            v_weights: HashMap::new(),
            m_biases: HashMap::new(),
            v_biases: HashMap::new(),
            t: 0,
        }
    }

    fn corrections(&self) -> (f32, f32) {
        let t = self.t.max(1);
        (1.0 - self.beta1.powi(t), 1.0 - self.beta2.powi(t))
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn begin_step(&mut self) {
        self.t += 1;
    }

    fn update_weights(&mut self, slot: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        let (c1, c2) = self.corrections();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);

        let m = self.m_weights.entry(slot).or_insert_with(|| Array2::zeros(weights.dim()));
        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        let v = self.v_weights.entry(slot).or_insert_with(|| Array2::zeros(weights.dim()));
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        let m = &self.m_weights[&slot];
        let v = &self.v_weights[&slot];
        ndarray::Zip::from(weights).and(m).and(v).for_each(|w, &m, &v| {
            *w -= learning_rate * (m / c1) / ((v / c2).sqrt() + eps);
        });
    }

    fn update_biases(&mut self, slot: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        let (c1, c2) = self.corrections();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);

        let m = self.m_biases.entry(slot).or_insert_with(|| Array1::zeros(biases.dim()));
        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        let v = self.v_biases.entry(slot).or_insert_with(|| Array1::zeros(biases.dim()));
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        let m = &self.m_biases[&slot];
        let v = &self.v_biases[&slot];
        ndarray::Zip::from(biases).and(m).and(v).for_each(|b, &m, &v| {
            *b -= learning_rate * (m / c1) / ((v / c2).sqrt() + eps);
        });
    }
}
