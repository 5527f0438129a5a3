use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};

use crate::activations::{softmax_rows, Activation};
use crate::error::{Result, RainbowError};
use crate::layers::{LayerGradients, LayerKind, LayerTrait, NetLayer};
use crate::optimizer::{Adam, GradientClipper, Optimizer, OptimizerWrapper};
use super::ValueNetwork;

/// How the last layer's outputs are turned into values.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputKind {
    /// Softmax over atoms for every action
    Categorical,
    /// One raw Q value per action
    Scalar,
}

/// Everything needed to build a [`RainbowNetwork`].
#[derive(Clone, Debug)]
pub struct NetworkSpec {
    pub input_size: usize,
    pub hidden_layers: Vec<usize>,
    pub num_actions: usize,
    pub atoms: usize,
    pub layer_kind: LayerKind,
    pub dueling: bool,
    pub output: OutputKind,
    pub optimizer: OptimizerWrapper,
    pub learning_rate: f32,
    pub seed: u64,
}

impl NetworkSpec {
    /// Full Rainbow network: noisy dueling categorical head over 51 atoms.
    pub fn new(input_size: usize, num_actions: usize) -> Self {
        NetworkSpec {
            input_size,
            hidden_layers: vec![64, 128, 64],
            num_actions,
            atoms: 51,
            layer_kind: LayerKind::Noisy { sigma_zero: 0.5 },
            dueling: true,
            output: OutputKind::Categorical,
            optimizer: OptimizerWrapper::Adam(Adam::default()),
            learning_rate: 5e-4,
            seed: 1,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(RainbowError::invalid_parameter("input_size", "must be greater than 0"));
        }
        if self.num_actions == 0 {
            return Err(RainbowError::invalid_parameter("num_actions", "must be greater than 0"));
        }
        if self.hidden_layers.is_empty() || self.hidden_layers.contains(&0) {
            return Err(RainbowError::invalid_parameter(
                "hidden_layers".to_string(),
                format!("need at least one non-empty hidden layer, got {:?}", self.hidden_layers),
            ));
        }
        match self.output {
            OutputKind::Categorical if self.atoms < 2 => Err(RainbowError::invalid_parameter(
                "atoms".to_string(),
                format!("a categorical output needs at least 2 atoms, got {}", self.atoms),
            )),
            OutputKind::Scalar if self.atoms != 1 => Err(RainbowError::invalid_parameter(
                "atoms".to_string(),
                format!("a scalar output has exactly 1 atom, got {}", self.atoms),
            )),
            _ => Ok(()),
        }
    }
}

/// Output stage on top of the shared torso.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Head {
    /// One linear layer producing `actions * atoms` logits
    Plain { output: NetLayer },
    /// Value stream (`atoms` logits) and advantage stream (`actions * atoms` logits),
    /// combined as `V + A - mean_a A`
    Dueling { value: NetLayer, advantage: NetLayer },
}

impl Head {
    fn forward(&mut self, features: ArrayView2<f32>, actions: usize, atoms: usize) -> Result<Array3<f32>> {
        let batch = features.nrows();
        match self {
            Head::Plain { output } => {
                let logits = output.forward_batch(features);
                Ok(logits.into_shape((batch, actions, atoms))?)
            }
            Head::Dueling { value, advantage } => {
                let value = value.forward_batch(features).insert_axis(Axis(1));
                let advantage = advantage.forward_batch(features).into_shape((batch, actions, atoms))?;
                let mean = advantage
                    .mean_axis(Axis(1))
                    .ok_or_else(|| RainbowError::precondition("dueling head needs at least one action"))?
                    .insert_axis(Axis(1));
                Ok(advantage + &value - &mean)
            }
        }
    }

    /// Returns the head's parameter gradients and the error to feed into the torso.
    fn backward(&self, gradient: ArrayView3<f32>) -> Result<(Vec<LayerGradients>, Array2<f32>)> {
        match self {
            Head::Plain { output } => {
                let (error, grads) = output.backward_batch(flatten_actions(gradient)?.view())?;
                Ok((vec![grads], error))
            }
            Head::Dueling { value, advantage } => {
                let (value_grad, advantage_grad) = dueling_gradients(gradient)?;
                let (value_error, value_grads) = value.backward_batch(value_grad.view())?;
                let (advantage_error, advantage_grads) = advantage.backward_batch(advantage_grad.view())?;
                Ok((vec![value_grads, advantage_grads], value_error + &advantage_error))
            }
        }
    }

    fn apply_gradients(
        &mut self,
        gradients: &[LayerGradients],
        optimizer: &mut OptimizerWrapper,
        slot: usize,
        learning_rate: f32,
    ) {
        match self {
            Head::Plain { output } => {
                output.apply_gradients(&gradients[0], optimizer, slot, learning_rate);
            }
            Head::Dueling { value, advantage } => {
                value.apply_gradients(&gradients[0], optimizer, slot, learning_rate);
                advantage.apply_gradients(&gradients[1], optimizer, slot + 2, learning_rate);
            }
        }
    }

    fn layers_mut(&mut self) -> Vec<&mut NetLayer> {
        match self {
            Head::Plain { output } => vec![output],
            Head::Dueling { value, advantage } => vec![value, advantage],
        }
    }
}

/// `(batch, actions, atoms)` to `(batch, actions * atoms)` in logical order.
fn flatten_actions(gradient: ArrayView3<f32>) -> Result<Array2<f32>> {
    let (batch, actions, atoms) = gradient.dim();
    Ok(Array2::from_shape_vec((batch, actions * atoms), gradient.iter().cloned().collect())?)
}

/// Split a gradient on `V + A - mean_a A` into the value and advantage stream gradients.
fn dueling_gradients(gradient: ArrayView3<f32>) -> Result<(Array2<f32>, Array2<f32>)> {
    let value_grad = gradient.sum_axis(Axis(1));
    let mean = gradient
        .mean_axis(Axis(1))
        .ok_or_else(|| RainbowError::precondition("dueling head needs at least one action"))?
        .insert_axis(Axis(1));
    let advantage_grad = &gradient - &mean;
    Ok((value_grad, flatten_actions(advantage_grad.view())?))
}

/// Fully connected value network: ReLU torso, dense or noisy layers, plain or dueling
/// head, categorical or scalar output.
#[derive(Clone, Debug)]
pub struct RainbowNetwork {
    torso: Vec<NetLayer>,
    head: Head,
    output: OutputKind,
    num_actions: usize,
    atoms: usize,
    optimizer: OptimizerWrapper,
    learning_rate: f32,
    noisy: bool,
    rng: StdRng,
}

impl RainbowNetwork {
    /// Build a network with weights drawn from `spec.seed`; equal specs give bit-identical
    /// networks.
    pub fn new(spec: NetworkSpec) -> Result<Self> {
        spec.validate()?;
        let mut rng = StdRng::seed_from_u64(spec.seed);

        let mut torso = Vec::with_capacity(spec.hidden_layers.len());
        let mut input_size = spec.input_size;
        for &size in spec.hidden_layers.iter() {
            torso.push(spec.layer_kind.build(input_size, size, Activation::Relu, &mut rng));
            input_size = size;
        }

        let outputs = spec.num_actions * spec.atoms;
        let head = if spec.dueling {
            Head::Dueling {
                value: spec.layer_kind.build(input_size, spec.atoms, Activation::Linear, &mut rng),
                advantage: spec.layer_kind.build(input_size, outputs, Activation::Linear, &mut rng),
            }
        } else {
            Head::Plain {
                output: spec.layer_kind.build(input_size, outputs, Activation::Linear, &mut rng),
            }
        };

        Ok(RainbowNetwork {
            torso,
            head,
            output: spec.output,
            num_actions: spec.num_actions,
            atoms: spec.atoms,
            optimizer: spec.optimizer,
            learning_rate: spec.learning_rate,
            noisy: matches!(spec.layer_kind, LayerKind::Noisy { .. }),
            rng,
        })
    }

    pub fn output_kind(&self) -> OutputKind {
        self.output
    }

    pub fn is_noisy(&self) -> bool {
        self.noisy
    }

    pub fn is_dueling(&self) -> bool {
        matches!(self.head, Head::Dueling { .. })
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn torso(&self) -> &[NetLayer] {
        &self.torso
    }

    pub fn head(&self) -> &Head {
        &self.head
    }
}

/// Kind and shape of every layer, used to check a parameter blob fits the network.
fn layout(torso: &[NetLayer], head: &Head) -> Vec<(bool, usize, usize)> {
    let head_layers: Vec<&NetLayer> = match head {
        Head::Plain { output } => vec![output],
        Head::Dueling { value, advantage } => vec![value, advantage],
    };
    torso
        .iter()
        .chain(head_layers)
        .map(|l| (matches!(l, NetLayer::Noisy(_)), l.input_size(), l.output_size()))
        .collect()
}

impl ValueNetwork for RainbowNetwork {
    fn input_size(&self) -> usize {
        self.torso.first().map(|l| l.input_size()).unwrap_or(0)
    }

    fn num_actions(&self) -> usize {
        self.num_actions
    }

    fn atoms(&self) -> usize {
        self.atoms
    }

    fn forward(&mut self, observations: ArrayView2<f32>) -> Result<Array3<f32>> {
        if observations.ncols() != self.input_size() {
            return Err(RainbowError::dimension_mismatch(
                format!("{} observation features", self.input_size()),
                format!("{} observation features", observations.ncols()),
            ));
        }

        let mut features = observations.to_owned();
        for layer in self.torso.iter_mut() {
            features = layer.forward_batch(features.view());
        }
        let logits = self.head.forward(features.view(), self.num_actions, self.atoms)?;

        let outputs = match self.output {
            OutputKind::Categorical => {
                let (batch, actions, atoms) = logits.dim();
                let flat = logits.into_shape((batch * actions, atoms))?;
                softmax_rows(flat.view()).into_shape((batch, actions, atoms))?
            }
            OutputKind::Scalar => logits,
        };

        if outputs.iter().any(|v| !v.is_finite()) {
            return Err(RainbowError::NumericalError("network produced a non-finite output".to_string()));
        }
        Ok(outputs)
    }

    fn backward(&mut self, output_gradient: ArrayView3<f32>, clipper: &GradientClipper) -> Result<f32> {
        let (_, actions, atoms) = output_gradient.dim();
        if actions != self.num_actions || atoms != self.atoms {
            return Err(RainbowError::dimension_mismatch(
                format!("(_, {}, {})", self.num_actions, self.atoms),
                format!("(_, {}, {})", actions, atoms),
            ));
        }

        let (head_gradients, mut error) = self.head.backward(output_gradient)?;
        let mut gradients = Vec::with_capacity(self.torso.len() + head_gradients.len());
        for layer in self.torso.iter().rev() {
            let (input_error, grads) = layer.backward_batch(error.view())?;
            gradients.push(grads);
            error = input_error;
        }
        gradients.reverse();
        gradients.extend(head_gradients);

        let grad_norm = clipper.clip(&mut gradients);
        if !grad_norm.is_finite() || gradients.iter().any(|g| !g.is_finite()) {
            return Err(RainbowError::NumericalError(format!("non-finite gradient norm {}", grad_norm)));
        }

        self.optimizer.begin_step();
        let torso_len = self.torso.len();
        for (i, (layer, grads)) in self.torso.iter_mut().zip(gradients.iter()).enumerate() {
            layer.apply_gradients(grads, &mut self.optimizer, 2 * i, self.learning_rate);
        }
        self.head.apply_gradients(
            &gradients[torso_len..],
            &mut self.optimizer,
            2 * torso_len,
            self.learning_rate,
        );

        Ok(grad_norm)
    }

    fn reset_noise(&mut self) {
        if !self.noisy {
            return;
        }
        let rng = &mut self.rng;
        for layer in self.torso.iter_mut() {
            layer.reset_noise(rng);
        }
        for layer in self.head.layers_mut() {
            layer.reset_noise(rng);
        }
    }

    fn clone_parameters_into(&self, target: &mut Self) {
        target.torso = self.torso.clone();
        target.head = self.head.clone();
    }

    fn parameters(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&(&self.torso, &self.head))?)
    }

    fn load_parameters(&mut self, blob: &[u8]) -> Result<()> {
        let (torso, head): (Vec<NetLayer>, Head) = bincode::deserialize(blob)?;
        let expected = layout(&self.torso, &self.head);
        let actual = layout(&torso, &head);
        if expected != actual || self.is_dueling() != matches!(head, Head::Dueling { .. }) {
            return Err(RainbowError::dimension_mismatch(
                format!("layers {:?}", expected),
                format!("layers {:?}", actual),
            ));
        }
        self.torso = torso;
        self.head = head;
        Ok(())
    }
}
