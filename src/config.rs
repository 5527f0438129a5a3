//! Configuration of [`RainbowAgent`](crate::agent::RainbowAgent).
//!
//! A [`RainbowConfig`] is an immutable value handed to the agent constructor, which calls
//! [`RainbowConfig::validate`] before building anything. Configurations load from and save
//! to YAML, or JSON when the path ends in `.json`.
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

use log::info;
use serde::{Deserialize, Serialize};

use crate::distributional::Support;
use crate::error::{Result, RainbowError};
use crate::layers::LayerKind;
use crate::network::{NetworkSpec, OutputKind};
use crate::optimizer::{Adam, OptimizerWrapper, SGD};
use crate::replay_buffer::BetaScheduler;

/// Proportional prioritized replay settings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PriorityBufferConfig {
    /// Priority exponent; 0 gives uniform sampling
    pub alpha: f32,
    /// Initial and final importance-sampling exponent
    pub beta_range: (f32, f32),
    /// Number of sampling calls over which β anneals
    pub beta_anneal_period: usize,
    /// Added to the loss before exponentiation so no priority reaches zero
    pub priority_eps: f32,
}

impl Default for PriorityBufferConfig {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            beta_range: (0.4, 1.0),
            beta_anneal_period: 1_000_000,
            priority_eps: 1e-6,
        }
    }
}

impl PriorityBufferConfig {
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn beta_range(mut self, start: f32, end: f32) -> Self {
        self.beta_range = (start, end);
        self
    }

    pub fn beta_anneal_period(mut self, period: usize) -> Self {
        self.beta_anneal_period = period;
        self
    }

    pub fn priority_eps(mut self, priority_eps: f32) -> Self {
        self.priority_eps = priority_eps;
        self
    }

    pub fn beta_scheduler(&self) -> BetaScheduler {
        BetaScheduler::new(self.beta_range.0, self.beta_range.1, self.beta_anneal_period)
    }

    /// `(loss + priority_eps)^alpha`
    pub fn priority(&self, loss: f32) -> f32 {
        (loss + self.priority_eps).powf(self.alpha)
    }
}

/// Support of the categorical value distribution.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DistributionalConfig {
    pub atoms: usize,
    pub min_val: f32,
    pub max_val: f32,
}

impl Default for DistributionalConfig {
    fn default() -> Self {
        Self {
            atoms: 21,
            min_val: 0.0,
            max_val: 500.0,
        }
    }
}

impl DistributionalConfig {
    pub fn atoms(mut self, atoms: usize) -> Self {
        self.atoms = atoms;
        self
    }

    pub fn range(mut self, min_val: f32, max_val: f32) -> Self {
        self.min_val = min_val;
        self.max_val = max_val;
        self
    }

    pub fn support(&self) -> Result<Support> {
        Support::new(self.atoms, self.min_val, self.max_val)
    }
}

/// Switches that turn individual Rainbow extensions off.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Features {
    pub no_duel: bool,
    pub no_double: bool,
    pub no_priority_buf: bool,
    pub no_noise: bool,
    pub no_distrib: bool,
}

impl Features {
    /// Every extension switched off: plain DQN with a target network and n-step returns.
    pub fn vanilla() -> Self {
        Self {
            no_duel: true,
            no_double: true,
            no_priority_buf: true,
            no_noise: true,
            no_distrib: true,
        }
    }
}

/// Parameter-update rule of the online network.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum OptimizerKind {
    Adam,
    Sgd,
}

impl OptimizerKind {
    pub fn build(&self) -> OptimizerWrapper {
        match self {
            OptimizerKind::Adam => OptimizerWrapper::Adam(Adam::default()),
            OptimizerKind::Sgd => OptimizerWrapper::SGD(SGD::new()),
        }
    }
}

/// Configuration of [`RainbowAgent`](crate::agent::RainbowAgent).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RainbowConfig {
    /// Horizon of the multi-step return
    pub n_step: usize,

    /// Environment steps between training updates
    pub policy_update_freq: usize,

    /// Environment steps between target network synchronisations
    pub target_update_freq: usize,

    pub mini_batch: usize,

    pub discount: f32,

    /// Replay memory capacity
    pub replay_mem: usize,

    pub lr: f32,

    /// Probability of a uniformly random action
    pub eps: f32,

    /// Global gradient-norm bound
    pub clip_grads: Option<f32>,

    pub pri_buf_args: PriorityBufferConfig,

    pub distrib_args: DistributionalConfig,

    pub features: Features,

    /// Widths of the hidden layers
    pub hidden_layers: Vec<usize>,

    /// Initial noise scale σ0 of noisy layers
    pub noise_std: f32,

    pub optimizer: OptimizerKind,

    pub seed: u64,
}

impl Default for RainbowConfig {
    fn default() -> Self {
        Self {
            n_step: 3,
            policy_update_freq: 2,
            target_update_freq: 75,
            mini_batch: 32,
            discount: 0.999,
            replay_mem: 10_000,
            lr: 5e-4,
            eps: 0.0,
            clip_grads: None,
            pri_buf_args: PriorityBufferConfig::default(),
            distrib_args: DistributionalConfig::default(),
            features: Features::default(),
            hidden_layers: vec![64, 128, 64],
            noise_std: 0.5,
            optimizer: OptimizerKind::Adam,
            seed: 1,
        }
    }
}

impl RainbowConfig {
    /// Constructs [`RainbowConfig`] from a YAML file, or JSON when the extension is `.json`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let config: Self = if is_json(path) {
            serde_json::from_reader(rdr)?
        } else {
            serde_yaml::from_reader(rdr)?
        };
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Saves [`RainbowConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = if is_json(path) {
            serde_json::to_string_pretty(&self)?
        } else {
            serde_yaml::to_string(&self)?
        };
        let mut file = File::create(path)?;
        file.write_all(text.as_bytes())?;
        info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn n_step(mut self, n_step: usize) -> Self {
        self.n_step = n_step;
        self
    }

    pub fn policy_update_freq(mut self, freq: usize) -> Self {
        self.policy_update_freq = freq;
        self
    }

    pub fn target_update_freq(mut self, freq: usize) -> Self {
        self.target_update_freq = freq;
        self
    }

    pub fn mini_batch(mut self, mini_batch: usize) -> Self {
        self.mini_batch = mini_batch;
        self
    }

    pub fn discount(mut self, discount: f32) -> Self {
        self.discount = discount;
        self
    }

    pub fn replay_mem(mut self, replay_mem: usize) -> Self {
        self.replay_mem = replay_mem;
        self
    }

    pub fn lr(mut self, lr: f32) -> Self {
        self.lr = lr;
        self
    }

    pub fn eps(mut self, eps: f32) -> Self {
        self.eps = eps;
        self
    }

    pub fn clip_grads(mut self, clip_grads: Option<f32>) -> Self {
        self.clip_grads = clip_grads;
        self
    }

    pub fn pri_buf_args(mut self, args: PriorityBufferConfig) -> Self {
        self.pri_buf_args = args;
        self
    }

    pub fn distrib_args(mut self, args: DistributionalConfig) -> Self {
        self.distrib_args = args;
        self
    }

    pub fn features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    pub fn hidden_layers(mut self, hidden_layers: Vec<usize>) -> Self {
        self.hidden_layers = hidden_layers;
        self
    }

    pub fn noise_std(mut self, noise_std: f32) -> Self {
        self.noise_std = noise_std;
        self
    }

    pub fn optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject configurations the agent cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.n_step == 0 {
            return Err(invalid("n_step", "must be at least 1".to_string()));
        }
        if self.policy_update_freq == 0 {
            return Err(invalid("policy_update_freq", "must be at least 1".to_string()));
        }
        if self.target_update_freq == 0 {
            return Err(invalid("target_update_freq", "must be at least 1".to_string()));
        }
        if self.replay_mem == 0 {
            return Err(invalid("replay_mem", "must be greater than 0".to_string()));
        }
        if self.mini_batch == 0 || self.mini_batch > self.replay_mem {
            return Err(invalid(
                "mini_batch",
                format!("must be in 1..={} (replay_mem), got {}", self.replay_mem, self.mini_batch),
            ));
        }
        if !(self.discount > 0.0 && self.discount <= 1.0) {
            return Err(invalid("discount", format!("must be in (0, 1], got {}", self.discount)));
        }
        if !(self.lr > 0.0 && self.lr.is_finite()) {
            return Err(invalid("lr", format!("must be positive, got {}", self.lr)));
        }
        if !(0.0..=1.0).contains(&self.eps) {
            return Err(invalid("eps", format!("must be in [0, 1], got {}", self.eps)));
        }
        if let Some(bound) = self.clip_grads {
            if !(bound > 0.0) {
                return Err(invalid("clip_grads", format!("must be positive, got {}", bound)));
            }
        }
        if self.hidden_layers.is_empty() || self.hidden_layers.contains(&0) {
            return Err(invalid(
                "hidden_layers",
                format!("need at least one non-empty layer, got {:?}", self.hidden_layers),
            ));
        }
        if !self.features.no_noise && !(self.noise_std > 0.0 && self.noise_std.is_finite()) {
            return Err(invalid("noise_std", format!("must be positive, got {}", self.noise_std)));
        }

        let per = &self.pri_buf_args;
        if !(per.alpha >= 0.0 && per.alpha.is_finite()) {
            return Err(invalid("alpha", format!("must be non-negative, got {}", per.alpha)));
        }
        let (beta_start, beta_end) = per.beta_range;
        if !(0.0..=1.0).contains(&beta_start) || !(0.0..=1.0).contains(&beta_end) {
            return Err(invalid("beta_range", format!("values must lie in [0, 1], got {:?}", per.beta_range)));
        }
        if !(per.priority_eps > 0.0) {
            return Err(invalid("priority_eps", format!("must be positive, got {}", per.priority_eps)));
        }

        if !self.features.no_distrib {
            self.distrib_args.support()?;
        }
        Ok(())
    }

    /// Network matching this configuration for the given problem size.
    pub fn network_spec(&self, input_size: usize, num_actions: usize) -> NetworkSpec {
        let (atoms, output) = if self.features.no_distrib {
            (1, OutputKind::Scalar)
        } else {
            (self.distrib_args.atoms, OutputKind::Categorical)
        };
        let layer_kind = if self.features.no_noise {
            LayerKind::Dense
        } else {
            LayerKind::Noisy { sigma_zero: self.noise_std }
        };

        NetworkSpec {
            input_size,
            hidden_layers: self.hidden_layers.clone(),
            num_actions,
            atoms,
            layer_kind,
            dueling: !self.features.no_duel,
            output,
            optimizer: self.optimizer.build(),
            learning_rate: self.lr,
            seed: self.seed,
        }
    }
}

fn invalid(name: &str, reason: String) -> RainbowError {
    RainbowError::invalid_parameter(name.to_string(), reason)
}

fn is_json(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = RainbowConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.distrib_args.atoms, 21);
        assert_eq!(config.pri_buf_args.beta_range, (0.4, 1.0));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = RainbowConfig::default();
        assert!(base.clone().n_step(0).validate().is_err());
        assert!(base.clone().mini_batch(0).validate().is_err());
        assert!(base.clone().replay_mem(8).mini_batch(16).validate().is_err());
        assert!(base.clone().discount(0.0).validate().is_err());
        assert!(base.clone().discount(1.5).validate().is_err());
        assert!(base.clone().eps(1.5).validate().is_err());
        assert!(base.clone().lr(0.0).validate().is_err());
        assert!(base.clone().clip_grads(Some(0.0)).validate().is_err());
        assert!(base.clone().target_update_freq(0).validate().is_err());
        assert!(base.clone().hidden_layers(vec![]).validate().is_err());
        assert!(base
            .clone()
            .pri_buf_args(PriorityBufferConfig::default().beta_range(0.4, 1.5))
            .validate()
            .is_err());
        assert!(base
            .clone()
            .distrib_args(DistributionalConfig::default().range(1.0, 1.0))
            .validate()
            .is_err());
    }

    #[test]
    fn test_single_atom_allowed_without_distributions() {
        let distrib = DistributionalConfig::default().atoms(1);
        let config = RainbowConfig::default().distrib_args(distrib);
        assert!(config.validate().is_err());

        let features = Features { no_distrib: true, ..Features::default() };
        assert!(config.features(features).validate().is_ok());
    }

    #[test]
    fn test_priority_formula() {
        let per = PriorityBufferConfig::default().alpha(0.5).priority_eps(0.0001);
        assert!((per.priority(0.9999) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_yaml_and_json_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let config = RainbowConfig::default()
            .n_step(5)
            .clip_grads(Some(10.0))
            .features(Features { no_double: true, ..Features::default() });

        let yaml = dir.path().join("rainbow.yaml");
        config.save(&yaml)?;
        assert_eq!(RainbowConfig::load(&yaml)?, config);

        let json = dir.path().join("rainbow.json");
        config.save(&json)?;
        assert!(std::fs::read_to_string(&json)?.trim_start().starts_with('{'));
        assert_eq!(RainbowConfig::load(&json)?, config);
        Ok(())
    }

    #[test]
    fn test_partial_yaml_uses_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("partial.yaml");
        std::fs::write(&path, "n_step: 1\nfeatures:\n  no_noise: true\n")?;
        let config = RainbowConfig::load(&path)?;
        assert_eq!(config.n_step, 1);
        assert!(config.features.no_noise);
        assert_eq!(config.mini_batch, 32);
        Ok(())
    }

    #[test]
    fn test_network_spec_follows_features() {
        let spec = RainbowConfig::default().features(Features::vanilla()).network_spec(4, 2);
        assert_eq!(spec.atoms, 1);
        assert_eq!(spec.output, OutputKind::Scalar);
        assert_eq!(spec.layer_kind, LayerKind::Dense);
        assert!(!spec.dueling);
    }
}
