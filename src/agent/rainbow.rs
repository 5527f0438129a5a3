use std::fmt;
use std::path::Path;

use log::{debug, info, trace};
use ndarray::{s, Array1, Array2, Array3, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::RainbowConfig;
use crate::error::{Result, RainbowError};
use crate::loss::Loss;
use crate::metrics::TrainData;
use crate::n_step::NStepAccumulator;
use crate::network::{RainbowNetwork, ValueNetwork, ValueNetworkPair};
use crate::optimizer::GradientClipper;
use crate::replay_buffer::{Experience, ReplayMemory, SumTreeBuffer, UniformBuffer};
use super::explorer::EpsilonGreedy;
use super::target::{ReturnModel, TargetSelection};
use super::traits::EpisodicAgent;

#[derive(Debug, Clone)]
enum EpisodeState {
    AwaitingStart,
    Running { observation: Array1<f32>, action: usize },
}

/// Rainbow agent: n-step, prioritized, distributional double DQN with dueling noisy
/// networks, each extension switchable through [`Features`](crate::config::Features).
///
/// # Example
///
/// ```rust,no_run
/// use rainbow::agent::{EpisodicAgent, RainbowAgent};
/// use rainbow::config::RainbowConfig;
/// use ndarray::array;
///
/// let mut agent = RainbowAgent::new(4, 2, RainbowConfig::default()).unwrap();
///
/// let mut action = agent.start(array![0.0, 0.1, 0.0, -0.1].view()).unwrap();
/// for _ in 0..10 {
///     // ... apply `action` to the environment ...
///     action = agent.take_step(1.0, array![0.0, 0.1, 0.0, -0.1].view()).unwrap();
/// }
/// let episode_reward = agent.end(1.0).unwrap();
/// ```
pub struct RainbowAgent<N: ValueNetwork = RainbowNetwork> {
    config: RainbowConfig,
    networks: ValueNetworkPair<N>,
    memory: ReplayMemory,
    accumulator: NStepAccumulator,
    return_model: ReturnModel,
    target_selection: TargetSelection,
    explorer: EpsilonGreedy,
    clipper: GradientClipper,
    state: EpisodeState,
    steps: usize,
    updates: usize,
    episode_steps: usize,
    episode_reward: f32,
    train_data: Option<TrainData>,
    rng: StdRng,
}

impl RainbowAgent<RainbowNetwork> {
    /// Build an agent with the bundled network for `observation_size` inputs and
    /// `num_actions` discrete actions.
    pub fn new(observation_size: usize, num_actions: usize, config: RainbowConfig) -> Result<Self> {
        config.validate()?;
        let online = RainbowNetwork::new(config.network_spec(observation_size, num_actions))?;
        Self::with_network(online, config)
    }
}

impl<N: ValueNetwork> RainbowAgent<N> {
    /// Build an agent around a caller-supplied online network; the target starts as a copy.
    pub fn with_network(online: N, config: RainbowConfig) -> Result<Self> {
        config.validate()?;

        let return_model = if config.features.no_distrib {
            ReturnModel::Scalar
        } else {
            ReturnModel::Categorical(config.distrib_args.support()?)
        };
        if online.atoms() != return_model.atoms() {
            return Err(RainbowError::dimension_mismatch(
                format!("network with {} atoms", return_model.atoms()),
                format!("network with {} atoms", online.atoms()),
            ));
        }

        let memory = if config.features.no_priority_buf {
            ReplayMemory::Uniform(UniformBuffer::new(config.replay_mem)?)
        } else {
            ReplayMemory::Prioritized(SumTreeBuffer::new(
                config.replay_mem,
                config.pri_buf_args.beta_scheduler(),
            )?)
        };

        let agent = RainbowAgent {
            accumulator: NStepAccumulator::new(config.n_step, config.discount)?,
            target_selection: TargetSelection::from_no_double(config.features.no_double),
            explorer: EpsilonGreedy::new(config.eps),
            clipper: GradientClipper::from_bound(config.clip_grads),
            networks: ValueNetworkPair::new(online),
            rng: StdRng::seed_from_u64(config.seed),
            return_model,
            memory,
            state: EpisodeState::AwaitingStart,
            steps: 0,
            updates: 0,
            episode_steps: 0,
            episode_reward: 0.0,
            train_data: None,
            config,
        };

        info!(
            "Created {} ({} inputs, {} actions, replay capacity {})",
            agent,
            agent.networks.online().input_size(),
            agent.networks.online().num_actions(),
            agent.memory.capacity()
        );
        Ok(agent)
    }

    pub fn config(&self) -> &RainbowConfig {
        &self.config
    }

    /// Environment steps taken over the agent's lifetime.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Reward accumulated in the current (or last finished) episode.
    pub fn episode_reward(&self) -> f32 {
        self.episode_reward
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, EpisodeState::Running { .. })
    }

    pub fn networks(&self) -> &ValueNetworkPair<N> {
        &self.networks
    }

    pub fn memory(&self) -> &ReplayMemory {
        &self.memory
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Q values of `observation` under the online network with its current noise sample.
    pub fn q_values(&mut self, observation: ArrayView1<f32>) -> Result<Array1<f32>> {
        self.check_observation(observation)?;
        let outputs = self.networks.online_mut().forward(observation.insert_axis(Axis(0)))?;
        Ok(self.return_model.q_values(outputs.view()).index_axis_move(Axis(0), 0))
    }

    /// Write the online network's parameters to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.networks.online().save(&path)?;
        info!("Saved online network to {:?}", path.as_ref());
        Ok(())
    }

    /// Load online parameters written by [`RainbowAgent::save`] and resynchronise the target.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.networks.online_mut().load(&path)?;
        self.networks.sync();
        info!("Loaded online network from {:?}", path.as_ref());
        Ok(())
    }

    fn check_observation(&self, observation: ArrayView1<f32>) -> Result<()> {
        let expected = self.networks.online().input_size();
        if observation.len() != expected {
            return Err(RainbowError::dimension_mismatch(
                format!("observation of length {}", expected),
                format!("observation of length {}", observation.len()),
            ));
        }
        Ok(())
    }

    fn select_action(&mut self, observation: ArrayView1<f32>) -> Result<usize> {
        self.networks.online_mut().reset_noise();
        let q_values = self.q_values(observation)?;
        Ok(self.explorer.action(q_values.view(), &mut self.rng))
    }

    fn store(&mut self, step: Experience) {
        for transition in self.accumulator.push(step) {
            self.memory.push(transition);
        }
    }

    /// One gradient step on a sampled mini-batch, followed by the priority write-back.
    fn train(&mut self) -> Result<()> {
        let batch = self.memory.sample(self.config.mini_batch, &mut self.rng)?;
        let size = batch.len();
        let atoms = self.return_model.atoms();
        let obs_dim = self.networks.online().input_size();

        let mut observations = Array2::zeros((size, obs_dim));
        let mut next_observations = Array2::zeros((size, obs_dim));
        let mut actions = Vec::with_capacity(size);
        let mut rewards = Vec::with_capacity(size);
        let mut discounts = Vec::with_capacity(size);
        let mut dones = Vec::with_capacity(size);
        for (i, transition) in batch.transitions.iter().enumerate() {
            observations.row_mut(i).assign(&transition.observation);
            next_observations.row_mut(i).assign(&transition.next_observation);
            actions.push(transition.action);
            rewards.push(transition.reward);
            discounts.push(transition.bootstrap_discount(self.config.discount));
            dones.push(transition.done);
        }

        let (online, target) = self.networks.split_mut();
        online.reset_noise();
        target.reset_noise();

        let target_next = target.forward(next_observations.view())?;
        let online_next = match self.target_selection {
            TargetSelection::Double => Some(online.forward(next_observations.view())?),
            TargetSelection::Max => None,
        };
        let next_rows = self.target_selection.bootstrap_rows(
            &self.return_model,
            online_next.as_ref().map(|o| o.view()),
            target_next.view(),
        )?;
        let targets = self.return_model.targets(next_rows.view(), &rewards, &discounts, &dones)?;

        // the online forward on the observations must come last: backward uses its caches
        let outputs = online.forward(observations.view())?;
        let q_values = self.return_model.q_values(outputs.view());
        let mut predicted = Array2::zeros((size, atoms));
        for (i, &a) in actions.iter().enumerate() {
            predicted.row_mut(i).assign(&outputs.slice(s![i, a, ..]));
        }

        let loss_fn = self.return_model.loss();
        let losses = loss_fn.per_sample(predicted.view(), targets.view());
        let row_gradients = loss_fn.gradient_batch(predicted.view(), targets.view());

        let n = size as f32;
        let loss = losses
            .iter()
            .zip(batch.weights.iter())
            .map(|(l, w)| l * w)
            .sum::<f32>()
            / n;
        if !loss.is_finite() {
            return Err(RainbowError::NumericalError(format!("non-finite loss {}", loss)));
        }

        let mut output_gradient = Array3::zeros(outputs.dim());
        for (i, &a) in actions.iter().enumerate() {
            let scale = batch.weights[i] / n;
            output_gradient
                .slice_mut(s![i, a, ..])
                .assign(&row_gradients.row(i).mapv(|g| g * scale));
        }
        let grad_norm = online.backward(output_gradient.view(), &self.clipper)?;
        let mean_q = actions.iter().enumerate().map(|(i, &a)| q_values[[i, a]]).sum::<f32>() / n;

        let priorities: Vec<f32> = losses.iter().map(|&l| self.config.pri_buf_args.priority(l)).collect();
        self.memory.update_priorities(&batch.handles, &priorities)?;

        self.updates += 1;
        if let Some(bound) = self.config.clip_grads {
            if grad_norm > bound {
                trace!("Clipped gradient norm {:.4} to {}", grad_norm, bound);
            }
        }
        trace!(
            "Update {}: loss {:.6}, mean q {:.4}, grad norm {:.4}, beta {:.4}",
            self.updates,
            loss,
            mean_q,
            grad_norm,
            batch.beta
        );
        self.train_data = Some(TrainData {
            loss,
            mean_q,
            grad_norm,
            beta: batch.beta,
            updates: self.updates,
            steps: self.steps,
        });
        Ok(())
    }
}

impl<N: ValueNetwork> EpisodicAgent for RainbowAgent<N> {
    fn start(&mut self, observation: ArrayView1<f32>) -> Result<usize> {
        if self.is_running() {
            return Err(RainbowError::precondition("start() called during an episode; call end() first"));
        }
        self.check_observation(observation)?;

        // steps left over from an episode aborted by an error
        self.accumulator.clear();
        self.episode_reward = 0.0;
        self.episode_steps = 0;
        let action = self.select_action(observation)?;
        self.state = EpisodeState::Running {
            observation: observation.to_owned(),
            action,
        };
        Ok(action)
    }

    fn take_step(&mut self, reward: f32, observation: ArrayView1<f32>) -> Result<usize> {
        if !self.is_running() {
            return Err(RainbowError::precondition("take_step() called before start()"));
        }
        self.check_observation(observation)?;
        let EpisodeState::Running { observation: last_observation, action: last_action } =
            std::mem::replace(&mut self.state, EpisodeState::AwaitingStart)
        else {
            return Err(RainbowError::precondition("take_step() called before start()"));
        };

        let next_observation = observation.to_owned();
        self.store(Experience {
            state: last_observation,
            action: last_action,
            reward,
            next_state: next_observation.clone(),
            done: false,
        });
        self.steps += 1;
        self.episode_steps += 1;
        self.episode_reward += reward;

        if self.steps % self.config.policy_update_freq == 0 && self.memory.len() >= self.config.mini_batch {
            self.train()?;
        }
        if self.steps % self.config.target_update_freq == 0 {
            self.networks.sync();
            debug!("Synchronised target network at step {}", self.steps);
        }

        let action = self.select_action(observation)?;
        self.state = EpisodeState::Running {
            observation: next_observation,
            action,
        };
        Ok(action)
    }

    fn end(&mut self, reward: f32) -> Result<f32> {
        let EpisodeState::Running { observation, action } =
            std::mem::replace(&mut self.state, EpisodeState::AwaitingStart)
        else {
            return Err(RainbowError::precondition("end() called before start()"));
        };

        self.episode_reward += reward;
        self.store(Experience {
            state: observation.clone(),
            action,
            reward,
            next_state: observation,
            done: true,
        });
        debug!(
            "Episode finished after {} steps with reward {}",
            self.episode_steps + 1,
            self.episode_reward
        );
        Ok(self.episode_reward)
    }

    fn get_train_data(&self) -> Option<&TrainData> {
        self.train_data.as_ref()
    }
}

/// Run label naming the horizon and the enabled extensions, e.g. `Rainbow[n3,duel,double,per,noisy,distrib]`.
impl<N: ValueNetwork> fmt::Display for RainbowAgent<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let features = &self.config.features;
        let mut parts = vec![format!("n{}", self.config.n_step)];
        for (enabled, name) in [
            (!features.no_duel, "duel"),
            (!features.no_double, "double"),
            (!features.no_priority_buf, "per"),
            (!features.no_noise, "noisy"),
            (!features.no_distrib, "distrib"),
        ] {
            if enabled {
                parts.push(name.to_string());
            }
        }
        write!(f, "Rainbow[{}]", parts.join(","))
    }
}
