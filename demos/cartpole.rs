//! Train a Rainbow agent on a small in-process CartPole.
//!
//! ```text
//! RUST_LOG=info cargo run --release --example cartpole -- [episodes] [config.yaml]
//! ```

use std::env;

use log::info;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rainbow::agent::{EpisodicAgent, RainbowAgent};
use rainbow::config::RainbowConfig;
use rainbow::metrics::EpisodeTracker;

const MAX_STEPS: usize = 500;

/// Classic cart-pole balancing with Euler integration.
struct CartPole {
    x: f32,
    x_dot: f32,
    theta: f32,
    theta_dot: f32,
    steps: usize,
    rng: StdRng,
}

impl CartPole {
    fn new(seed: u64) -> Self {
        Self {
            x: 0.0,
            x_dot: 0.0,
            theta: 0.0,
            theta_dot: 0.0,
            steps: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn reset(&mut self) -> Array1<f32> {
        self.x = self.rng.gen_range(-0.05..0.05);
        self.x_dot = self.rng.gen_range(-0.05..0.05);
        self.theta = self.rng.gen_range(-0.05..0.05);
        self.theta_dot = self.rng.gen_range(-0.05..0.05);
        self.steps = 0;
        self.state()
    }

    /// Returns the reward, the next observation and whether the episode is over.
    fn step(&mut self, action: usize) -> (f32, Array1<f32>, bool) {
        let force = if action == 1 { 10.0 } else { -10.0 };
        let gravity = 9.8;
        let mass_cart = 1.0;
        let mass_pole = 0.1;
        let total_mass = mass_cart + mass_pole;
        let length = 0.5;
        let pole_mass_length = mass_pole * length;
        let dt = 0.02;

        let cos_theta = self.theta.cos();
        let sin_theta = self.theta.sin();

        let temp = (force + pole_mass_length * self.theta_dot.powi(2) * sin_theta) / total_mass;
        let theta_acc = (gravity * sin_theta - cos_theta * temp)
            / (length * (4.0 / 3.0 - mass_pole * cos_theta.powi(2) / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        self.x += self.x_dot * dt;
        self.x_dot += x_acc * dt;
        self.theta += self.theta_dot * dt;
        self.theta_dot += theta_acc * dt;
        self.steps += 1;

        let fallen = self.x.abs() > 2.4 || self.theta.abs() > 0.209;
        let done = fallen || self.steps >= MAX_STEPS;
        (1.0, self.state(), done)
    }

    fn state(&self) -> Array1<f32> {
        Array1::from_vec(vec![self.x, self.x_dot, self.theta, self.theta_dot])
    }
}

fn main() -> rainbow::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let episodes: usize = args.next().and_then(|a| a.parse().ok()).unwrap_or(300);
    let config = match args.next() {
        Some(path) => RainbowConfig::load(path)?,
        None => RainbowConfig::default(),
    };

    let mut env = CartPole::new(config.seed);
    let mut agent = RainbowAgent::new(4, 2, config)?;
    let mut tracker = EpisodeTracker::new(100);
    info!("Training {} for {} episodes", agent, episodes);

    for episode in 0..episodes {
        let observation = env.reset();
        let mut action = agent.start(observation.view())?;
        loop {
            let (reward, observation, done) = env.step(action);
            if done {
                let total = agent.end(reward)?;
                tracker.record_episode(total);
                info!("Episode {}: reward {}", episode, total);
                break;
            }
            action = agent.take_step(reward, observation.view())?;
        }

        tracker.record_loss(agent.get_train_data());
        if episode % 25 == 0 {
            if let Some(data) = agent.get_train_data() {
                info!(
                    "Episode {}: loss {:.5}, mean q {:.3}, beta {:.3}, mean reward (25) {:.1}",
                    episode,
                    data.loss,
                    data.mean_q,
                    data.beta,
                    tracker.mean_reward(25).unwrap_or(0.0)
                );
            }
        }
    }

    info!(
        "Done after {} steps: best reward {:?}, mean reward (100) {:?}",
        agent.steps(),
        tracker.best_reward(),
        tracker.mean_reward(100)
    );
    Ok(())
}
