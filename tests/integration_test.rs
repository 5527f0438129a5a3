use ndarray::Array1;
use tempfile::TempDir;

use rainbow::agent::{EpisodicAgent, RainbowAgent};
use rainbow::config::{DistributionalConfig, Features, RainbowConfig};
use rainbow::metrics::EpisodeTracker;

/// Walk along a line of `len` cells; action 1 moves right, 0 moves left.
/// Reaching the right end pays 1, every other step costs 0.01.
struct Corridor {
    len: usize,
    position: usize,
    steps: usize,
}

impl Corridor {
    fn new(len: usize) -> Self {
        Corridor { len, position: 0, steps: 0 }
    }

    fn reset(&mut self) -> Array1<f32> {
        self.position = 0;
        self.steps = 0;
        self.observation()
    }

    fn observation(&self) -> Array1<f32> {
        let mut obs = Array1::zeros(self.len);
        obs[self.position] = 1.0;
        obs
    }

    fn step(&mut self, action: usize) -> (f32, Array1<f32>, bool) {
        self.steps += 1;
        if action == 1 {
            self.position += 1;
        } else {
            self.position = self.position.saturating_sub(1);
        }
        if self.position == self.len - 1 {
            (1.0, self.observation(), true)
        } else {
            (-0.01, self.observation(), self.steps >= 4 * self.len)
        }
    }
}

fn run_episodes(agent: &mut RainbowAgent, episodes: usize, tracker: &mut EpisodeTracker) {
    let mut env = Corridor::new(5);
    for _ in 0..episodes {
        let obs = env.reset();
        let mut action = agent.start(obs.view()).unwrap();
        loop {
            let (reward, obs, done) = env.step(action);
            if done {
                let total = agent.end(reward).unwrap();
                tracker.record_episode(total);
                break;
            }
            action = agent.take_step(reward, obs.view()).unwrap();
        }
        tracker.record_loss(agent.get_train_data());
    }
}

fn corridor_config() -> RainbowConfig {
    RainbowConfig::default()
        .hidden_layers(vec![32])
        .mini_batch(16)
        .replay_mem(2_000)
        .target_update_freq(50)
        .lr(1e-3)
        .distrib_args(DistributionalConfig::default().atoms(11).range(-2.0, 2.0))
}

#[test]
fn test_full_rainbow_trains_on_corridor() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut agent = RainbowAgent::new(5, 2, corridor_config()).unwrap();
    let mut tracker = EpisodeTracker::new(100);
    run_episodes(&mut agent, 30, &mut tracker);

    assert_eq!(tracker.episode_count(), 30);
    assert!(agent.steps() > 0);
    assert!(agent.updates() > 0);

    let data = agent.get_train_data().copied().unwrap();
    assert!(data.loss.is_finite());
    assert!(data.grad_norm.is_finite());
    assert!(data.beta >= 0.4 && data.beta <= 1.0);
    assert!(tracker.best_reward().unwrap() <= 1.0);
}

#[test]
fn test_vanilla_dqn_trains_on_corridor() {
    let _ = env_logger::builder().is_test(true).try_init();

    let config = corridor_config().features(Features::vanilla()).eps(0.1).n_step(1);
    let mut agent = RainbowAgent::new(5, 2, config).unwrap();
    let mut tracker = EpisodeTracker::new(100);
    run_episodes(&mut agent, 30, &mut tracker);

    assert!(agent.get_train_data().unwrap().loss.is_finite());
    assert!(tracker.mean_reward(10).unwrap().is_finite());
    assert_eq!(agent.to_string(), "Rainbow[n1]");
}

#[test]
fn test_config_file_drives_agent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rainbow.yaml");
    corridor_config().seed(11).save(&path).unwrap();

    let loaded = RainbowConfig::load(&path).unwrap();
    let mut first = RainbowAgent::new(5, 2, loaded).unwrap();
    let mut second = RainbowAgent::new(5, 2, corridor_config().seed(11)).unwrap();

    let mut t1 = EpisodeTracker::new(10);
    let mut t2 = EpisodeTracker::new(10);
    run_episodes(&mut first, 5, &mut t1);
    run_episodes(&mut second, 5, &mut t2);
    assert_eq!(t1.mean_reward(5), t2.mean_reward(5));
}

#[test]
fn test_checkpoint_resumes_greedy_policy() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agent.bin");
    let config = corridor_config().features(Features { no_noise: true, ..Features::default() });

    let mut trained = RainbowAgent::new(5, 2, config.clone()).unwrap();
    run_episodes(&mut trained, 5, &mut EpisodeTracker::new(10));
    trained.save(&path).unwrap();

    let mut restored = RainbowAgent::new(5, 2, config.seed(99)).unwrap();
    restored.load(&path).unwrap();

    for cell in 0..5 {
        let mut probe = Array1::zeros(5);
        probe[cell] = 1.0;
        assert_eq!(trained.q_values(probe.view()).unwrap(), restored.q_values(probe.view()).unwrap());
    }
}
