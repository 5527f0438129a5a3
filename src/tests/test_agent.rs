use ndarray::{array, Array1};
use tempfile::TempDir;

use crate::agent::{EpisodicAgent, RainbowAgent};
use crate::config::{Features, RainbowConfig};
use crate::network::ValueNetwork;

fn small_config() -> RainbowConfig {
    RainbowConfig::default()
        .hidden_layers(vec![16])
        .mini_batch(4)
        .replay_mem(100)
        .policy_update_freq(1)
}

fn observation(t: usize) -> Array1<f32> {
    let x = t as f32 * 0.1;
    array![x.sin(), x.cos(), 0.5 - x.fract()]
}

/// Run `episodes` fixed-length episodes and return every action taken.
fn run<N: ValueNetwork>(agent: &mut RainbowAgent<N>, episodes: usize, length: usize) -> Vec<usize> {
    let mut actions = Vec::new();
    for episode in 0..episodes {
        actions.push(agent.start(observation(episode).view()).unwrap());
        for t in 1..length {
            let reward = if actions[actions.len() - 1] == t % 2 { 1.0 } else { 0.0 };
            actions.push(agent.take_step(reward, observation(episode + t).view()).unwrap());
        }
        agent.end(1.0).unwrap();
    }
    actions
}

#[test]
fn test_vanilla_agents_with_same_seed_agree() {
    let config = small_config().features(Features::vanilla()).seed(7);
    let mut a = RainbowAgent::new(3, 2, config.clone()).unwrap();
    let mut b = RainbowAgent::new(3, 2, config).unwrap();

    assert_eq!(run(&mut a, 3, 12), run(&mut b, 3, 12));
    assert_eq!(
        a.networks().online().parameters().unwrap(),
        b.networks().online().parameters().unwrap()
    );
}

#[test]
fn test_full_rainbow_is_reproducible() {
    let config = small_config().seed(3);
    let mut a = RainbowAgent::new(3, 3, config.clone()).unwrap();
    let mut b = RainbowAgent::new(3, 3, config).unwrap();
    assert_eq!(run(&mut a, 2, 15), run(&mut b, 2, 15));
}

#[test]
fn test_target_synchronisation_schedule() {
    let config = small_config().n_step(1).mini_batch(2).target_update_freq(5);
    let mut agent = RainbowAgent::new(3, 2, config).unwrap();

    agent.start(observation(0).view()).unwrap();
    let initial_target = agent.networks().target().parameters().unwrap();

    for t in 1..=4 {
        agent.take_step(1.0, observation(t).view()).unwrap();
    }
    // trained since step 2, but not yet synchronised
    assert!(agent.updates() > 0);
    assert_eq!(agent.networks().target().parameters().unwrap(), initial_target);
    assert_ne!(agent.networks().online().parameters().unwrap(), initial_target);

    agent.take_step(1.0, observation(5).view()).unwrap();
    let synced = agent.networks().target().parameters().unwrap();
    assert_eq!(synced, agent.networks().online().parameters().unwrap());
    assert_eq!(agent.networks().sync_count(), 1);

    agent.take_step(1.0, observation(6).view()).unwrap();
    assert_eq!(agent.networks().target().parameters().unwrap(), synced);
    assert_ne!(agent.networks().online().parameters().unwrap(), synced);
}

#[test]
fn test_train_data_appears_after_first_update() {
    let mut agent = RainbowAgent::new(3, 2, small_config().n_step(1)).unwrap();
    agent.start(observation(0).view()).unwrap();
    for t in 1..4 {
        agent.take_step(0.5, observation(t).view()).unwrap();
        assert!(agent.get_train_data().is_none());
    }

    agent.take_step(0.5, observation(4).view()).unwrap();
    let data = *agent.get_train_data().unwrap();
    assert_eq!(data.updates, 1);
    assert_eq!(data.steps, 4);
    assert!(data.loss.is_finite() && data.loss > 0.0);
    assert!((data.beta - 0.4).abs() < 1e-6);
}

#[test]
fn test_policy_update_frequency() {
    let config = small_config().n_step(1).policy_update_freq(3);
    let mut agent = RainbowAgent::new(3, 2, config).unwrap();
    agent.start(observation(0).view()).unwrap();
    for t in 1..=12 {
        agent.take_step(0.0, observation(t).view()).unwrap();
    }
    // steps 6, 9 and 12 have a full mini-batch available
    assert_eq!(agent.updates(), 3);
}

#[test]
fn test_five_step_episode_stores_five_transitions() {
    let mut agent = RainbowAgent::new(3, 2, small_config().mini_batch(50)).unwrap();
    agent.start(observation(0).view()).unwrap();
    for t in 1..5 {
        agent.take_step(1.0, observation(t).view()).unwrap();
    }
    assert_eq!(agent.memory_len(), 2);
    agent.end(1.0).unwrap();
    assert_eq!(agent.memory_len(), 5);
}

#[test]
fn test_every_feature_combination_trains() {
    for mask in 0..32u32 {
        let features = Features {
            no_duel: mask & 1 != 0,
            no_double: mask & 2 != 0,
            no_priority_buf: mask & 4 != 0,
            no_noise: mask & 8 != 0,
            no_distrib: mask & 16 != 0,
        };
        let config = small_config().features(features).clip_grads(Some(5.0));
        let mut agent = RainbowAgent::new(3, 2, config).unwrap();
        run(&mut agent, 2, 10);
        let data = agent.get_train_data().unwrap();
        assert!(data.loss.is_finite(), "{} produced loss {}", agent, data.loss);
        if features.no_priority_buf {
            assert_eq!(data.beta, 0.0);
        }
    }
}

#[test]
fn test_save_and_load_restores_both_networks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("online.bin");

    let mut trained = RainbowAgent::new(3, 2, small_config()).unwrap();
    run(&mut trained, 2, 10);
    trained.save(&path).unwrap();

    let mut fresh = RainbowAgent::new(3, 2, small_config().seed(99)).unwrap();
    fresh.load(&path).unwrap();
    let expected = trained.networks().online().parameters().unwrap();
    assert_eq!(fresh.networks().online().parameters().unwrap(), expected);
    assert_eq!(fresh.networks().target().parameters().unwrap(), expected);
}

#[test]
fn test_greedy_action_matches_q_values() {
    let config = small_config().features(Features { no_noise: true, ..Features::default() });
    let mut agent = RainbowAgent::new(3, 4, config).unwrap();
    let obs = observation(3);
    let q = agent.q_values(obs.view()).unwrap();
    let action = agent.start(obs.view()).unwrap();
    assert_eq!(action, crate::agent::argmax(q.view()));
}
