use ndarray::{array, Array1};

use crate::agent::{EpisodicAgent, RainbowAgent};
use crate::config::{Features, RainbowConfig};
use crate::distributional::Support;
use crate::error::RainbowError;

fn eager_config() -> RainbowConfig {
    RainbowConfig::default()
        .hidden_layers(vec![8])
        .n_step(1)
        .mini_batch(1)
        .replay_mem(10)
        .policy_update_freq(1)
}

#[test]
fn test_nan_reward_is_a_numerical_error() {
    let mut agent = RainbowAgent::new(2, 2, eager_config()).unwrap();
    agent.start(array![0.0, 1.0].view()).unwrap();
    let err = agent.take_step(f32::NAN, array![1.0, 0.0].view()).unwrap_err();
    assert!(matches!(err, RainbowError::NumericalError(_)), "got {:?}", err);
}

#[test]
fn test_nan_reward_scalar_model_is_a_numerical_error() {
    let config = eager_config().features(Features::vanilla());
    let mut agent = RainbowAgent::new(2, 2, config).unwrap();
    agent.start(array![0.0, 1.0].view()).unwrap();
    let err = agent.take_step(f32::NAN, array![1.0, 0.0].view()).unwrap_err();
    assert!(matches!(err, RainbowError::NumericalError(_)), "got {:?}", err);
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let err = RainbowAgent::new(2, 2, RainbowConfig::default().mini_batch(0)).err().unwrap();
    assert!(matches!(err, RainbowError::InvalidParameter { .. }));
    assert!(RainbowAgent::new(0, 2, RainbowConfig::default()).is_err());
    assert!(RainbowAgent::new(2, 0, RainbowConfig::default()).is_err());
}

#[test]
fn test_single_step_episodes() {
    let mut agent = RainbowAgent::new(2, 2, eager_config()).unwrap();
    for i in 0..5 {
        agent.start(array![i as f32, 0.0].view()).unwrap();
        assert_eq!(agent.end(1.0).unwrap(), 1.0);
    }
    // the terminal step is stored but never counted as an environment step
    assert_eq!(agent.memory_len(), 5);
    assert_eq!(agent.steps(), 0);
    assert!(agent.get_train_data().is_none());
}

#[test]
fn test_replay_memory_wraps() {
    let mut agent = RainbowAgent::new(2, 2, eager_config()).unwrap();
    agent.start(array![0.0, 0.0].view()).unwrap();
    for t in 0..25 {
        agent.take_step(0.1, array![t as f32 * 0.01, 0.0].view()).unwrap();
    }
    agent.end(0.0).unwrap();
    assert_eq!(agent.memory_len(), 10);
    assert_eq!(agent.updates(), 25);
}

#[test]
fn test_projection_of_point_masses_stays_normalised() {
    let support = Support::new(11, -5.0, 5.0).unwrap();
    for j in 0..11 {
        let mut probs = Array1::zeros(11);
        probs[j] = 1.0;
        for &(reward, discount) in &[(0.3, 0.97), (-7.0, 1.0), (2.5, 0.5), (0.0, 0.0)] {
            let projected = support.project(probs.view(), reward, discount, false).unwrap();
            assert!((projected.sum() - 1.0).abs() < 1e-5);
            assert!(projected.iter().all(|&p| p >= 0.0));
        }
    }
}
