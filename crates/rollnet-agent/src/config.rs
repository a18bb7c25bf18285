//! Agent and control loop configuration

use std::path::PathBuf;

use rollnet_core::LearningParams;
use serde::{Deserialize, Serialize};

use crate::{AgentError, ACTION_DIM};

/// Highest speed a roll command can carry
const MAX_COMMAND_SPEED: f64 = u8::MAX as f64;

/// Configuration for the actor-critic agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Length of the state feature vector
    pub features: usize,
    /// Hidden layer sizes of the actor
    pub actor_hidden: Vec<usize>,
    /// Hidden layer sizes of the critic
    pub critic_hidden: Vec<usize>,
    /// Learning rate passed to every learning step
    pub learning_rate: f64,
    /// Discount factor
    pub discount: f64,
    /// Learning rate connections are created with
    pub connection_learning_rate: f64,
    /// Momentum coefficient of every connection
    pub momentum: f64,
    /// Reward added to the TD error after a collision
    pub punishment: f64,
    /// Speed reached at actor output +1
    pub max_speed: f64,
    /// Normalise incoming weights after every learning step
    pub normalize_weights: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            features: 3,
            actor_hidden: vec![10, 10],
            critic_hidden: vec![10, 10],
            learning_rate: 1e-3,
            discount: 0.7,
            connection_learning_rate: 0.01,
            momentum: 0.7,
            punishment: -1.0,
            max_speed: 255.0,
            normalize_weights: false,
        }
    }
}

impl AgentConfig {
    /// Reject values the agent cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        if self.features == 0 {
            return Err(AgentError::Config("features must be at least 1".into()));
        }
        if self.actor_hidden.contains(&0) || self.critic_hidden.contains(&0) {
            return Err(AgentError::Config("hidden layers need at least one unit".into()));
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(AgentError::Config(format!(
                "discount must be within [0, 1], got {}",
                self.discount
            )));
        }
        if !(0.0..=MAX_COMMAND_SPEED).contains(&self.max_speed) {
            return Err(AgentError::Config(format!(
                "max_speed must be within [0, {MAX_COMMAND_SPEED}], got {}",
                self.max_speed
            )));
        }
        Ok(())
    }

    /// Hyperparameters for new connections
    #[must_use]
    pub fn learning_params(&self) -> LearningParams {
        LearningParams {
            learning_rate: self.connection_learning_rate,
            momentum: self.momentum,
        }
    }

    /// `[features, actor_hidden..., 2]`
    #[must_use]
    pub fn actor_topology(&self) -> Vec<usize> {
        topology(self.features, &self.actor_hidden, ACTION_DIM)
    }

    /// `[features, critic_hidden..., 1]`
    #[must_use]
    pub fn critic_topology(&self) -> Vec<usize> {
        topology(self.features, &self.critic_hidden, 1)
    }
}

fn topology(input: usize, hidden: &[usize], output: usize) -> Vec<usize> {
    let mut layers = Vec::with_capacity(hidden.len() + 2);
    layers.push(input);
    layers.extend_from_slice(hidden);
    layers.push(output);
    layers
}

/// Configuration for the control loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Time between a roll command and the next state reading (ms)
    pub step_interval_ms: u64,
    /// Stop after this many learning steps
    pub max_steps: Option<usize>,
    /// Positions are divided by this before entering the networks (cm)
    pub arena_scale: f64,
    /// Speeds are divided by this before entering the networks (cm/s)
    pub speed_scale: f64,
    /// Save the weights every this many steps, besides shutdown
    pub checkpoint_every: Option<usize>,
    /// How long to wait for the first telemetry after connecting (ms)
    pub link_timeout_ms: u64,
    /// Weight snapshot file
    pub weights_path: PathBuf,
    /// Collision log file
    pub collision_log_path: PathBuf,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            step_interval_ms: 200,
            max_steps: None,
            arena_scale: 150.0,
            speed_scale: 100.0,
            checkpoint_every: Some(500),
            link_timeout_ms: 5_000,
            weights_path: PathBuf::from("rollnet-weights.bin.gz"),
            collision_log_path: PathBuf::from("collisions.txt"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_topologies() {
        let config = AgentConfig::default();
        assert_eq!(config.actor_topology(), vec![3, 10, 10, 2]);
        assert_eq!(config.critic_topology(), vec![3, 10, 10, 1]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AgentConfig =
            serde_json::from_str(r#"{ "actor_hidden": [4], "discount": 0.9 }"#).unwrap();
        assert_eq!(config.actor_topology(), vec![3, 4, 2]);
        assert_eq!(config.critic_hidden, vec![10, 10]);
        assert_eq!(config.discount, 0.9);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AgentConfig {
            critic_hidden: vec![4, 0],
            ..AgentConfig::default()
        };
        assert!(matches!(config.validate(), Err(AgentError::Config(_))));

        let config = AgentConfig {
            discount: 1.5,
            ..AgentConfig::default()
        };
        assert!(matches!(config.validate(), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_max_speed_fits_a_roll_command() {
        for max_speed in [0.0, 100.0, 255.0] {
            let config = AgentConfig {
                max_speed,
                ..AgentConfig::default()
            };
            assert!(config.validate().is_ok());
        }
        for max_speed in [255.5, 1000.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = AgentConfig {
                max_speed,
                ..AgentConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(AgentError::Config(_))),
                "max_speed {max_speed} accepted"
            );
        }
    }
}
