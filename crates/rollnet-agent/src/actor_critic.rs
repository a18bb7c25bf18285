//! Actor-critic agent with a one-step TD learning rule
//!
//! The critic estimates the value of a state; the actor maps the same state
//! features to a speed and a heading. Both networks are trained with the
//! same TD error: the actor receives it on each of its two outputs, the
//! critic on its single output.

use rand::Rng;
use rollnet_core::{LearningParams, Network};
use rollnet_link::RollCommand;
use tracing::{debug, trace};

use crate::{AgentConfig, AgentError, Result};

/// Number of actor outputs: speed and heading
pub const ACTION_DIM: usize = 2;

/// Largest heading in degrees
pub const MAX_HEADING: f64 = 359.0;

/// A continuous roll action
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollAction {
    /// Speed in `[0, max_speed]`
    pub speed: f64,
    /// Heading in degrees, `[0, 359]`
    pub heading: f64,
}

impl RollAction {
    /// Rescale two tanh outputs from `(-1, 1)` into speed and heading
    #[must_use]
    pub fn from_outputs(speed_output: f64, heading_output: f64, max_speed: f64) -> Self {
        Self {
            speed: rescale(speed_output, max_speed),
            heading: rescale(heading_output, MAX_HEADING),
        }
    }

    /// Round and clamp into a link command
    #[must_use]
    pub fn to_command(self, drive: bool) -> RollCommand {
        RollCommand::from_parts(self.speed, self.heading, drive)
    }
}

fn rescale(output: f64, max: f64) -> f64 {
    (output + 1.0) / 2.0 * max
}

/// Actor and critic networks plus the collision latch
#[derive(Debug, Clone)]
pub struct ActorCritic {
    actor: Network,
    critic: Network,
    config: AgentConfig,
    collided: bool,
    updates: u64,
}

impl ActorCritic {
    /// Build both networks with random weights
    pub fn new<R: Rng + ?Sized>(config: AgentConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let params = config.learning_params();
        let actor = Network::new(&config.actor_topology(), params, rng)?;
        let critic = Network::new(&config.critic_topology(), params, rng)?;
        debug!(
            actor = ?actor.topology(),
            critic = ?critic.topology(),
            "created actor-critic networks"
        );
        Self::from_networks(config, actor, critic)
    }

    /// Build both networks with every weight set to `weight`
    pub fn with_constant_weight(config: AgentConfig, weight: f64) -> Result<Self> {
        config.validate()?;
        let params: LearningParams = config.learning_params();
        let actor = Network::with_constant_weight(&config.actor_topology(), params, weight)?;
        let critic = Network::with_constant_weight(&config.critic_topology(), params, weight)?;
        Self::from_networks(config, actor, critic)
    }

    /// Pair existing networks; their shapes must match `config`
    pub fn from_networks(config: AgentConfig, actor: Network, critic: Network) -> Result<Self> {
        if actor.topology() != config.actor_topology() {
            return Err(AgentError::Config(format!(
                "actor topology {:?} does not match configured {:?}",
                actor.topology(),
                config.actor_topology()
            )));
        }
        if critic.topology() != config.critic_topology() {
            return Err(AgentError::Config(format!(
                "critic topology {:?} does not match configured {:?}",
                critic.topology(),
                config.critic_topology()
            )));
        }

        Ok(Self {
            actor,
            critic,
            config,
            collided: false,
            updates: 0,
        })
    }

    /// Critic's value estimate for `features`
    pub fn state_value(&mut self, features: &[f64]) -> Result<f64> {
        self.critic.activate(features)?;
        Ok(self.critic.output()[0])
    }

    /// Actor's action for `features`
    pub fn action(&mut self, features: &[f64], max_speed: f64) -> Result<RollAction> {
        self.actor.activate(features)?;
        let output = self.actor.output();
        Ok(RollAction::from_outputs(output[0], output[1], max_speed))
    }

    /// `punishment + discount * state_n - state_o`, punishment only after a collision
    #[must_use]
    pub fn td_error(&self, state_n: f64, state_o: f64, discount: f64) -> f64 {
        let punishment = if self.collided {
            self.config.punishment
        } else {
            0.0
        };
        punishment + discount * state_n - state_o
    }

    /// One TD learning step on both networks; returns the TD error.
    ///
    /// Each network learns from whatever it was last activated with.
    pub fn learn(
        &mut self,
        state_n: f64,
        state_o: f64,
        discount: f64,
        learning_rate: f64,
    ) -> Result<f64> {
        let td = self.td_error(state_n, state_o, discount);

        self.actor.learn(&[td; ACTION_DIM], Some(learning_rate))?;
        self.critic.learn(&[td], Some(learning_rate))?;

        if self.config.normalize_weights {
            let changed = self.actor.normalize_weights()? + self.critic.normalize_weights()?;
            trace!(changed, "normalised weights");
        }

        self.updates += 1;
        Ok(td)
    }

    /// Latch a collision for the next learning step
    pub fn set_collision(&mut self) {
        self.collided = true;
    }

    /// Clear the collision latch
    pub fn reset_collision(&mut self) {
        self.collided = false;
    }

    /// Whether a collision is latched
    #[must_use]
    pub fn collided(&self) -> bool {
        self.collided
    }

    /// Learning steps taken since construction
    #[must_use]
    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub(crate) fn set_updates(&mut self, updates: u64) {
        self.updates = updates;
    }

    /// Agent configuration
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Actor network
    #[must_use]
    pub fn actor(&self) -> &Network {
        &self.actor
    }

    /// Critic network
    #[must_use]
    pub fn critic(&self) -> &Network {
        &self.critic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config() -> AgentConfig {
        AgentConfig {
            actor_hidden: vec![4],
            critic_hidden: vec![4],
            ..AgentConfig::default()
        }
    }

    fn output_errors(network: &Network) -> Vec<f64> {
        network
            .output_layer()
            .unit_ids()
            .map(|id| network.arena().unit(id).unwrap().error())
            .collect()
    }

    #[test]
    fn test_rescale_is_symmetric() {
        let low = RollAction::from_outputs(-1.0, -1.0, 255.0);
        assert_abs_diff_eq!(low.speed, 0.0);
        assert_abs_diff_eq!(low.heading, 0.0);

        let mid = RollAction::from_outputs(0.0, 0.0, 255.0);
        assert_abs_diff_eq!(mid.speed, 127.5);
        assert_abs_diff_eq!(mid.heading, 179.5);

        let high = RollAction::from_outputs(1.0, 1.0, 100.0);
        assert_abs_diff_eq!(high.speed, 100.0);
        assert_abs_diff_eq!(high.heading, 359.0);
    }

    #[test]
    fn test_action_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut agent = ActorCritic::new(small_config(), &mut rng).unwrap();
        for i in 0..20 {
            let x = f64::from(i) / 10.0 - 1.0;
            let action = agent.action(&[x, -x, 0.5], 255.0).unwrap();
            assert!((0.0..=255.0).contains(&action.speed));
            assert!((0.0..=MAX_HEADING).contains(&action.heading));
        }
    }

    #[test]
    fn test_state_value_is_critic_output() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut agent = ActorCritic::new(small_config(), &mut rng).unwrap();
        let value = agent.state_value(&[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(value, agent.critic().output()[0]);
        assert!(value > -1.0 && value < 1.0);
    }

    #[test]
    fn test_collision_td_error_reaches_every_output() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut agent = ActorCritic::new(small_config(), &mut rng).unwrap();
        agent.state_value(&[0.2, 0.4, 0.1]).unwrap();
        agent.action(&[0.2, 0.4, 0.1], 255.0).unwrap();

        agent.set_collision();
        let td = agent.learn(0.5, 0.2, 0.9, 0.001).unwrap();

        assert_abs_diff_eq!(td, -0.75, epsilon = 1e-12);
        for error in output_errors(agent.actor()) {
            assert_abs_diff_eq!(error, -0.75, epsilon = 1e-12);
        }
        let critic_errors = output_errors(agent.critic());
        assert_eq!(critic_errors.len(), 1);
        assert_abs_diff_eq!(critic_errors[0], -0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_no_punishment_without_collision() {
        let agent = ActorCritic::with_constant_weight(small_config(), 0.1).unwrap();
        assert_abs_diff_eq!(agent.td_error(0.5, 0.2, 0.9), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_collision_latch() {
        let mut agent = ActorCritic::with_constant_weight(small_config(), 0.1).unwrap();
        assert!(!agent.collided());
        agent.set_collision();
        agent.set_collision();
        assert!(agent.collided());
        agent.reset_collision();
        assert!(!agent.collided());
    }

    #[test]
    fn test_learning_step_moves_critic_weights() {
        let mut agent = ActorCritic::with_constant_weight(small_config(), 0.1).unwrap();
        let before: Vec<f64> = agent.critic().connections().iter().map(|c| c.weight()).collect();

        agent.state_value(&[0.5, 0.5, 0.5]).unwrap();
        agent.action(&[0.5, 0.5, 0.5], 255.0).unwrap();
        agent.learn(1.0, 0.0, 0.7, 0.01).unwrap();

        let after: Vec<f64> = agent.critic().connections().iter().map(|c| c.weight()).collect();
        assert_ne!(before, after);
        assert_eq!(agent.updates(), 1);
    }

    #[test]
    fn test_feature_count_is_checked() {
        let mut agent = ActorCritic::with_constant_weight(small_config(), 0.1).unwrap();
        assert!(matches!(
            agent.state_value(&[0.1, 0.2]),
            Err(AgentError::Network(_))
        ));
    }

    #[test]
    fn test_mismatched_networks_are_rejected() {
        let config = small_config();
        let actor =
            Network::with_constant_weight(&[3, 4, 2], config.learning_params(), 0.1).unwrap();
        let critic =
            Network::with_constant_weight(&[3, 5, 1], config.learning_params(), 0.1).unwrap();
        assert!(matches!(
            ActorCritic::from_networks(config, actor, critic),
            Err(AgentError::Config(_))
        ));
    }

    #[test]
    fn test_normalisation_after_learning() {
        let config = AgentConfig {
            normalize_weights: true,
            ..small_config()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let mut agent = ActorCritic::new(config, &mut rng).unwrap();
        agent.state_value(&[0.3, -0.2, 0.4]).unwrap();
        agent.action(&[0.3, -0.2, 0.4], 255.0).unwrap();
        agent.learn(0.1, 0.3, 0.7, 0.01).unwrap();

        let critic = agent.critic();
        let output = critic.output_layer().unit_ids().next().unwrap();
        let weights: Vec<f64> = critic
            .arena()
            .unit(output)
            .unwrap()
            .incoming()
            .iter()
            .map(|c| critic.arena().connection(*c).unwrap().weight())
            .collect();
        let mean = weights.iter().sum::<f64>() / weights.len() as f64;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
    }
}
