//! Online actor-critic learning for a rolling robot
//!
//! This crate couples two [`rollnet_core::Network`]s through a TD(0) rule:
//! - [`ActorCritic`] - state value, roll action and the learning step
//! - [`persistence`] - compressed weight snapshots with soft-failing loads
//! - [`CollisionLog`] - de-duplicated, append-only collision positions
//! - [`Trainer`] - the control loop driving a [`rollnet_link::RobotLink`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actor_critic;
pub mod collision_log;
pub mod config;
pub mod error;
pub mod persistence;
pub mod runner;

pub use actor_critic::{ActorCritic, RollAction, ACTION_DIM};
pub use collision_log::CollisionLog;
pub use config::{AgentConfig, TrainerConfig};
pub use error::{AgentError, PersistError, Result};
pub use persistence::WeightSnapshot;
pub use runner::{features, ExitReason, RunSummary, Trainer, FEATURE_COUNT};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ActorCritic, AgentConfig, CollisionLog, ExitReason, RunSummary, Trainer, TrainerConfig,
    };
    pub use rollnet_core::prelude::*;
    pub use rollnet_link::prelude::*;
}
