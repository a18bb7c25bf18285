//! Robot link capability for rollnet
//!
//! This crate provides:
//! - the [`RobotLink`] trait the control loop drives a robot through
//! - telemetry events and the immutable [`SensorSnapshot`] built from them
//! - [`SensorHub`], which turns link callbacks into a snapshot channel
//! - [`SimulatedRobot`], a link to a robot rolling around a walled arena

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod hub;
pub mod link;
pub mod sim;
pub mod telemetry;

pub use error::{LinkError, Result};
pub use hub::{SensorFeed, SensorHub};
pub use link::{EventCallback, RobotLink, RollCommand};
pub use sim::{SimConfig, SimulatedRobot};
pub use telemetry::{CollisionPoint, EventKind, PowerState, SensorSnapshot, TelemetryEvent};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        LinkError, PowerState, RobotLink, RollCommand, SensorFeed, SensorHub, SensorSnapshot,
    };
}
