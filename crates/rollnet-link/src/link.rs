//! The robot link capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{EventKind, TelemetryEvent};

/// Callback invoked on the link's I/O task for every matching event
pub type EventCallback = Box<dyn Fn(&TelemetryEvent) + Send + Sync>;

/// A roll command in the robot's native units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollCommand {
    /// Speed, 0 to 255
    pub speed: u8,
    /// Heading in degrees, 0 to 359, clockwise from +y
    pub heading: u16,
    /// `true` to drive, `false` to brake
    pub drive: bool,
}

impl RollCommand {
    /// Largest valid heading
    pub const MAX_HEADING: u16 = 359;

    /// Create a command, wrapping the heading into 0..=359
    #[must_use]
    pub fn new(speed: u8, heading: u16, drive: bool) -> Self {
        Self {
            speed,
            heading: heading % (Self::MAX_HEADING + 1),
            drive,
        }
    }

    /// Round and clamp continuous speed and heading into a command
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_parts(speed: f64, heading: f64, drive: bool) -> Self {
        let speed = if speed.is_finite() {
            speed.round().clamp(0.0, f64::from(u8::MAX)) as u8
        } else {
            0
        };
        let heading = if heading.is_finite() {
            heading.round().clamp(0.0, f64::from(Self::MAX_HEADING)) as u16
        } else {
            0
        };
        Self {
            speed,
            heading,
            drive,
        }
    }

    /// Zero speed, brake
    #[must_use]
    pub fn stop() -> Self {
        Self {
            speed: 0,
            heading: 0,
            drive: false,
        }
    }
}

/// Capability set the control loop needs from a robot.
///
/// Implementations deliver telemetry from their own I/O task through the
/// subscribed callbacks. `disconnect` must stop and join that task.
#[async_trait]
pub trait RobotLink: Send {
    /// Open the link and start streaming telemetry
    async fn connect(&mut self) -> crate::Result<()>;

    /// Close the link and join the I/O task
    async fn disconnect(&mut self) -> crate::Result<()>;

    /// Send a roll command
    async fn roll(&mut self, command: RollCommand) -> crate::Result<()>;

    /// Register a callback for one kind of event
    fn subscribe(&mut self, kind: EventKind, callback: EventCallback);

    /// Whether the link is up
    fn is_connected(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_rounds_and_clamps() {
        assert_eq!(RollCommand::from_parts(127.6, 358.7, true), RollCommand::new(128, 359, true));
        assert_eq!(RollCommand::from_parts(-3.0, -10.0, true), RollCommand::new(0, 0, true));
        assert_eq!(RollCommand::from_parts(400.0, 720.0, false), RollCommand::new(255, 359, false));
        assert_eq!(RollCommand::from_parts(f64::NAN, f64::INFINITY, true), RollCommand::new(0, 0, true));
    }

    #[test]
    fn test_new_wraps_heading() {
        assert_eq!(RollCommand::new(10, 360, true).heading, 0);
        assert_eq!(RollCommand::new(10, 450, true).heading, 90);
    }
}
