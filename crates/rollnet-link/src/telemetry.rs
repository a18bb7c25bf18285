//! Telemetry events and sensor snapshots

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Battery state reported by the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PowerState {
    /// On the charger
    Charging = 1,
    /// Battery fine
    Ok = 2,
    /// Battery low
    Low = 3,
    /// Battery critical, the robot must stop
    Critical = 4,
}

impl PowerState {
    /// Numeric level, 1 (charging) to 4 (critical)
    #[must_use]
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Parse a numeric level
    #[must_use]
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Charging),
            2 => Some(Self::Ok),
            3 => Some(Self::Low),
            4 => Some(Self::Critical),
            _ => None,
        }
    }

    /// Whether the robot has to stop
    #[must_use]
    pub fn is_critical(self) -> bool {
        self == Self::Critical
    }
}

/// Where a collision happened, in whole centimetres
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollisionPoint {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
    /// Z coordinate
    pub z: i32,
}

impl CollisionPoint {
    /// Create a point
    #[must_use]
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for CollisionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

impl FromStr for CollisionPoint {
    type Err = String;

    /// Parse `x,y,z`; surrounding parentheses and whitespace are ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(format!("expected 3 coordinates, got {}: {s:?}", parts.len()));
        }

        let mut coords = [0i32; 3];
        for (slot, part) in coords.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|e| format!("bad coordinate {part:?}: {e}"))?;
        }
        Ok(Self::new(coords[0], coords[1], coords[2]))
    }
}

/// Kinds of events a link can be subscribed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Position and velocity stream
    Telemetry,
    /// Collision detection
    Collision,
    /// Power notifications
    Power,
}

/// An event delivered by the link's I/O task
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryEvent {
    /// Position (cm) and velocity (cm/s)
    Motion {
        /// X position
        x: f64,
        /// Y position
        y: f64,
        /// X velocity
        speed_x: f64,
        /// Y velocity
        speed_y: f64,
    },
    /// A collision at the given point
    Collision(CollisionPoint),
    /// New power state
    Power(PowerState),
}

impl TelemetryEvent {
    /// Kind used to route the event to subscribers
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Motion { .. } => EventKind::Telemetry,
            Self::Collision(_) => EventKind::Collision,
            Self::Power(_) => EventKind::Power,
        }
    }
}

/// Immutable view of the robot's latest sensor state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// X position (cm)
    pub x: f64,
    /// Y position (cm)
    pub y: f64,
    /// X velocity (cm/s)
    pub speed_x: f64,
    /// Y velocity (cm/s)
    pub speed_y: f64,
    /// Last reported power state
    pub power: PowerState,
    /// Collisions seen since the link was attached
    pub collisions: u64,
    /// Number of events merged into this snapshot
    pub sequence: u64,
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            speed_x: 0.0,
            speed_y: 0.0,
            power: PowerState::Ok,
            collisions: 0,
            sequence: 0,
        }
    }
}

impl SensorSnapshot {
    /// Magnitude of the velocity
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed_x.hypot(self.speed_y)
    }

    /// Merge one event into the snapshot
    pub fn apply(&mut self, event: &TelemetryEvent) {
        match *event {
            TelemetryEvent::Motion {
                x,
                y,
                speed_x,
                speed_y,
            } => {
                self.x = x;
                self.y = y;
                self.speed_x = speed_x;
                self.speed_y = speed_y;
            }
            TelemetryEvent::Collision(_) => self.collisions += 1,
            TelemetryEvent::Power(power) => self.power = power,
        }
        self.sequence += 1;
    }
}
