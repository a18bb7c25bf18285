//! Neural computation engine for rollnet
//!
//! A fully-connected feedforward network built from per-unit objects:
//! [`Connection`]s carry a weight and a momentum term, [`Unit`]s aggregate
//! their incoming connections through `tanh`, [`Layer`]s group units and
//! [`Network`] drives forward activation and error back-propagation.
//!
//! Units and connections live in an [`Arena`] owned by the network and refer
//! to each other by index, so the unit/connection graph has no ownership
//! cycles and can be snapshotted cheaply.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod arena;
pub mod connection;
pub mod error;
pub mod layer;
pub mod network;
pub mod snapshot;
pub mod unit;

// Re-export core types
pub use arena::Arena;
pub use connection::{Connection, ConnectionId, LearningParams};
pub use error::{NetError, Result};
pub use layer::Layer;
pub use network::{Network, Phase};
pub use snapshot::{ConnectionState, NetworkSnapshot};
pub use unit::{Unit, UnitId};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{LearningParams, NetError, Network, NetworkSnapshot, Result};
}
