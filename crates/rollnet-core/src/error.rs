//! Error types for the network engine

use thiserror::Error;

/// Core error type for network operations
///
/// Every variant is a contract violation on the caller's side: vectors of
/// the wrong length, ids that do not name anything in the arena, or
/// snapshots that do not describe a well-formed network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetError {
    /// Input or error vector length does not match the unit count
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Number of units the layer holds
        expected: usize,
        /// Length of the vector that was supplied
        actual: usize,
    },

    /// A connection endpoint does not name a unit of the arena
    #[error("Unknown unit: {0}")]
    UnknownUnit(usize),

    /// A unit refers to a connection that is not in the arena
    #[error("Unknown connection: {0}")]
    UnknownConnection(usize),

    /// Layer sizes that cannot form a network
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// A snapshot that cannot be turned back into a network
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

/// Result type alias for network operations
pub type Result<T> = std::result::Result<T, NetError>;
