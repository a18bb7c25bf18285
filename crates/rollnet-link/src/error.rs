//! Error types for robot links

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a [`RobotLink`](crate::RobotLink)
#[derive(Error, Debug)]
pub enum LinkError {
    /// A command was issued while the link was down
    #[error("Robot link is not connected")]
    NotConnected,

    /// `connect` was called twice
    #[error("Robot link is already connected")]
    AlreadyConnected,

    /// The transport failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The I/O task did not stop in time
    #[error("I/O task did not stop within {0:?}")]
    JoinTimeout(Duration),

    /// Link parameters that cannot be used
    #[error("Invalid link configuration: {0}")]
    InvalidConfig(String),

    /// The I/O task panicked or was cancelled
    #[error("I/O task failed: {0}")]
    TaskFailed(String),
}

/// Result type alias for link operations
pub type Result<T> = std::result::Result<T, LinkError>;
