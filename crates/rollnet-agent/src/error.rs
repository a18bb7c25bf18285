//! Error types for the agent crate

use rollnet_core::NetError;
use rollnet_link::LinkError;
use thiserror::Error;

/// Failures while reading or writing weight snapshots and collision logs
#[derive(Error, Debug)]
pub enum PersistError {
    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot bytes could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Snapshot written by an unknown format version
    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    /// Snapshot does not match the configured topology
    #[error("Incompatible snapshot: {0}")]
    Incompatible(String),

    /// Snapshot describes an invalid network
    #[error("Network error: {0}")]
    Network(#[from] NetError),

    /// Malformed collision log line
    #[error("Line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What was wrong with it
        message: String,
    },
}

/// Core error type for agent operations
#[derive(Error, Debug)]
pub enum AgentError {
    /// Contract violation in the network engine
    #[error("Network error: {0}")]
    Network(#[from] NetError),

    /// Robot link failure
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// Persistence failure
    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;
