//! Serializable network state
//!
//! A [`NetworkSnapshot`] captures the layer sizes and, for every connection
//! in creation order, its endpoints, weight, momentum carry and
//! hyperparameters. Rebuilding from a snapshot reproduces the exact same
//! graph, so activation outputs match bit for bit.

use serde::{Deserialize, Serialize};

use crate::{Connection, LearningParams, NetError, Network, Result};

/// State of one connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionState {
    /// Source unit index
    pub source: usize,
    /// Destination unit index
    pub destination: usize,
    /// Weight
    pub weight: f64,
    /// Momentum carry
    pub previous_delta: f64,
    /// Own learning rate
    pub learning_rate: f64,
    /// Own momentum coefficient
    pub momentum: f64,
}

impl From<&Connection> for ConnectionState {
    fn from(c: &Connection) -> Self {
        Self {
            source: c.source().0,
            destination: c.destination().0,
            weight: c.weight(),
            previous_delta: c.previous_delta(),
            learning_rate: c.learning_rate(),
            momentum: c.momentum(),
        }
    }
}

/// Everything needed to rebuild a [`Network`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    /// Layer sizes, input first
    pub topology: Vec<usize>,
    /// Default hyperparameters of the network
    pub params: LearningParams,
    /// Connections in creation order
    pub connections: Vec<ConnectionState>,
}

impl Network {
    /// Capture the full weight graph
    #[must_use]
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            topology: self.topology(),
            params: self.params(),
            connections: self.connections().iter().map(ConnectionState::from).collect(),
        }
    }

    /// Rebuild a network from a snapshot.
    ///
    /// The topology is rebuilt first, then every connection is checked
    /// against the recorded endpoints before its state is restored.
    pub fn from_snapshot(snapshot: &NetworkSnapshot) -> Result<Self> {
        let mut network =
            Network::with_initializer(&snapshot.topology, snapshot.params, &mut || 0.0)
                .map_err(|e| NetError::CorruptSnapshot(e.to_string()))?;

        if network.connection_count() != snapshot.connections.len() {
            return Err(NetError::CorruptSnapshot(format!(
                "topology {:?} needs {} connections, snapshot has {}",
                snapshot.topology,
                network.connection_count(),
                snapshot.connections.len()
            )));
        }

        for (i, (connection, state)) in network
            .connections_mut()
            .iter_mut()
            .zip(&snapshot.connections)
            .enumerate()
        {
            if connection.source.0 != state.source || connection.destination.0 != state.destination
            {
                return Err(NetError::CorruptSnapshot(format!(
                    "connection {i} links {}->{}, expected {}->{}",
                    state.source, state.destination, connection.source.0, connection.destination.0
                )));
            }
            connection.weight = state.weight;
            connection.previous_delta = state.previous_delta;
            connection.learning_rate = state.learning_rate;
            connection.momentum = state.momentum;
        }

        Ok(network)
    }
}
