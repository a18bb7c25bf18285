//! Storage for units and connections
//!
//! The arena owns every [`Unit`] and [`Connection`] of a network. Units
//! refer to connections and connections refer to units by index, which
//! keeps the bidirectional graph free of ownership cycles.

use rand::Rng;

use crate::{Connection, ConnectionId, LearningParams, NetError, Result, Unit, UnitId};

/// Owner of all units and connections of one network
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arena {
    units: Vec<Unit>,
    connections: Vec<Connection>,
}

impl Arena {
    /// Create an empty arena
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All units, indexed by [`UnitId`]
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// All connections, indexed by [`ConnectionId`]
    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Mutable access to the connections, e.g. to pin weights in tests
    pub fn connections_mut(&mut self) -> &mut [Connection] {
        &mut self.connections
    }

    /// Look up a unit
    pub fn unit(&self, id: UnitId) -> Result<&Unit> {
        self.units.get(id.0).ok_or(NetError::UnknownUnit(id.0))
    }

    /// Look up a unit mutably
    pub fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit> {
        self.units.get_mut(id.0).ok_or(NetError::UnknownUnit(id.0))
    }

    /// Look up a connection
    pub fn connection(&self, id: ConnectionId) -> Result<&Connection> {
        self.connections
            .get(id.0)
            .ok_or(NetError::UnknownConnection(id.0))
    }

    /// Append a fresh unit
    pub fn add_unit(&mut self) -> UnitId {
        self.units.push(Unit::new());
        UnitId(self.units.len() - 1)
    }

    /// Connect two units with a randomly weighted connection
    pub fn connect<R: Rng + ?Sized>(
        &mut self,
        source: UnitId,
        destination: UnitId,
        params: LearningParams,
        rng: &mut R,
    ) -> Result<ConnectionId> {
        self.insert(Connection::new(source, destination, params, rng))
    }

    /// Add a connection and register it on both endpoints.
    ///
    /// Fails with [`NetError::UnknownUnit`] if either endpoint is not a unit
    /// of this arena.
    pub fn insert(&mut self, connection: Connection) -> Result<ConnectionId> {
        let (source, destination) = (connection.source(), connection.destination());
        self.unit(source)?;
        self.unit(destination)?;

        let id = ConnectionId(self.connections.len());
        self.connections.push(connection);
        self.units[source.0].add_outgoing(id);
        self.units[destination.0].add_incoming(id);
        Ok(id)
    }

    /// `activation = tanh(Σ incoming weighted outputs)`
    pub fn activate_unit(&mut self, id: UnitId) -> Result<f64> {
        let sum = self.unit(id)?.net_input(&self.connections, &self.units);
        let activation = sum.tanh();
        self.units[id.0].set_activation(activation);
        Ok(activation)
    }

    /// Store an explicit error, or back-propagate one from the outgoing
    /// connections when `explicit` is `None`.
    ///
    /// Downstream errors must already be current.
    pub fn update_unit_error(&mut self, id: UnitId, explicit: Option<f64>) -> Result<f64> {
        let error = match explicit {
            Some(error) => error,
            None => self
                .unit(id)?
                .backpropagated_error(&self.connections, &self.units),
        };
        self.unit_mut(id)?.set_error(error);
        Ok(error)
    }

    /// Update every incoming connection of a unit
    pub fn update_unit_weight(&mut self, id: UnitId, learning_rate: Option<f64>) -> Result<()> {
        let unit = self.units.get(id.0).ok_or(NetError::UnknownUnit(id.0))?;
        for c in unit.incoming() {
            self.connections[c.0].update_weight(&self.units, learning_rate);
        }
        Ok(())
    }

    /// Shift the incoming weights of a unit to zero mean and unit variance.
    ///
    /// Returns `false` without touching anything when the unit has no inputs
    /// or its weights have no dispersion.
    pub fn normalize_unit_weights(&mut self, id: UnitId) -> Result<bool> {
        let unit = self.units.get(id.0).ok_or(NetError::UnknownUnit(id.0))?;
        if unit.incoming().is_empty() {
            return Ok(false);
        }

        #[allow(clippy::cast_precision_loss)]
        let n = unit.incoming().len() as f64;
        let mean = unit
            .incoming()
            .iter()
            .map(|c| self.connections[c.0].weight())
            .sum::<f64>()
            / n;
        let variance = unit
            .incoming()
            .iter()
            .map(|c| (self.connections[c.0].weight() - mean).powi(2))
            .sum::<f64>()
            / n;
        let deviation = variance.sqrt();
        if deviation <= f64::EPSILON {
            return Ok(false);
        }

        for c in unit.incoming() {
            let connection = &mut self.connections[c.0];
            connection.set_weight((connection.weight() - mean) / deviation);
        }
        Ok(true)
    }
}
