//! Computing units

use crate::{Connection, ConnectionId};

/// Index of a unit inside an [`Arena`](crate::Arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub usize);

/// A node aggregating its weighted inputs through `tanh`.
///
/// A unit does not own its connections; it only keeps their ids, in
/// insertion order, which is also the summation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unit {
    activation: f64,
    error: f64,
    incoming: Vec<ConnectionId>,
    outgoing: Vec<ConnectionId>,
}

impl Unit {
    /// Create a unit with zero activation and zero error
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last computed (or assigned) activation
    #[must_use]
    pub fn activation(&self) -> f64 {
        self.activation
    }

    /// Assign the activation directly (input units)
    pub fn set_activation(&mut self, value: f64) {
        self.activation = value;
    }

    /// Last computed (or assigned) error signal
    #[must_use]
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Assign the error signal directly (output units)
    pub fn set_error(&mut self, value: f64) {
        self.error = value;
    }

    /// Incoming connection ids
    #[must_use]
    pub fn incoming(&self) -> &[ConnectionId] {
        &self.incoming
    }

    /// Outgoing connection ids
    #[must_use]
    pub fn outgoing(&self) -> &[ConnectionId] {
        &self.outgoing
    }

    /// Register a connection ending at this unit
    pub fn add_incoming(&mut self, connection: ConnectionId) {
        self.incoming.push(connection);
    }

    /// Register a connection starting at this unit
    pub fn add_outgoing(&mut self, connection: ConnectionId) {
        self.outgoing.push(connection);
    }

    /// Sum of `weighted_output` over the incoming connections
    #[must_use]
    pub fn net_input(&self, connections: &[Connection], units: &[Unit]) -> f64 {
        self.incoming
            .iter()
            .map(|id| connections[id.0].weighted_output(units))
            .sum()
    }

    /// Error back-propagated from the destinations of the outgoing
    /// connections, scaled by the tanh derivative `1 - activation²`.
    #[must_use]
    pub fn backpropagated_error(&self, connections: &[Connection], units: &[Unit]) -> f64 {
        let downstream: f64 = self
            .outgoing
            .iter()
            .map(|id| {
                let c = &connections[id.0];
                units[c.destination().0].error() * c.weight()
            })
            .sum();
        downstream * (1.0 - self.activation * self.activation)
    }
}
