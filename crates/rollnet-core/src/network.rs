//! Feedforward networks of fully connected layers

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Arena, Connection, Layer, LearningParams, NetError, Result, Unit};

/// Where a network stands in its activate / propagate / update cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Nothing computed yet
    Idle,
    /// Activations are current for the last input
    Activated,
    /// Error signals are current for the last activation
    ErrorPropagated,
    /// Weights have been updated from the current errors
    WeightsUpdated,
}

/// One input layer, zero or more hidden layers and one output layer.
///
/// Phases may be called out of order: every call simply recomputes from
/// whatever values the units currently hold. Out-of-order calls are logged
/// at debug level.
#[derive(Debug, Clone)]
pub struct Network {
    arena: Arena,
    input: Layer,
    hidden: Vec<Layer>,
    output: Layer,
    params: LearningParams,
    phase: Phase,
}

impl Network {
    /// Build a network from `[input, hidden..., output]` layer sizes
    pub fn new<R: Rng + ?Sized>(
        topology: &[usize],
        params: LearningParams,
        rng: &mut R,
    ) -> Result<Self> {
        Self::with_initializer(topology, params, &mut || Connection::random_weight(rng))
    }

    /// Build a network whose every weight is `weight`
    pub fn with_constant_weight(
        topology: &[usize],
        params: LearningParams,
        weight: f64,
    ) -> Result<Self> {
        Self::with_initializer(topology, params, &mut || weight)
    }

    pub(crate) fn with_initializer(
        topology: &[usize],
        params: LearningParams,
        init: &mut dyn FnMut() -> f64,
    ) -> Result<Self> {
        validate_topology(topology)?;

        let mut arena = Arena::new();
        let input = Layer::with_initializer(&mut arena, topology[0], None, params, init)?;

        let inner = &topology[1..topology.len() - 1];
        let mut hidden: Vec<Layer> = Vec::with_capacity(inner.len());
        for &count in inner {
            let prev = hidden.last().unwrap_or(&input);
            let layer = Layer::with_initializer(&mut arena, count, Some(prev), params, init)?;
            hidden.push(layer);
        }

        let last = hidden.last().unwrap_or(&input);
        let output = Layer::with_initializer(
            &mut arena,
            topology[topology.len() - 1],
            Some(last),
            params,
            init,
        )?;

        Ok(Self {
            arena,
            input,
            hidden,
            output,
            params,
            phase: Phase::Idle,
        })
    }

    /// Feed `input` forward through the network.
    ///
    /// Input values are written straight into the input units; hidden
    /// layers are then activated from input to output, followed by the
    /// output layer.
    pub fn activate(&mut self, input: &[f64]) -> Result<()> {
        if self.phase == Phase::ErrorPropagated {
            debug!("activating before the propagated errors were applied");
        }

        self.input.set_activations(&mut self.arena, input)?;
        for layer in &self.hidden {
            layer.activate(&mut self.arena)?;
        }
        self.output.activate(&mut self.arena)?;

        self.phase = Phase::Activated;
        Ok(())
    }

    /// Set the output errors and propagate them back to the first hidden layer
    pub fn update_error(&mut self, errors: &[f64]) -> Result<()> {
        if self.phase != Phase::Activated {
            debug!(phase = ?self.phase, "propagating errors without a fresh activation");
        }

        self.output.update_error(&mut self.arena, Some(errors))?;
        for layer in self.hidden.iter().rev() {
            layer.update_error(&mut self.arena, None)?;
        }

        self.phase = Phase::ErrorPropagated;
        Ok(())
    }

    /// Update every connection from the current errors and activations.
    ///
    /// `learning_rate` overrides each connection's own rate when given.
    pub fn update_weight(&mut self, learning_rate: Option<f64>) -> Result<()> {
        if self.phase != Phase::ErrorPropagated {
            debug!(phase = ?self.phase, "updating weights from stale error signals");
        }

        for layer in &self.hidden {
            layer.update_weight(&mut self.arena, learning_rate)?;
        }
        self.output.update_weight(&mut self.arena, learning_rate)?;

        self.phase = Phase::WeightsUpdated;
        Ok(())
    }

    /// `update_error` followed by `update_weight`
    pub fn learn(&mut self, errors: &[f64], learning_rate: Option<f64>) -> Result<()> {
        self.update_error(errors)?;
        self.update_weight(learning_rate)
    }

    /// Activations of the output units, in unit order
    #[must_use]
    pub fn output(&self) -> Vec<f64> {
        self.output.activations(&self.arena)
    }

    /// Normalise the incoming weights of every non-input unit.
    ///
    /// Units whose weights have no dispersion are skipped. Returns the
    /// number of units that were changed.
    pub fn normalize_weights(&mut self) -> Result<usize> {
        let mut changed = 0;
        for layer in self.hidden.iter().chain(std::iter::once(&self.output)) {
            changed += layer.normalize_weights(&mut self.arena)?;
        }
        Ok(changed)
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Hyperparameters the connections were created with
    #[must_use]
    pub fn params(&self) -> LearningParams {
        self.params
    }

    /// Layer sizes, input first
    #[must_use]
    pub fn topology(&self) -> Vec<usize> {
        std::iter::once(&self.input)
            .chain(&self.hidden)
            .chain(std::iter::once(&self.output))
            .map(Layer::len)
            .collect()
    }

    /// Number of input units
    #[must_use]
    pub fn input_size(&self) -> usize {
        self.input.len()
    }

    /// Number of output units
    #[must_use]
    pub fn output_size(&self) -> usize {
        self.output.len()
    }

    /// The input layer
    #[must_use]
    pub fn input_layer(&self) -> &Layer {
        &self.input
    }

    /// Hidden layers, input side first
    #[must_use]
    pub fn hidden_layers(&self) -> &[Layer] {
        &self.hidden
    }

    /// The output layer
    #[must_use]
    pub fn output_layer(&self) -> &Layer {
        &self.output
    }

    /// Layer `index` in topology order, input first
    #[must_use]
    pub fn layer(&self, index: usize) -> Option<&Layer> {
        match index {
            0 => Some(&self.input),
            i if i <= self.hidden.len() => self.hidden.get(i - 1),
            i if i == self.hidden.len() + 1 => Some(&self.output),
            _ => None,
        }
    }

    /// Backing arena
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// All units
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        self.arena.units()
    }

    /// All connections, in creation order
    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        self.arena.connections()
    }

    /// Mutable access to the connections
    pub fn connections_mut(&mut self) -> &mut [Connection] {
        self.arena.connections_mut()
    }

    /// Number of connections
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.arena.connections().len()
    }
}

fn validate_topology(topology: &[usize]) -> Result<()> {
    if topology.len() < 2 {
        return Err(NetError::InvalidTopology(format!(
            "need at least an input and an output layer, got {} layer(s)",
            topology.len()
        )));
    }
    if let Some(i) = topology.iter().position(|&n| n == 0) {
        return Err(NetError::InvalidTopology(format!("layer {i} has no units")));
    }
    Ok(())
}
