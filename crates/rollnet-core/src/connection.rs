//! Weighted edges between units

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Unit, UnitId};

/// Index of a connection inside an [`Arena`](crate::Arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub usize);

/// Hyperparameters every connection carries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningParams {
    /// Step size used when no override is passed to `update_weight`
    pub learning_rate: f64,
    /// Fraction of the previous delta carried into the next one
    pub momentum: f64,
}

impl Default for LearningParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            momentum: 0.7,
        }
    }
}

/// A weighted, directed edge from a source unit to a destination unit
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub(crate) source: UnitId,
    pub(crate) destination: UnitId,
    pub(crate) weight: f64,
    pub(crate) previous_delta: f64,
    pub(crate) learning_rate: f64,
    pub(crate) momentum: f64,
}

impl Connection {
    /// Create a connection with a weight drawn uniformly from [-1, 1]
    pub fn new<R: Rng + ?Sized>(
        source: UnitId,
        destination: UnitId,
        params: LearningParams,
        rng: &mut R,
    ) -> Self {
        Self::with_weight(source, destination, params, Self::random_weight(rng))
    }

    /// Create a connection with a fixed initial weight
    #[must_use]
    pub fn with_weight(
        source: UnitId,
        destination: UnitId,
        params: LearningParams,
        weight: f64,
    ) -> Self {
        Self {
            source,
            destination,
            weight,
            previous_delta: 0.0,
            learning_rate: params.learning_rate,
            momentum: params.momentum,
        }
    }

    /// Draw an initial weight from U[-1, 1]
    pub fn random_weight<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        rng.gen_range(-1.0..=1.0)
    }

    /// Unit the signal comes from
    #[must_use]
    pub fn source(&self) -> UnitId {
        self.source
    }

    /// Unit the signal goes to
    #[must_use]
    pub fn destination(&self) -> UnitId {
        self.destination
    }

    /// Current weight
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Overwrite the weight, keeping the momentum carry
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    /// Delta applied by the last update
    #[must_use]
    pub fn previous_delta(&self) -> f64 {
        self.previous_delta
    }

    /// Own learning rate
    #[must_use]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Own momentum coefficient
    #[must_use]
    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    /// `weight * source.activation`
    #[must_use]
    pub fn weighted_output(&self, units: &[Unit]) -> f64 {
        self.weight * units[self.source.0].activation()
    }

    /// Apply one gradient-with-momentum step and return the delta.
    ///
    /// `delta = lr * destination.error * source.activation + momentum * previous_delta`
    ///
    /// `learning_rate` overrides the connection's own rate when given. The
    /// destination's error and the source's activation must already be
    /// current.
    pub fn update_weight(&mut self, units: &[Unit], learning_rate: Option<f64>) -> f64 {
        let lr = learning_rate.unwrap_or(self.learning_rate);
        let error = units[self.destination.0].error();
        let input = units[self.source.0].activation();

        let delta = lr * error * input + self.momentum * self.previous_delta;
        self.weight += delta;
        self.previous_delta = delta;
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pair(source_out: f64, dest_err: f64) -> Vec<Unit> {
        let mut source = Unit::new();
        source.set_activation(source_out);
        let mut dest = Unit::new();
        dest.set_error(dest_err);
        vec![source, dest]
    }

    #[test]
    fn test_random_weight_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let c = Connection::new(UnitId(0), UnitId(1), LearningParams::default(), &mut rng);
            assert!((-1.0..=1.0).contains(&c.weight()));
            assert_eq!(c.previous_delta(), 0.0);
        }
    }

    #[test]
    fn test_weighted_output() {
        let units = pair(0.5, 0.0);
        let c = Connection::with_weight(UnitId(0), UnitId(1), LearningParams::default(), -0.4);
        assert_relative_eq!(c.weighted_output(&units), -0.2);
    }

    #[test]
    fn test_momentum_recurrence() {
        let units = pair(0.8, 0.5);
        let params = LearningParams {
            learning_rate: 0.1,
            momentum: 0.7,
        };
        let mut c = Connection::with_weight(UnitId(0), UnitId(1), params, 0.25);

        let d1 = c.update_weight(&units, None);
        assert_relative_eq!(d1, 0.1 * 0.5 * 0.8);

        let d2 = c.update_weight(&units, None);
        assert_relative_eq!(d2, 0.1 * 0.5 * 0.8 + 0.7 * d1);
        assert_relative_eq!(c.weight(), 0.25 + d1 + d2);
        assert_relative_eq!(c.previous_delta(), d2);
    }

    #[test]
    fn test_learning_rate_override() {
        let units = pair(1.0, 1.0);
        let mut c = Connection::with_weight(UnitId(0), UnitId(1), LearningParams::default(), 0.0);
        let delta = c.update_weight(&units, Some(0.5));
        assert_relative_eq!(delta, 0.5);
    }
}
