//! Ordered groups of units

use rand::Rng;

use crate::{Arena, Connection, LearningParams, NetError, Result, UnitId};

/// A contiguous, ordered run of units in an [`Arena`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    start: usize,
    len: usize,
}

impl Layer {
    /// Create `count` units, fully connected to `predecessor` if given.
    ///
    /// Connection weights are drawn uniformly from [-1, 1].
    pub fn new<R: Rng + ?Sized>(
        arena: &mut Arena,
        count: usize,
        predecessor: Option<&Layer>,
        params: LearningParams,
        rng: &mut R,
    ) -> Result<Self> {
        Self::with_initializer(arena, count, predecessor, params, &mut || {
            Connection::random_weight(rng)
        })
    }

    /// Same as [`Layer::new`] with weights produced by `init`.
    ///
    /// Connections are created destination-major: for every new unit, one
    /// connection from each predecessor unit in order.
    pub fn with_initializer(
        arena: &mut Arena,
        count: usize,
        predecessor: Option<&Layer>,
        params: LearningParams,
        init: &mut dyn FnMut() -> f64,
    ) -> Result<Self> {
        let start = arena.units().len();
        for _ in 0..count {
            arena.add_unit();
        }
        let layer = Self { start, len: count };

        if let Some(prev) = predecessor {
            for destination in layer.unit_ids() {
                for source in prev.unit_ids() {
                    arena.insert(Connection::with_weight(source, destination, params, init()))?;
                }
            }
        }

        Ok(layer)
    }

    /// Number of units
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the layer has no units
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Unit ids in layer order
    pub fn unit_ids(&self) -> impl Iterator<Item = UnitId> {
        (self.start..self.start + self.len).map(UnitId)
    }

    /// Activation of every unit, in order
    #[must_use]
    pub fn activations(&self, arena: &Arena) -> Vec<f64> {
        self.unit_ids()
            .map(|id| arena.units()[id.0].activation())
            .collect()
    }

    /// Assign activations directly, bypassing `tanh`
    pub fn set_activations(&self, arena: &mut Arena, values: &[f64]) -> Result<()> {
        self.check_len(values.len())?;
        for (id, &value) in self.unit_ids().zip(values) {
            arena.unit_mut(id)?.set_activation(value);
        }
        Ok(())
    }

    /// Activate every unit from the predecessor's current outputs
    pub fn activate(&self, arena: &mut Arena) -> Result<()> {
        for id in self.unit_ids() {
            arena.activate_unit(id)?;
        }
        Ok(())
    }

    /// Set one explicit error per unit, or back-propagate when `errors` is `None`
    pub fn update_error(&self, arena: &mut Arena, errors: Option<&[f64]>) -> Result<()> {
        match errors {
            Some(errors) => {
                self.check_len(errors.len())?;
                for (id, &error) in self.unit_ids().zip(errors) {
                    arena.update_unit_error(id, Some(error))?;
                }
            }
            None => {
                for id in self.unit_ids() {
                    arena.update_unit_error(id, None)?;
                }
            }
        }
        Ok(())
    }

    /// Update the incoming connections of every unit
    pub fn update_weight(&self, arena: &mut Arena, learning_rate: Option<f64>) -> Result<()> {
        for id in self.unit_ids() {
            arena.update_unit_weight(id, learning_rate)?;
        }
        Ok(())
    }

    /// Normalise incoming weights per unit; returns how many units changed
    pub fn normalize_weights(&self, arena: &mut Arena) -> Result<usize> {
        let mut changed = 0;
        for id in self.unit_ids() {
            if arena.normalize_unit_weights(id)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn check_len(&self, actual: usize) -> Result<()> {
        if actual == self.len {
            Ok(())
        } else {
            Err(NetError::DimensionMismatch {
                expected: self.len,
                actual,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_full_connection_counts() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut arena = Arena::new();
        let params = LearningParams::default();
        let prev = Layer::new(&mut arena, 4, None, params, &mut rng).unwrap();
        let next = Layer::new(&mut arena, 3, Some(&prev), params, &mut rng).unwrap();

        assert_eq!(arena.connections().len(), 12);
        for id in prev.unit_ids() {
            assert_eq!(arena.unit(id).unwrap().outgoing().len(), 3);
            assert!(arena.unit(id).unwrap().incoming().is_empty());
        }
        for id in next.unit_ids() {
            assert_eq!(arena.unit(id).unwrap().incoming().len(), 4);
            assert!(arena.unit(id).unwrap().outgoing().is_empty());
        }
    }

    #[test]
    fn test_layer_without_predecessor_has_no_connections() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut arena = Arena::new();
        let layer = Layer::new(&mut arena, 5, None, LearningParams::default(), &mut rng).unwrap();
        assert_eq!(layer.len(), 5);
        assert!(arena.connections().is_empty());
    }

    #[test]
    fn test_update_error_length_mismatch() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut arena = Arena::new();
        let layer = Layer::new(&mut arena, 2, None, LearningParams::default(), &mut rng).unwrap();

        let err = layer
            .update_error(&mut arena, Some(&[0.1, 0.2, 0.3]))
            .unwrap_err();
        assert_eq!(
            err,
            NetError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_explicit_errors_stored_in_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut arena = Arena::new();
        let layer = Layer::new(&mut arena, 2, None, LearningParams::default(), &mut rng).unwrap();

        layer.update_error(&mut arena, Some(&[0.25, -0.5])).unwrap();
        let errors: Vec<f64> = layer
            .unit_ids()
            .map(|id| arena.unit(id).unwrap().error())
            .collect();
        assert_eq!(errors, vec![0.25, -0.5]);
    }
}
