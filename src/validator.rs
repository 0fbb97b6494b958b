//! Shape and total checks for population states.

use crate::error::DynamicsError;
use crate::model::{PayoffSnapshot, PopulationState};
use anyhow::{Result, bail};

/// Tolerance on a player type's total mass in an infinite population.
pub const MASS_TOLERANCE: f64 = 1e-5;

/// Expected shape of a population state.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSpec<'a> {
    /// Configured number (or mass) of players of each type.
    pub totals: &'a [f64],
    /// Number of strategies of each type.
    pub num_strats: &'a [usize],
    /// Whether counts are real masses instead of integers.
    pub infinite: bool,
}

impl StateSpec<'_> {
    /// Check `state` against this shape and return it unchanged.
    ///
    /// # Errors
    /// Returns a [`DynamicsError`] naming the offending player type if the
    /// number of types, a strategy count, an entry or a total is wrong.
    pub fn validate(&self, state: PopulationState) -> Result<PopulationState> {
        let n_types = self.num_strats.len();
        if state.num_player_types() != n_types {
            bail!(DynamicsError::PlayerTypeCount {
                expected: n_types,
                found: state.num_player_types(),
            });
        }

        for (player, ((dist, &expected), &n_strats)) in state
            .iter()
            .zip(self.totals)
            .zip(self.num_strats)
            .enumerate()
        {
            let shape_err = |msg: String| DynamicsError::StateShape {
                player,
                expected: msg,
            };

            if dist.len() != n_strats {
                bail!(shape_err(format!(
                    "must have {n_strats} strategies, but has {}",
                    dist.len()
                )));
            }
            if let Some(val) = dist.iter().find(|val| !val.is_finite() || **val < 0.0) {
                bail!(shape_err(format!(
                    "counts must be finite and non-negative, but found {val}"
                )));
            }
            if !self.infinite
                && let Some(val) = dist.iter().find(|val| val.fract() != 0.0)
            {
                bail!(shape_err(format!(
                    "counts must be integers in a finite population, but found {val}"
                )));
            }

            let sum: f64 = dist.iter().sum();
            let matches = if self.infinite {
                (sum - expected).abs() <= MASS_TOLERANCE
            } else {
                sum == expected
            };
            if !matches {
                bail!(shape_err(format!("total must be {expected}, but is {sum}")));
            }
        }

        Ok(state)
    }

    /// Check that `snapshot` holds one payoff per strategy of every type.
    pub fn validate_payoffs(&self, snapshot: &PayoffSnapshot) -> Result<()> {
        let n_types = self.num_strats.len();
        if snapshot.payoffs.len() != n_types {
            bail!(DynamicsError::PlayerTypeCount {
                expected: n_types,
                found: snapshot.payoffs.len(),
            });
        }

        for (player, (row, &n_strats)) in snapshot.payoffs.iter().zip(self.num_strats).enumerate() {
            if row.len() != n_strats {
                bail!(DynamicsError::PayoffShape {
                    player,
                    expected: format!("must have {n_strats} entries, but has {}", row.len()),
                });
            }
        }

        Ok(())
    }
}

/// Check `state` against the given totals and strategy counts.
///
/// Accepts any plain nested representation convertible into a
/// [`PopulationState`].
pub fn validate_state<S: Into<PopulationState>>(
    state: S,
    totals: &[f64],
    num_strats: &[usize],
    infinite: bool,
) -> Result<PopulationState> {
    StateSpec {
        totals,
        num_strats,
        infinite,
    }
    .validate(state.into())
}
