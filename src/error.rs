//! Error kinds raised by the simulator.

use thiserror::Error;

/// Failure kinds of the dynamics core.
///
/// Functions return [`anyhow::Result`] with context attached along the way;
/// the root cause can be recovered with `err.downcast_ref::<DynamicsError>()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DynamicsError {
    /// Invalid construction parameters.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A population state does not match the configured shape or totals.
    #[error("invalid state for player type {player}: {expected}")]
    StateShape { player: usize, expected: String },

    /// A payoff snapshot does not match the configured strategy counts.
    #[error("invalid payoffs for player type {player}: {expected}")]
    PayoffShape { player: usize, expected: String },

    /// A state has the wrong number of player types.
    #[error("state must have {expected} player types, but has {found}")]
    PlayerTypeCount { expected: usize, found: usize },

    /// A multi-group value has the wrong number of groups.
    #[error("expected {expected} groups, but got {found}")]
    GroupCount { expected: usize, found: usize },

    /// A request that cannot be honored with the current configuration.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// Rounding could not preserve the total; indicates a caller bug.
    #[error("apportionment invariant violated: {0}")]
    Apportionment(String),
}
