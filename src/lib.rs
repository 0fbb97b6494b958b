//! Generation-by-generation simulation of evolutionary game dynamics.
//!
//! A [`Simulator`] drives a pluggable [`TransitionRule`] over one or more
//! groups of players, validating every generation and recording a
//! [`Trajectory`] that can be averaged over groups.

pub mod apportion;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod payoff;
pub mod rules;
pub mod sampling;
pub mod validator;

pub use apportion::round_individuals;
pub use config::{FitnessKind, SimConfig};
pub use engine::Simulator;
pub use error::DynamicsError;
pub use model::{Generation, GroupAverage, PayoffSnapshot, PopulationState, Trajectory};
pub use payoff::{Evaluator, FitnessTransform, PayoffMatrix};
pub use rules::{Replicator, TransitionRule, WrightFisher};
pub use validator::{StateSpec, validate_state};
