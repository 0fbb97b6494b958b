//! Payoff and fitness evaluation.

use crate::config::{FitnessKind, SimConfig};
use crate::error::DynamicsError;
use crate::model::{PayoffSnapshot, PopulationState};
use crate::validator::StateSpec;
use anyhow::{Context, Result, bail};
use std::{fmt, sync::Arc};

/// Game definition consumed by the evaluator.
pub trait PayoffMatrix: Send + Sync {
    /// Number of player types.
    fn num_player_types(&self) -> usize;

    /// Number of strategies of each player type.
    fn num_strats(&self) -> &[usize];

    /// Expected payoff of playing `strat` as a player of type `player`,
    /// given the distribution of every player type.
    fn expected_payoff(&self, player: usize, strat: usize, state: &PopulationState) -> f64;
}

type FitnessFn = dyn Fn(f64, f64) -> f64 + Send + Sync;

/// Maps a payoff and a selection strength to a fitness.
#[derive(Clone)]
pub struct FitnessTransform {
    name: &'static str,
    func: Arc<FitnessFn>,
}

impl FitnessTransform {
    /// `e^(payoff * strength)`, strictly positive.
    pub fn exponential() -> Self {
        Self {
            name: "exponential",
            func: Arc::new(|payoff, strength| (payoff * strength).exp()),
        }
    }

    /// `payoff * strength`.
    pub fn linear() -> Self {
        Self {
            name: "linear",
            func: Arc::new(|payoff, strength| payoff * strength),
        }
    }

    /// User supplied mapping `(payoff, strength) -> fitness`.
    pub fn custom<F>(func: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: "custom",
            func: Arc::new(func),
        }
    }

    /// Resolve a configured kind; `Auto` depends on the stochastic flag.
    pub fn from_kind(kind: FitnessKind, stochastic: bool) -> Self {
        match kind {
            FitnessKind::Auto if stochastic => Self::exponential(),
            FitnessKind::Auto => Self::linear(),
            FitnessKind::Exponential => Self::exponential(),
            FitnessKind::Linear => Self::linear(),
        }
    }

    pub fn apply(&self, payoff: f64, strength: f64) -> f64 {
        (self.func)(payoff, strength)
    }

    /// Reject transforms that are not finite on simple payoffs.
    fn check(&self, strength: f64) -> Result<()> {
        for payoff in [0.0, 1.0] {
            let fitness = self.apply(payoff, strength);
            if !fitness.is_finite() {
                bail!(DynamicsError::Config(format!(
                    "{} fitness transform yields {fitness} for payoff {payoff} and strength {strength}",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FitnessTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitnessTransform")
            .field("name", &self.name)
            .finish()
    }
}

/// Computes payoffs and fitnesses for the configured game.
///
/// Shared read-only by the driver and the transition rule.
pub struct Evaluator {
    pm: Box<dyn PayoffMatrix>,
    num_strats: Vec<usize>,
    totals: Vec<f64>,
    infinite: bool,
    stochastic: bool,
    strength_individual: f64,
    strength_group: f64,
    fitness: FitnessTransform,
}

impl Evaluator {
    /// Create an evaluator for `pm` under `cfg`.
    ///
    /// # Errors
    /// Returns [`DynamicsError::Config`] if `cfg` is invalid or does not fit the game.
    pub fn new(cfg: &SimConfig, pm: Box<dyn PayoffMatrix>) -> Result<Self> {
        cfg.validate()?;

        let n_types = pm.num_player_types();
        cfg.validate_player_types(n_types)?;

        let num_strats = pm.num_strats().to_vec();
        if num_strats.len() != n_types {
            bail!(DynamicsError::Config(format!(
                "payoff matrix has {n_types} player types, but {} strategy counts",
                num_strats.len()
            )));
        }
        if let Some(player) = num_strats.iter().position(|&n_s| n_s == 0) {
            bail!(DynamicsError::Config(format!(
                "player type {player} has no strategies"
            )));
        }

        let totals = cfg.player_totals()?;

        let fitness = FitnessTransform::from_kind(cfg.selection.fitness, cfg.stochastic);

        let eval = Self {
            pm,
            num_strats,
            totals,
            infinite: cfg.is_infinite(),
            stochastic: cfg.stochastic,
            strength_individual: cfg.selection.strength_individual,
            strength_group: cfg.selection.strength_group,
            fitness,
        };
        eval.check_fitness()?;
        Ok(eval)
    }

    /// Replace the fitness transform.
    ///
    /// # Errors
    /// Returns [`DynamicsError::Config`] if the transform is not finite at
    /// the configured selection strengths.
    pub fn with_fitness_transform(mut self, fitness: FitnessTransform) -> Result<Self> {
        self.fitness = fitness;
        self.check_fitness()?;
        Ok(self)
    }

    fn check_fitness(&self) -> Result<()> {
        self.fitness
            .check(self.strength_individual)
            .context("invalid individual fitness transform")?;
        self.fitness
            .check(self.strength_group)
            .context("invalid group fitness transform")?;
        Ok(())
    }

    pub fn payoff_matrix(&self) -> &dyn PayoffMatrix {
        self.pm.as_ref()
    }

    pub fn num_player_types(&self) -> usize {
        self.num_strats.len()
    }

    pub fn num_strats(&self) -> &[usize] {
        &self.num_strats
    }

    /// Number (or mass) of players of each type in a group.
    pub fn totals(&self) -> &[f64] {
        &self.totals
    }

    pub fn is_infinite(&self) -> bool {
        self.infinite
    }

    pub fn is_stochastic(&self) -> bool {
        self.stochastic
    }

    pub fn strength_individual(&self) -> f64 {
        self.strength_individual
    }

    pub fn strength_group(&self) -> f64 {
        self.strength_group
    }

    pub fn fitness_transform(&self) -> &FitnessTransform {
        &self.fitness
    }

    /// Shape every group state must satisfy.
    pub fn state_spec(&self) -> StateSpec<'_> {
        StateSpec {
            totals: &self.totals,
            num_strats: &self.num_strats,
            infinite: self.infinite,
        }
    }

    /// Expected payoff of each (player type, strategy) pair and the
    /// population-weighted average payoff.
    pub fn calculate_payoffs(&self, state: &PopulationState) -> PayoffSnapshot {
        let payoffs: Vec<Vec<f64>> = self
            .num_strats
            .iter()
            .enumerate()
            .map(|(player, &n_s)| {
                (0..n_s)
                    .map(|strat| self.pm.expected_payoff(player, strat, state))
                    .collect()
            })
            .collect();

        let weighted: f64 = payoffs
            .iter()
            .zip(state.iter())
            .flat_map(|(row, dist)| row.iter().zip(dist).map(|(payoff, count)| payoff * count))
            .sum();
        let total = state.total();
        let avg_payoff = if total > 0.0 { weighted / total } else { 0.0 };

        PayoffSnapshot {
            payoffs,
            avg_payoff,
        }
    }

    /// Apply the fitness transform to every payoff.
    pub fn calculate_fitnesses(&self, payoffs: &[Vec<f64>], strength: f64) -> Vec<Vec<f64>> {
        payoffs
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&payoff| self.fitness.apply(payoff, strength))
                    .collect()
            })
            .collect()
    }

    /// Fitness of a group, from its average payoff.
    pub fn group_fitness(&self, snapshot: &PayoffSnapshot) -> f64 {
        self.fitness.apply(snapshot.avg_payoff, self.strength_group)
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("num_strats", &self.num_strats)
            .field("totals", &self.totals)
            .field("infinite", &self.infinite)
            .field("stochastic", &self.stochastic)
            .field("strength_individual", &self.strength_individual)
            .field("strength_group", &self.strength_group)
            .field("fitness", &self.fitness)
            .finish()
    }
}
