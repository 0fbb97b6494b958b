//! Simulation data types.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Distribution of players over strategies, one vector per player type.
///
/// Finite populations hold integral counts, infinite populations hold
/// non-negative masses. Both are stored as `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PopulationState(Vec<Vec<f64>>);

impl PopulationState {
    /// Create a state from one strategy vector per player type.
    pub fn new(dist: Vec<Vec<f64>>) -> Self {
        Self(dist)
    }

    /// State with every entry set to zero.
    pub fn zeros(num_strats: &[usize]) -> Self {
        Self(num_strats.iter().map(|&n_s| vec![0.0; n_s]).collect())
    }

    pub fn num_player_types(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec<f64>> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Vec<f64>> {
        self.0.iter_mut()
    }

    /// Sum of each player type's vector.
    pub fn totals(&self) -> Vec<f64> {
        self.0.iter().map(|dist| dist.iter().sum()).collect()
    }

    /// Number (or mass) of players across all types.
    pub fn total(&self) -> f64 {
        self.0.iter().flatten().sum()
    }

    pub fn as_slice(&self) -> &[Vec<f64>] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Vec<f64>> {
        self.0
    }
}

impl<T: Into<f64>> From<Vec<Vec<T>>> for PopulationState {
    fn from(dist: Vec<Vec<T>>) -> Self {
        Self(
            dist.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

impl Index<usize> for PopulationState {
    type Output = Vec<f64>;

    fn index(&self, player: usize) -> &Self::Output {
        &self.0[player]
    }
}

impl IndexMut<usize> for PopulationState {
    fn index_mut(&mut self, player: usize) -> &mut Self::Output {
        &mut self.0[player]
    }
}

/// Expected payoffs at a given state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffSnapshot {
    /// Expected payoff of each strategy, indexed `[player type][strategy]`.
    pub payoffs: Vec<Vec<f64>>,

    /// Population-weighted mean payoff of the group.
    pub avg_payoff: f64,
}

impl PayoffSnapshot {
    pub fn zeros(num_strats: &[usize]) -> Self {
        Self {
            payoffs: num_strats.iter().map(|&n_s| vec![0.0; n_s]).collect(),
            avg_payoff: 0.0,
        }
    }
}

/// Outcome of one generation, one entry per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub states: Vec<PopulationState>,
    pub payoffs: Vec<PayoffSnapshot>,
}

/// Per-group record of a run, starting with the initial state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    generations: Vec<Generation>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, generation: Generation) {
        self.generations.push(generation);
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn generations(&self) -> &[Generation] {
        &self.generations
    }

    pub fn last(&self) -> Option<&Generation> {
        self.generations.last()
    }

    /// Average every generation over groups, separately for each player type.
    pub fn group_average(&self) -> GroupAverage {
        let n_types = self
            .generations
            .first()
            .and_then(|generation| generation.states.first())
            .map_or(0, PopulationState::num_player_types);

        let mut states = vec![Vec::with_capacity(self.len()); n_types];
        let mut payoffs = vec![Vec::with_capacity(self.len()); n_types];
        let mut avg_payoffs = Vec::with_capacity(self.len());

        for generation in &self.generations {
            for i_type in 0..n_types {
                let group_states: Vec<_> = generation
                    .states
                    .iter()
                    .map(|state| state[i_type].as_slice())
                    .collect();
                states[i_type].push(elementwise_mean(&group_states));

                let group_payoffs: Vec<_> = generation
                    .payoffs
                    .iter()
                    .map(|snapshot| snapshot.payoffs[i_type].as_slice())
                    .collect();
                payoffs[i_type].push(elementwise_mean(&group_payoffs));
            }

            let n_groups = generation.payoffs.len().max(1) as f64;
            avg_payoffs.push(
                generation
                    .payoffs
                    .iter()
                    .map(|snapshot| snapshot.avg_payoff)
                    .sum::<f64>()
                    / n_groups,
            );
        }

        GroupAverage {
            states,
            payoffs,
            avg_payoffs,
        }
    }
}

/// Group-averaged trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAverage {
    /// Mean state, indexed `[player type][generation][strategy]`.
    pub states: Vec<Vec<Vec<f64>>>,

    /// Mean expected payoff, indexed `[player type][generation][strategy]`.
    pub payoffs: Vec<Vec<Vec<f64>>>,

    /// Mean of the groups' average payoffs, indexed by generation.
    pub avg_payoffs: Vec<f64>,
}

fn elementwise_mean(rows: &[&[f64]]) -> Vec<f64> {
    let len = rows.first().map_or(0, |row| row.len());
    let mut mean = vec![0.0; len];
    for row in rows {
        for (acc, &val) in mean.iter_mut().zip(row.iter()) {
            *acc += val;
        }
    }
    let n_rows = rows.len().max(1) as f64;
    mean.iter_mut().for_each(|acc| *acc /= n_rows);
    mean
}
