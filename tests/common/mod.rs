#![allow(dead_code)]

use anyhow::{Result, bail};
use evodyn::{Evaluator, Generation, PayoffMatrix, PayoffSnapshot, PopulationState, TransitionRule};
use rand_chacha::ChaCha12Rng;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One player type, two strategies; matching pays 1, mismatching 0.
pub struct Coordination {
    num_strats: Vec<usize>,
}

impl Coordination {
    pub fn new() -> Self {
        Self {
            num_strats: vec![2],
        }
    }
}

impl PayoffMatrix for Coordination {
    fn num_player_types(&self) -> usize {
        1
    }

    fn num_strats(&self) -> &[usize] {
        &self.num_strats
    }

    fn expected_payoff(&self, player: usize, strat: usize, state: &PopulationState) -> f64 {
        let dist = &state[player];
        let total: f64 = dist.iter().sum();
        if total > 0.0 { dist[strat] / total } else { 0.0 }
    }
}

/// Same payoff for every strategy of every type.
pub struct Constant {
    pub num_strats: Vec<usize>,
    pub value: f64,
}

impl PayoffMatrix for Constant {
    fn num_player_types(&self) -> usize {
        self.num_strats.len()
    }

    fn num_strats(&self) -> &[usize] {
        &self.num_strats
    }

    fn expected_payoff(&self, _player: usize, _strat: usize, _state: &PopulationState) -> f64 {
        self.value
    }
}

/// Each type gets paid by the share of the other type playing the same
/// strategy index; strategies beyond the other type's range pay nothing.
pub struct CrossMatch {
    pub num_strats: Vec<usize>,
}

impl PayoffMatrix for CrossMatch {
    fn num_player_types(&self) -> usize {
        self.num_strats.len()
    }

    fn num_strats(&self) -> &[usize] {
        &self.num_strats
    }

    fn expected_payoff(&self, player: usize, strat: usize, state: &PopulationState) -> f64 {
        let other = &state[(player + 1) % state.num_player_types()];
        let total: f64 = other.iter().sum();
        match other.get(strat) {
            Some(count) if total > 0.0 => count / total,
            _ => 0.0,
        }
    }
}

/// Returns the same generation every time.
pub struct FixedRule {
    pub generation: Generation,
}

impl TransitionRule for FixedRule {
    fn next_generation(
        &mut self,
        _eval: &Evaluator,
        _previous: &[PopulationState],
        _group_selection: bool,
        _rate: f64,
        _rng: &mut ChaCha12Rng,
    ) -> Result<Generation> {
        Ok(self.generation.clone())
    }
}

/// Keeps every state, reporting its payoffs.
pub struct Frozen;

impl TransitionRule for Frozen {
    fn next_generation(
        &mut self,
        eval: &Evaluator,
        previous: &[PopulationState],
        _group_selection: bool,
        _rate: f64,
        _rng: &mut ChaCha12Rng,
    ) -> Result<Generation> {
        Ok(Generation {
            states: previous.to_vec(),
            payoffs: previous.iter().map(|s| eval.calculate_payoffs(s)).collect(),
        })
    }
}

/// Loses one player of type 0 in every group.
pub struct Leaky;

impl TransitionRule for Leaky {
    fn next_generation(
        &mut self,
        eval: &Evaluator,
        previous: &[PopulationState],
        _group_selection: bool,
        _rate: f64,
        _rng: &mut ChaCha12Rng,
    ) -> Result<Generation> {
        let mut states = previous.to_vec();
        for state in &mut states {
            let dist = &mut state[0];
            let Some(count) = dist.iter_mut().find(|count| **count >= 1.0) else {
                bail!("nothing to lose");
            };
            *count -= 1.0;
        }
        let payoffs = vec![PayoffSnapshot::zeros(eval.num_strats()); states.len()];
        Ok(Generation { states, payoffs })
    }
}

/// Drops the last group.
pub struct Shrinking;

impl TransitionRule for Shrinking {
    fn next_generation(
        &mut self,
        eval: &Evaluator,
        previous: &[PopulationState],
        _group_selection: bool,
        _rate: f64,
        _rng: &mut ChaCha12Rng,
    ) -> Result<Generation> {
        let states = previous[..previous.len() - 1].to_vec();
        let payoffs = vec![PayoffSnapshot::zeros(eval.num_strats()); states.len()];
        Ok(Generation { states, payoffs })
    }
}

/// Build a state from integer counts.
pub fn counts(dist: Vec<Vec<u32>>) -> PopulationState {
    PopulationState::from(dist)
}
