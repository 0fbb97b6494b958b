//! Per-generation transition rules.

use crate::apportion::round_counts;
use crate::model::{Generation, PayoffSnapshot, PopulationState};
use crate::payoff::Evaluator;
use crate::sampling::multinomial;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::{Bernoulli, Uniform, weighted::WeightedIndex};

/// State transition from one generation to the next.
///
/// Implementations must return one state and one payoff snapshot per input
/// group and keep every player type's total unchanged. The driver validates
/// the returned states.
pub trait TransitionRule {
    /// Compute the next generation from `previous` (one state per group).
    ///
    /// With `group_selection`, groups also compete with each other at `rate`.
    fn next_generation(
        &mut self,
        eval: &Evaluator,
        previous: &[PopulationState],
        group_selection: bool,
        rate: f64,
        rng: &mut ChaCha12Rng,
    ) -> Result<Generation>;
}

/// Deterministic discrete-time replicator map.
///
/// Each strategy grows in proportion to `background + fitness`. Groups are
/// pulled towards the group-fitness-weighted mean state.
#[derive(Debug, Clone)]
pub struct Replicator {
    background: f64,
}

impl Replicator {
    pub fn new(background: f64) -> Self {
        Self { background }
    }
}

impl Default for Replicator {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl TransitionRule for Replicator {
    fn next_generation(
        &mut self,
        eval: &Evaluator,
        previous: &[PopulationState],
        group_selection: bool,
        rate: f64,
        _rng: &mut ChaCha12Rng,
    ) -> Result<Generation> {
        let mut states = Vec::with_capacity(previous.len());
        let mut payoffs = Vec::with_capacity(previous.len());

        for state in previous {
            let snapshot = eval.calculate_payoffs(state);
            let fitness = eval.calculate_fitnesses(&snapshot.payoffs, eval.strength_individual());

            let mut next = state.clone();
            for ((dist, fit), &total) in next.iter_mut().zip(&fitness).zip(eval.totals()) {
                let weights: Vec<f64> = dist
                    .iter()
                    .zip(fit)
                    .map(|(count, f)| count * (self.background + f))
                    .collect();
                if let Some(norm) = weight_sum(&weights) {
                    for (count, w) in dist.iter_mut().zip(weights) {
                        *count = total * w / norm;
                    }
                }
            }

            states.push(next);
            payoffs.push(snapshot);
        }

        if group_selection {
            blend_groups(eval, &mut states, &payoffs, rate);
        }

        if !eval.is_infinite() {
            for (i_group, state) in states.iter_mut().enumerate() {
                for dist in state.iter_mut() {
                    *dist = round_counts(dist)
                        .with_context(|| format!("failed to round state of group {i_group}"))?;
                }
            }
        }

        Ok(Generation { states, payoffs })
    }
}

/// Stochastic Wright-Fisher sampling.
///
/// Every generation is a multinomial draw weighted by `count * fitness`. A
/// group reproduces with probability `rate`, its copy replacing another group.
#[derive(Debug, Clone, Default)]
pub struct WrightFisher;

impl TransitionRule for WrightFisher {
    fn next_generation(
        &mut self,
        eval: &Evaluator,
        previous: &[PopulationState],
        group_selection: bool,
        rate: f64,
        rng: &mut ChaCha12Rng,
    ) -> Result<Generation> {
        let mut states = Vec::with_capacity(previous.len());
        let mut payoffs = Vec::with_capacity(previous.len());

        for state in previous {
            let snapshot = eval.calculate_payoffs(state);
            let fitness = eval.calculate_fitnesses(&snapshot.payoffs, eval.strength_individual());

            let mut next = state.clone();
            for ((dist, fit), &total) in next.iter_mut().zip(&fitness).zip(eval.totals()) {
                let mut weights: Vec<f64> = dist.iter().zip(fit).map(|(count, f)| count * f).collect();
                let norm = match weight_sum(&weights) {
                    Some(norm) => norm,
                    None => {
                        weights = dist.clone();
                        match weight_sum(&weights) {
                            Some(norm) => norm,
                            None => continue,
                        }
                    }
                };

                *dist = if eval.is_infinite() {
                    weights.iter().map(|w| total * w / norm).collect()
                } else {
                    multinomial(rng, total as u64, &weights)
                        .context("failed to sample offspring")?
                };
            }

            states.push(next);
            payoffs.push(snapshot);
        }

        let n_groups = states.len();
        if group_selection && n_groups > 1 && Bernoulli::new(rate)?.sample(rng) {
            let group_weights: Vec<f64> = payoffs.iter().map(|p| eval.group_fitness(p)).collect();
            let i_parent = match WeightedIndex::new(&group_weights) {
                Ok(dist) => dist.sample(rng),
                Err(_) => Uniform::new(0, n_groups)?.sample(rng),
            };
            let mut i_replaced = Uniform::new(0, n_groups - 1)?.sample(rng);
            if i_replaced >= i_parent {
                i_replaced += 1;
            }
            log::debug!("group {i_parent} replaces group {i_replaced}");
            states[i_replaced] = states[i_parent].clone();
        }

        Ok(Generation { states, payoffs })
    }
}

/// Sum of `weights` if they are usable as unnormalized probabilities.
fn weight_sum(weights: &[f64]) -> Option<f64> {
    if weights.iter().any(|&w| !(w >= 0.0) || !w.is_finite()) {
        return None;
    }
    let sum: f64 = weights.iter().sum();
    (sum > 0.0).then_some(sum)
}

fn blend_groups(
    eval: &Evaluator,
    states: &mut [PopulationState],
    payoffs: &[PayoffSnapshot],
    rate: f64,
) {
    let n_groups = states.len();
    let mut group_weights: Vec<f64> = payoffs.iter().map(|p| eval.group_fitness(p)).collect();
    let norm = match weight_sum(&group_weights) {
        Some(norm) => norm,
        None => {
            group_weights = vec![1.0; n_groups];
            n_groups as f64
        }
    };

    let mut mean = PopulationState::zeros(eval.num_strats());
    for (state, w) in states.iter().zip(&group_weights) {
        for (acc, dist) in mean.iter_mut().zip(state.iter()) {
            for (a, count) in acc.iter_mut().zip(dist) {
                *a += w * count / norm;
            }
        }
    }

    for state in states.iter_mut() {
        for (dist, target) in state.iter_mut().zip(mean.iter()) {
            for (count, t) in dist.iter_mut().zip(target) {
                *count = (1.0 - rate) * *count + rate * t;
            }
        }
    }
}
