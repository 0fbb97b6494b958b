//! Random distributions over strategies.

use crate::apportion::round_counts;
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_distr::{Binomial, Exp1, Uniform};

/// Split `n` players over strategies with probabilities proportional to `weights`.
///
/// Draws one conditional binomial per strategy.
pub fn multinomial<R: Rng + ?Sized>(rng: &mut R, n: u64, weights: &[f64]) -> Result<Vec<f64>> {
    if weights.iter().any(|&w| !(w >= 0.0) || !w.is_finite()) {
        bail!("weights must be finite and non-negative, but are {weights:?}");
    }
    let mut weight_left: f64 = weights.iter().sum();
    if !(weight_left > 0.0) {
        bail!("weights must not all be zero");
    }

    let mut counts = vec![0.0; weights.len()];
    let mut n_left = n;
    let mut last_pos = 0;
    for (i_strat, &w) in weights.iter().enumerate() {
        if w > 0.0 {
            last_pos = i_strat;
        }
        if n_left == 0 || weight_left <= 0.0 {
            continue;
        }
        let prob = (w / weight_left).clamp(0.0, 1.0);
        let dist = Binomial::new(n_left, prob)?;
        let count = dist.sample(rng);
        counts[i_strat] = count as f64;
        n_left -= count;
        weight_left -= w;
    }
    // Rounding in `weight_left` may leave a few players undrawn.
    counts[last_pos] += n_left as f64;

    Ok(counts)
}

/// Proportions drawn from a flat Dirichlet distribution, scaled to `mass`.
pub fn dirichlet<R: Rng + ?Sized>(rng: &mut R, n_strats: usize, mass: f64) -> Vec<f64> {
    let draws: Vec<f64> = (0..n_strats).map(|_| -> f64 { Exp1.sample(rng) }).collect();
    scale_to(draws, mass)
}

/// Independent uniform draws, normalized and apportioned to `n` players.
pub fn uniform_counts<R: Rng + ?Sized>(rng: &mut R, n_strats: usize, n: u64) -> Result<Vec<f64>> {
    let dist = Uniform::new(0.0, 1.0)?;
    let draws: Vec<f64> = (0..n_strats).map(|_| dist.sample(rng)).collect();
    round_counts(&scale_to(draws, n as f64)).context("failed to round uniform draws")
}

fn scale_to(mut vals: Vec<f64>, total: f64) -> Vec<f64> {
    let sum: f64 = vals.iter().sum();
    if sum > 0.0 {
        vals.iter_mut().for_each(|val| *val *= total / sum);
    } else {
        let n_vals = vals.len() as f64;
        vals.iter_mut().for_each(|val| *val = total / n_vals);
    }
    vals
}
