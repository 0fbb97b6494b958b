//! Largest-remainder rounding of expected counts.

use crate::error::DynamicsError;
use anyhow::{Result, bail};
use std::{cmp::Ordering, collections::BinaryHeap};

/// Number of decimal digits kept when rounding a floating-point total.
pub const DECIMAL_PRECISION: i32 = 5;

/// Round `val` to [`DECIMAL_PRECISION`] decimal digits.
pub fn round_to_precision(val: f64) -> f64 {
    let scale = 10f64.powi(DECIMAL_PRECISION);
    (val * scale).round() / scale
}

/// Heap entry ordered so that `BinaryHeap` pops the most negative remainder
/// first, then the lowest index.
struct Remainder {
    diff: f64,
    idx: usize,
}

impl Ord for Remainder {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .diff
            .total_cmp(&self.diff)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

impl PartialOrd for Remainder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Remainder {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Remainder {}

/// Convert expected counts into integer counts with the same (rounded) total.
///
/// Every value is truncated, then the units lost to truncation are handed
/// back one at a time to the entries with the largest fractional parts.
///
/// # Errors
/// Returns [`DynamicsError::Apportionment`] if an input is negative or not
/// finite, or if the rounded total cannot be reproduced.
pub fn round_individuals(values: &[f64]) -> Result<Vec<u64>> {
    if let Some(val) = values.iter().find(|val| !val.is_finite() || **val < 0.0) {
        bail!(DynamicsError::Apportionment(format!(
            "values must be finite and non-negative, but found {val}"
        )));
    }

    let total = round_to_precision(values.iter().sum::<f64>()).round() as u64;

    let mut rounded: Vec<u64> = values.iter().map(|&val| val.floor() as u64).collect();

    let mut deficit = total as i64 - rounded.iter().sum::<u64>() as i64;
    if deficit > 0 {
        let mut heap: BinaryHeap<Remainder> = values
            .iter()
            .zip(&rounded)
            .enumerate()
            .map(|(idx, (&val, &floor))| Remainder {
                diff: floor as f64 - val,
                idx,
            })
            .collect();
        while deficit > 0 {
            let Some(rem) = heap.pop() else {
                break;
            };
            rounded[rem.idx] += 1;
            deficit -= 1;
        }
    }

    let sum: u64 = rounded.iter().sum();
    if sum != total {
        bail!(DynamicsError::Apportionment(format!(
            "rounded counts sum to {sum}, but the total is {total}"
        )));
    }

    Ok(rounded)
}

/// Same as [`round_individuals`], returning the counts as `f64`.
pub fn round_counts(values: &[f64]) -> Result<Vec<f64>> {
    Ok(round_individuals(values)?
        .into_iter()
        .map(|count| count as f64)
        .collect())
}
