use evodyn::DynamicsError;
use evodyn::apportion::{round_counts, round_individuals, round_to_precision};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;

#[test]
fn largest_remainder_gets_the_extra_unit() {
    assert_eq!(round_individuals(&[1.6, 1.3, 1.1]).unwrap(), vec![2, 1, 1]);
    assert_eq!(
        round_individuals(&[33.333333, 33.333333, 33.333334]).unwrap(),
        vec![33, 33, 34]
    );
    assert_eq!(round_individuals(&[0.2, 0.9, 0.9]).unwrap(), vec![0, 1, 1]);
}

#[test]
fn ties_go_to_the_lower_index() {
    assert_eq!(round_individuals(&[2.4, 2.4, 2.2]).unwrap(), vec![3, 2, 2]);
    assert_eq!(round_individuals(&[0.5, 0.5]).unwrap(), vec![1, 0]);
}

#[test]
fn integral_values_are_unchanged() {
    assert_eq!(round_individuals(&[3.0, 0.0, 7.0]).unwrap(), vec![3, 0, 7]);
    assert_eq!(round_individuals(&[]).unwrap(), Vec::<u64>::new());
}

#[test]
fn summation_error_is_absorbed() {
    // Sums to 0.9999999999999999 in floating point.
    let vals = vec![0.1; 10];
    let rounded = round_individuals(&vals).unwrap();
    assert_eq!(rounded.iter().sum::<u64>(), 1);
    assert_eq!(rounded[0], 1);
}

#[test]
fn sum_matches_rounded_total() {
    let mut rng = ChaCha12Rng::seed_from_u64(7);
    for _ in 0..500 {
        let len = rng.random_range(1..12);
        let vals: Vec<f64> = (0..len).map(|_| rng.random_range(0.0..50.0)).collect();
        let total = round_to_precision(vals.iter().sum::<f64>()).round() as u64;

        let rounded = round_individuals(&vals).unwrap();
        assert_eq!(rounded.iter().sum::<u64>(), total, "input {vals:?}");
        for (&count, &val) in rounded.iter().zip(&vals) {
            assert!(count == val.floor() as u64 || count == val.floor() as u64 + 1);
        }
    }
}

#[test]
fn counts_are_returned_as_floats() {
    assert_eq!(round_counts(&[49.5, 50.5]).unwrap(), vec![50.0, 50.0]);
}

#[test]
fn invalid_values_are_rejected() {
    for vals in [vec![1.0, -0.5], vec![f64::NAN], vec![f64::INFINITY, 1.0]] {
        let err = round_individuals(&vals).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DynamicsError>(),
            Some(DynamicsError::Apportionment(_))
        ));
    }
}
