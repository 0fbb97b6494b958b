mod common;

use common::{Coordination, counts};
use evodyn::{GroupAverage, Replicator, SimConfig, Simulator, WrightFisher};
use std::{env, fs, path::PathBuf};

fn load_config(name: &str, contents: &str) -> SimConfig {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_path = test_dir.join("config.toml");
    fs::write(&config_path, contents).expect("failed to write config file");

    let cfg = SimConfig::from_file(&config_path).expect("failed to load config");

    fs::remove_dir_all(&test_dir).ok();
    cfg
}

fn coordination_config(name: &str) -> SimConfig {
    let config_contents = String::new()
        + "stochastic = false\n"
        + "seed = 42\n"
        + "\n"
        + "[population]\n"
        + "player_frequencies = [1.0]\n"
        + "pop_size = 100\n"
        + "number_groups = 1\n";
    load_config(name, &config_contents)
}

fn assert_payoffs_in_unit_interval(average: &GroupAverage) {
    for payoffs in &average.payoffs[0] {
        assert!(payoffs.iter().all(|p| (0.0..=1.0).contains(p)), "{payoffs:?}");
    }
    assert!(average.avg_payoffs.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn coordination_from_even_split() {
    common::init_logger();

    let cfg = coordination_config("coordination_from_even_split");
    let mut sim = Simulator::new(cfg, Coordination::new(), Replicator::default())
        .expect("failed to construct simulator");

    let start = vec![counts(vec![vec![50, 50]])];
    let average = sim
        .simulate(10, Some(start), false, 0)
        .expect("failed to simulate");

    let states = &average.states[0];
    assert_eq!(states.len(), 11);
    // An even split is a fixed point of the replicator map.
    assert!(states.iter().all(|dist| dist == &vec![50.0, 50.0]));
    assert_payoffs_in_unit_interval(&average);
}

#[test]
fn coordination_moves_towards_pure_state() {
    common::init_logger();

    let cfg = coordination_config("coordination_moves_towards_pure_state");
    let mut sim = Simulator::new(cfg, Coordination::new(), Replicator::default())
        .expect("failed to construct simulator");

    let start = vec![counts(vec![vec![55, 45]])];
    let average = sim
        .simulate(10, Some(start), false, 0)
        .expect("failed to simulate");

    let states = &average.states[0];
    for pair in states.windows(2) {
        assert!(pair[1][0] >= pair[0][0], "{states:?}");
        assert_eq!(pair[1].iter().sum::<f64>(), 100.0);
    }
    assert!(states[10][0] >= 85.0, "{states:?}");
    assert_payoffs_in_unit_interval(&average);
}

#[test]
fn stochastic_fixation_seed_is_conserved() {
    common::init_logger();

    let config_contents = String::new()
        + "seed = 7\n"
        + "\n"
        + "[population]\n"
        + "player_frequencies = [1.0]\n"
        + "pop_size = 40\n"
        + "\n"
        + "[selection]\n"
        + "strength_individual = 2.0\n";
    let cfg = load_config("stochastic_fixation_seed_is_conserved", &config_contents);

    let mut sim = Simulator::new(cfg, Coordination::new(), WrightFisher)
        .expect("failed to construct simulator");

    let trajectory = sim.run(30, None, true, 1).expect("failed to run");
    assert_eq!(trajectory.generations()[0].states[0][0][1], 1.0);
    for generation in trajectory.generations() {
        assert_eq!(generation.states[0].totals(), vec![40.0]);
    }
    assert_payoffs_in_unit_interval(&trajectory.group_average());
}
