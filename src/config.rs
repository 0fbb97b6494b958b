use crate::apportion::round_counts;
use crate::error::DynamicsError;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`SimConfig::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    /// Population structure.
    pub population: PopulationConfig,

    /// Selection parameters.
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Stochastic (`true`) or deterministic (`false`) dynamics.
    #[serde(default = "default_stochastic")]
    pub stochastic: bool,

    /// Seed of the simulator's random stream (drawn from the OS if absent).
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulationConfig {
    /// Relative frequency of each player type, must sum to 1.
    pub player_frequencies: Vec<f64>,

    /// Total population size, 0 for an infinite population.
    #[serde(default = "default_pop_size")]
    pub pop_size: i64,

    /// Number of groups.
    #[serde(default = "default_number_groups")]
    pub number_groups: usize,

    /// Draw the initial distribution uniformly instead of multinomially.
    #[serde(default)]
    pub uni_dist: bool,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionConfig {
    /// Rate at which groups reproduce.
    #[serde(default = "default_rate")]
    pub rate: f64,

    /// Selection strength at the individual level.
    #[serde(default = "default_strength")]
    pub strength_individual: f64,

    /// Selection strength at the group level.
    #[serde(default = "default_strength")]
    pub strength_group: f64,

    /// Payoff to fitness mapping.
    #[serde(default)]
    pub fitness: FitnessKind,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            strength_individual: default_strength(),
            strength_group: default_strength(),
            fitness: FitnessKind::default(),
        }
    }
}

/// Built-in payoff to fitness mappings.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessKind {
    /// Exponential when stochastic, linear when deterministic.
    #[default]
    Auto,
    /// `e^(payoff * strength)`.
    Exponential,
    /// `payoff * strength`.
    Linear,
}

fn default_stochastic() -> bool {
    true
}

fn default_pop_size() -> i64 {
    100
}

fn default_number_groups() -> usize {
    1
}

fn default_rate() -> f64 {
    0.01
}

fn default_strength() -> f64 {
    0.8
}

impl SimConfig {
    /// Create a configuration with default parameters for the given player frequencies.
    pub fn new(player_frequencies: Vec<f64>) -> Self {
        Self {
            population: PopulationConfig {
                player_frequencies,
                pop_size: default_pop_size(),
                number_groups: default_number_groups(),
                uni_dist: false,
            },
            selection: SelectionConfig::default(),
            stochastic: default_stochastic(),
            seed: None,
        }
    }

    /// Load a [`SimConfig`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a [`SimConfig`] from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(contents).context("failed to deserialize config")?;
        config.validate().context("failed to validate config")?;
        Ok(config)
    }

    /// Check all parameters.
    ///
    /// # Errors
    /// Returns [`DynamicsError::Config`] describing the first invalid parameter.
    pub fn validate(&self) -> Result<()> {
        self.check()
            .map_err(|err| DynamicsError::Config(format!("{err:#}")).into())
    }

    /// Check that there is one frequency per player type of the game.
    pub fn validate_player_types(&self, n_types: usize) -> Result<()> {
        check_vec(&self.population.player_frequencies, n_types, true)
            .context("invalid player frequencies")
            .map_err(|err| DynamicsError::Config(format!("{err:#}")).into())
    }

    fn check(&self) -> Result<()> {
        let pop = &self.population;
        check_vec(&pop.player_frequencies, pop.player_frequencies.len(), true)
            .context("invalid player frequencies")?;
        if pop.player_frequencies.is_empty() {
            bail!("player frequencies must not be empty");
        }
        check_num(pop.pop_size, 0..).context("invalid population size")?;
        check_num(pop.number_groups, 1..).context("invalid number of groups")?;

        let sel = &self.selection;
        check_num(sel.rate, 0.0..=1.0).context("invalid group reproduction rate")?;
        check_finite(sel.strength_individual).context("invalid individual selection strength")?;
        check_finite(sel.strength_group).context("invalid group selection strength")?;

        Ok(())
    }

    /// Whether the population is treated as infinite.
    pub fn is_infinite(&self) -> bool {
        self.group_pop_size() == 0
    }

    /// Number of individuals in each group.
    ///
    /// The population is divided equally among groups only when it is larger
    /// than the number of groups.
    pub fn group_pop_size(&self) -> u64 {
        let pop_size = self.population.pop_size.max(0) as u64;
        let n_groups = self.population.number_groups.max(1) as u64;
        if pop_size > n_groups {
            pop_size / n_groups
        } else {
            pop_size
        }
    }

    /// Configured number (or mass) of players of each type within a group.
    ///
    /// # Errors
    /// Returns [`DynamicsError::Config`] if the rounded counts do not add up to
    /// the group size.
    pub fn player_totals(&self) -> Result<Vec<f64>> {
        let freqs = &self.population.player_frequencies;
        if self.is_infinite() {
            return Ok(freqs.clone());
        }

        let group_size = self.group_pop_size();
        let expected: Vec<f64> = freqs.iter().map(|freq| group_size as f64 * freq).collect();
        let totals = round_counts(&expected).context("failed to round player counts")?;

        let sum: f64 = totals.iter().sum();
        if sum != group_size as f64 {
            bail!(DynamicsError::Config(format!(
                "player counts {totals:?} sum to {sum}, but the group size is {group_size}"
            )));
        }
        Ok(totals)
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_finite(num: f64) -> Result<()> {
    if !num.is_finite() {
        bail!("number must be finite, but is {num}");
    }
    Ok(())
}

fn check_vec(vec: &[f64], exp_len: usize, prob_vec: bool) -> Result<()> {
    let len = vec.len();
    if len != exp_len {
        bail!("vector length must be {exp_len}, but is {len}");
    }
    if !prob_vec {
        return Ok(());
    }
    // For probability vectors: non-negative elements and sums to ~1.0.
    if vec.iter().any(|&ele| !(ele >= 0.0)) {
        bail!("vector must have only non-negative elements");
    }
    let sum: f64 = vec.iter().sum();
    let tol = 1e-8;
    if (sum - 1.0).abs() > tol {
        bail!("vector must sum to 1.0 (tolerance: {tol}), but sums to {sum}");
    }
    Ok(())
}
