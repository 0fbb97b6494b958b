//! Simulation driver.

use crate::config::SimConfig;
use crate::error::DynamicsError;
use crate::model::{Generation, GroupAverage, PayoffSnapshot, PopulationState, Trajectory};
use crate::payoff::{Evaluator, FitnessTransform, PayoffMatrix};
use crate::rules::TransitionRule;
use crate::sampling;
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;

/// Simulation driver.
///
/// Holds the configuration, evaluator, transition rule and random number
/// generator, and provides methods to build the initial state and run
/// generations.
pub struct Simulator {
    cfg: SimConfig,
    eval: Evaluator,
    rule: Box<dyn TransitionRule>,
    rng: ChaCha12Rng,
}

impl Simulator {
    /// Create a new `Simulator` for the game `pm` driven by `rule`.
    ///
    /// The random stream is seeded from `cfg.seed`, or from the OS if unset.
    ///
    /// # Errors
    /// Returns [`DynamicsError::Config`] if the configuration is invalid or
    /// does not fit the game.
    pub fn new<P, R>(cfg: SimConfig, pm: P, rule: R) -> Result<Self>
    where
        P: PayoffMatrix + 'static,
        R: TransitionRule + 'static,
    {
        let eval = Evaluator::new(&cfg, Box::new(pm)).context("failed to construct evaluator")?;
        log::info!("{cfg:#?}");
        log::debug!("{eval:#?}");

        let rng = match cfg.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        Ok(Self {
            cfg,
            eval,
            rule: Box::new(rule),
            rng,
        })
    }

    /// Use a custom payoff to fitness mapping.
    pub fn with_fitness_transform(mut self, fitness: FitnessTransform) -> Result<Self> {
        self.eval = self
            .eval
            .with_fitness_transform(fitness)
            .context("failed to set fitness transform")?;
        Ok(self)
    }

    pub fn cfg(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.eval
    }

    pub fn number_groups(&self) -> usize {
        self.cfg.population.number_groups
    }

    pub fn group_selection(&self) -> bool {
        self.number_groups() > 1
    }

    /// Run `num_gens` generations and average the result over groups.
    ///
    /// See [`Simulator::run`].
    pub fn simulate(
        &mut self,
        num_gens: usize,
        start_state: Option<Vec<PopulationState>>,
        fixation_probability: bool,
        strategy_indx: usize,
    ) -> Result<GroupAverage> {
        let trajectory = self.run(num_gens, start_state, fixation_probability, strategy_indx)?;
        Ok(trajectory.group_average())
    }

    /// Run `num_gens` generations and return the per-group trajectory.
    ///
    /// Starts from `start_state` (one state per group) if given, or from a
    /// random state otherwise. With `fixation_probability`, the random state
    /// holds a single player of type 0 using `strategy_indx`.
    ///
    /// # Errors
    /// Fails before any generation runs if the start state or the fixation
    /// request is invalid, and aborts if a generation produces an invalid state.
    pub fn run(
        &mut self,
        num_gens: usize,
        start_state: Option<Vec<PopulationState>>,
        fixation_probability: bool,
        strategy_indx: usize,
    ) -> Result<Trajectory> {
        let fixation = fixation_probability.then_some(strategy_indx);
        let mut states = self
            .initial_state(start_state, fixation)
            .context("failed to set up initial state")?;

        let n_groups = states.len();
        let mut trajectory = Trajectory::new();
        trajectory.push(Generation {
            states: states.clone(),
            payoffs: vec![PayoffSnapshot::zeros(self.eval.num_strats()); n_groups],
        });

        log::info!("simulating {num_gens} generations of {n_groups} groups");
        let log_every = (num_gens / 10).max(1);

        for i_gen in 1..=num_gens {
            let generation = self
                .step(&states)
                .with_context(|| format!("failed to perform generation {i_gen}"))?;
            log::debug!("generation {i_gen}: {:?}", generation.states);

            states.clone_from(&generation.states);
            trajectory.push(generation);

            if i_gen % log_every == 0 {
                let progress = 100.0 * i_gen as f64 / num_gens as f64;
                log::info!("completed {progress:06.2}%");
            }
        }

        log::info!("finished simulating {num_gens} generations");
        Ok(trajectory)
    }

    /// Perform one generation transition starting from `states`.
    ///
    /// Both `states` and the returned generation are validated.
    pub fn step(&mut self, states: &[PopulationState]) -> Result<Generation> {
        let n_groups = self.number_groups();
        check_group_count(n_groups, states.len())?;
        let spec = self.eval.state_spec();
        for (i_group, state) in states.iter().enumerate() {
            spec.validate(state.clone())
                .with_context(|| format!("invalid input state of group {i_group}"))?;
        }

        let group_selection = self.group_selection();
        let rate = self.cfg.selection.rate;
        let generation = self
            .rule
            .next_generation(&self.eval, states, group_selection, rate, &mut self.rng)
            .context("failed to compute next generation")?;

        check_group_count(n_groups, generation.states.len())
            .context("transition rule returned the wrong number of states")?;
        check_group_count(n_groups, generation.payoffs.len())
            .context("transition rule returned the wrong number of payoffs")?;

        let spec = self.eval.state_spec();
        for (i_group, snapshot) in generation.payoffs.iter().enumerate() {
            spec.validate_payoffs(snapshot)
                .with_context(|| format!("invalid payoffs of group {i_group}"))?;
        }
        let states = generation
            .states
            .into_iter()
            .enumerate()
            .map(|(i_group, state)| {
                spec.validate(state)
                    .with_context(|| format!("invalid state of group {i_group}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Generation {
            states,
            payoffs: generation.payoffs,
        })
    }

    /// Build the state of every group at generation 0.
    ///
    /// A supplied `start_state` is validated and adopted as is. Otherwise a
    /// random state is drawn and, if `fixation` names a strategy, seeded with
    /// a single player of type 0 using it.
    pub fn initial_state(
        &mut self,
        start_state: Option<Vec<PopulationState>>,
        fixation: Option<usize>,
    ) -> Result<Vec<PopulationState>> {
        if let Some(strategy_indx) = fixation {
            self.check_fixation(strategy_indx)?;
        }

        match start_state {
            Some(start_state) => {
                let spec = self.eval.state_spec();
                check_group_count(self.number_groups(), start_state.len())
                    .context("invalid start state")?;
                if fixation.is_some() {
                    log::warn!("ignoring fixation probability request for a supplied start state");
                }
                start_state
                    .into_iter()
                    .enumerate()
                    .map(|(i_group, state)| {
                        spec.validate(state)
                            .with_context(|| format!("invalid start state of group {i_group}"))
                    })
                    .collect()
            }
            None => {
                let mut states = self.random_state()?;
                if let Some(strategy_indx) = fixation {
                    self.seed_fixation(&mut states[0], strategy_indx)?;
                }
                let spec = self.eval.state_spec();
                states
                    .into_iter()
                    .map(|state| spec.validate(state))
                    .collect::<Result<Vec<_>>>()
                    .context("random initial state is invalid")
            }
        }
    }

    /// Draw a random state for every group.
    ///
    /// Infinite populations use flat Dirichlet proportions; finite ones use
    /// normalized uniform draws if `uni_dist` is set, multinomial draws with
    /// equal probabilities otherwise.
    pub fn random_state(&mut self) -> Result<Vec<PopulationState>> {
        let n_groups = self.number_groups();
        let infinite = self.eval.is_infinite();
        let uni_dist = self.cfg.population.uni_dist;

        let mut states = Vec::with_capacity(n_groups);
        for _ in 0..n_groups {
            let mut dist = Vec::with_capacity(self.eval.num_player_types());
            for (&total, &n_s) in self.eval.totals().iter().zip(self.eval.num_strats()) {
                let player_dist = if infinite {
                    sampling::dirichlet(&mut self.rng, n_s, total)
                } else if uni_dist {
                    sampling::uniform_counts(&mut self.rng, n_s, total as u64)?
                } else {
                    sampling::multinomial(&mut self.rng, total as u64, &vec![1.0 / n_s as f64; n_s])?
                };
                dist.push(player_dist);
            }
            states.push(PopulationState::new(dist));
        }

        Ok(states)
    }

    fn check_fixation(&self, strategy_indx: usize) -> Result<()> {
        let n_groups = self.number_groups();
        if n_groups != 1 {
            bail!(DynamicsError::Precondition(format!(
                "fixation probability can only be computed for one group, but there are {n_groups}"
            )));
        }
        if self.eval.is_infinite() {
            bail!(DynamicsError::Precondition(
                "fixation probability requires a finite population".to_string()
            ));
        }
        let n_strats = self.eval.num_strats()[0];
        if n_strats < 2 {
            bail!(DynamicsError::Precondition(format!(
                "fixation probability requires at least 2 strategies, but player type 0 has {n_strats}"
            )));
        }
        if strategy_indx >= n_strats {
            bail!(DynamicsError::Precondition(format!(
                "strategy index must be less than {n_strats}, but is {strategy_indx}"
            )));
        }
        if self.eval.totals()[0] < 1.0 {
            bail!(DynamicsError::Precondition(
                "player type 0 has no individuals".to_string()
            ));
        }
        Ok(())
    }

    /// Leave a single player of type 0 using `strategy_indx`.
    ///
    /// The displaced players are spread evenly over the other strategies, the
    /// last one taking the remainder, so the type's total is unchanged. If
    /// the strategy was absent, its player comes from the last other strategy,
    /// or from the largest one when the last is empty.
    pub fn seed_fixation(&self, state: &mut PopulationState, strategy_indx: usize) -> Result<()> {
        self.check_fixation(strategy_indx)?;
        self.eval
            .state_spec()
            .validate(state.clone())
            .context("cannot seed an invalid state")?;

        let dist = &mut state[0];
        let old_count = dist[strategy_indx] as i64;
        dist[strategy_indx] = 1.0;

        let others: Vec<usize> = (0..dist.len()).filter(|&i| i != strategy_indx).collect();
        let displaced = old_count - 1;
        if displaced >= 0 {
            let n_div = others.len() as i64;
            let share = displaced / n_div;
            for (pos, &i_strat) in others.iter().enumerate() {
                let extra = if pos + 1 == others.len() {
                    displaced - share * (n_div - 1)
                } else {
                    share
                };
                dist[i_strat] += extra as f64;
            }
        } else {
            let &i_last = others
                .last()
                .context("no other strategy to take a player from")?;
            let i_donor = if dist[i_last] >= 1.0 {
                i_last
            } else {
                others
                    .iter()
                    .copied()
                    .max_by(|&a, &b| dist[a].total_cmp(&dist[b]))
                    .unwrap_or(i_last)
            };
            if dist[i_donor] < 1.0 {
                bail!(DynamicsError::Precondition(
                    "player type 0 has no individuals".to_string()
                ));
            }
            dist[i_donor] -= 1.0;
        }

        Ok(())
    }
}

fn check_group_count(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        bail!(DynamicsError::GroupCount { expected, found });
    }
    Ok(())
}
