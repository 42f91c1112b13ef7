//! Numerical building blocks shared by the checkers.
//!
//! All solvers work on a [`Choices`] table copied out of the model once per
//! check, so iteration does not go through the [`Model`] trait objects.
//! Per-state optimisation directions encode the model class:
//! `None` resolves a state by its first (only) choice, `Some(opt)` picks the
//! best choice in direction `opt`. Games give player 2 states the flipped
//! direction.

use log::debug;

use crate::bitset::BitSet;
use crate::config::{CheckerOptions, SolnMethod, TermCrit};
use crate::error::CheckError;
use crate::model::{Model, RewardStructure};
use crate::property::Opt;
use crate::result::SolverStats;
use crate::types::{ModelType, Player};

/// Transition structure: `rows[s][c]` lists the `(successor, weight)` pairs
/// of choice `c` in state `s`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Choices {
    rows: Vec<Vec<Vec<(usize, f64)>>>,
}

impl Choices {
    pub fn from_model(model: &dyn Model) -> Self {
        let rows = (0..model.num_states())
            .map(|s| {
                (0..model.num_choices(s))
                    .filter_map(|c| model.choice(s, c).map(|d| d.iter().collect()))
                    .collect()
            })
            .collect();
        Self { rows }
    }

    pub fn num_states(&self) -> usize {
        self.rows.len()
    }

    pub fn choices(&self, state: usize) -> &[Vec<(usize, f64)>] {
        &self.rows[state]
    }

    /// Total outgoing weight of a choice (its exit rate for continuous-time models).
    pub fn exit_rate(&self, state: usize, choice: usize) -> f64 {
        self.rows[state][choice].iter().map(|&(_, w)| w).sum()
    }

    pub fn max_exit_rate(&self) -> f64 {
        (0..self.rows.len())
            .flat_map(|s| (0..self.rows[s].len()).map(move |c| (s, c)))
            .map(|(s, c)| self.exit_rate(s, c))
            .fold(0.0, f64::max)
    }

    /// Embedded discrete-time structure: every choice normalised by its exit
    /// rate. A choice with no outgoing rate becomes a self-loop.
    pub fn embedded(&self) -> Self {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(s, choices)| {
                choices
                    .iter()
                    .map(|choice| {
                        let rate: f64 = choice.iter().map(|&(_, w)| w).sum();
                        if rate > 0.0 {
                            choice.iter().map(|&(t, w)| (t, w / rate)).collect()
                        } else {
                            vec![(s, 1.0)]
                        }
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    /// Uniformised discrete-time structure for uniformisation rate `q`.
    pub fn uniformised(&self, q: f64) -> Self {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(s, choices)| {
                choices
                    .iter()
                    .map(|choice| {
                        let rate: f64 = choice.iter().map(|&(_, w)| w).sum();
                        let mut stay = 1.0 - rate / q;
                        let mut row: Vec<(usize, f64)> = Vec::with_capacity(choice.len() + 1);
                        for &(t, w) in choice {
                            if t == s {
                                stay += w / q;
                            } else {
                                row.push((t, w / q));
                            }
                        }
                        if stay > 0.0 {
                            row.push((s, stay));
                        }
                        row
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }
}

/// Weighted sum of `x` over a choice's successors.
pub fn dot(choice: &[(usize, f64)], x: &[f64]) -> f64 {
    choice.iter().map(|&(t, w)| w * x[t]).sum()
}

/// Indicator vector of `set`.
pub fn indicator(set: &BitSet, n: usize) -> Vec<f64> {
    let mut x = vec![0.0; n];
    for s in set.iter() {
        x[s] = 1.0;
    }
    x
}

/// Per-state optimisation directions for `opt` on `model`.
pub fn directions(model: &dyn Model, opt: Option<Opt>) -> Vec<Option<Opt>> {
    let n = model.num_states();
    match (model.model_type(), opt) {
        (_, None) => vec![None; n],
        (ModelType::Stpg, Some(opt)) => (0..n)
            .map(|s| match model.player(s) {
                Player::One => Some(opt),
                Player::Two => Some(opt.flip()),
            })
            .collect(),
        (_, Some(opt)) => vec![Some(opt); n],
    }
}

/// Reward earned by taking choice `c` in state `s`, per step or per jump.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepRewards {
    rows: Vec<Vec<f64>>,
}

impl StepRewards {
    /// State reward plus choice reward for every step.
    pub fn per_step(rewards: &RewardStructure, choices: &Choices) -> Self {
        let rows = (0..choices.num_states())
            .map(|s| {
                (0..choices.choices(s).len())
                    .map(|c| rewards.state_reward(s) + rewards.choice_reward(s, c))
                    .collect()
            })
            .collect();
        Self { rows }
    }

    /// Rewards per jump of a continuous-time model: state rewards are rates,
    /// earned for the mean sojourn time `1 / E(s, c)`.
    pub fn per_jump(rewards: &RewardStructure, rates: &Choices) -> Self {
        let rows = (0..rates.num_states())
            .map(|s| {
                (0..rates.choices(s).len())
                    .map(|c| {
                        let rate = rates.exit_rate(s, c);
                        let sojourn = if rate > 0.0 { rewards.state_reward(s) / rate } else { 0.0 };
                        sojourn + rewards.choice_reward(s, c)
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    pub fn get(&self, state: usize, choice: usize) -> f64 {
        self.rows[state][choice]
    }
}

/// Largest difference between two iterates under `crit`.
///
/// States that are infinite in both iterates are ignored.
pub fn delta(crit: TermCrit, old: &[f64], new: &[f64]) -> f64 {
    old.iter()
        .zip(new)
        .map(|(&a, &b)| state_delta(crit, a, b))
        .fold(0.0, f64::max)
}

fn state_delta(crit: TermCrit, old: f64, new: f64) -> f64 {
    if old == new {
        return 0.0;
    }
    let diff = (new - old).abs();
    match crit {
        TermCrit::Absolute => diff,
        TermCrit::Relative if new != 0.0 => diff / new.abs(),
        TermCrit::Relative => diff,
    }
}

/// Poisson probabilities `e^{-λ} λ^i / i!`, computed in log-space, up to the
/// first `i` at which their sum reaches `1 - epsilon`.
pub fn poisson_weights(lambda: f64, epsilon: f64) -> Vec<f64> {
    if lambda <= 0.0 {
        return vec![1.0];
    }
    let ln_lambda = lambda.ln();
    let limit = (lambda + 10.0 * lambda.sqrt() + 100.0).ceil() as usize;
    let mut weights = Vec::new();
    let mut ln_fact = 0.0;
    let mut total = 0.0;
    for i in 0..=limit {
        if i > 0 {
            ln_fact += (i as f64).ln();
        }
        let w = (-lambda + i as f64 * ln_lambda - ln_fact).exp();
        weights.push(w);
        total += w;
        if total >= 1.0 - epsilon {
            break;
        }
    }
    debug!("Poisson weights for {}: {} terms, total {}", lambda, weights.len(), total);
    weights
}

/// One solver run: a transition structure, directions, optional rewards and
/// the numerical options.
pub struct Iteration<'a> {
    pub choices: &'a Choices,
    pub dirs: &'a [Option<Opt>],
    pub rewards: Option<&'a StepRewards>,
    pub options: &'a CheckerOptions,
}

impl Iteration<'_> {
    fn choice_value(&self, s: usize, c: usize, x: &[f64]) -> f64 {
        let reward = self.rewards.map_or(0.0, |r| r.get(s, c));
        reward + dot(&self.choices.choices(s)[c], x)
    }

    /// Best value over the choices of `s`, with the choice achieving it.
    ///
    /// Returns `None` for states without choices.
    pub fn best(&self, s: usize, x: &[f64]) -> Option<(f64, usize)> {
        let n = self.choices.choices(s).len();
        if n == 0 {
            return None;
        }
        let first = self.choice_value(s, 0, x);
        let Some(opt) = self.dirs[s] else {
            return Some((first, 0));
        };
        let mut best = (first, 0);
        for c in 1..n {
            let v = self.choice_value(s, c, x);
            if opt.better(v, best.0) {
                best = (v, c);
            }
        }
        Some(best)
    }

    /// Solves the fixed point on `unknown`, starting from `x`. States outside
    /// `unknown` keep their values.
    ///
    /// `policy` seeds (modified) policy iteration. Value iteration and
    /// Gauss-Seidel start from the value of `policy` instead, which must
    /// reach the target almost surely from every state in `unknown`.
    pub fn solve(
        &self,
        unknown: &BitSet,
        x: Vec<f64>,
        policy: Option<Vec<usize>>,
    ) -> Result<(Vec<f64>, SolverStats), CheckError> {
        match self.options.soln_method {
            SolnMethod::ValueIteration => {
                let x = self.seeded(unknown, x, policy.as_deref(), SolnMethod::ValueIteration)?;
                self.value_iteration(unknown, x)
            }
            SolnMethod::GaussSeidel => {
                let x = self.seeded(unknown, x, policy.as_deref(), SolnMethod::GaussSeidel)?;
                self.gauss_seidel(unknown, x)
            }
            SolnMethod::PolicyIteration => self.policy_iteration(unknown, x, policy, None),
            SolnMethod::ModifiedPolicyIteration => {
                self.policy_iteration(unknown, x, policy, Some(self.options.mpi_sweeps))
            }
        }
    }

    /// Replaces `x` on `unknown` by the value of `policy`, if given.
    ///
    /// For a minimising reward objective this is an upper bound, so the
    /// iteration cannot settle on zero-reward cycles that never reach the
    /// target.
    fn seeded(
        &self,
        unknown: &BitSet,
        mut x: Vec<f64>,
        policy: Option<&[usize]>,
        method: SolnMethod,
    ) -> Result<Vec<f64>, CheckError> {
        if let Some(policy) = policy {
            let sweeps = self.evaluate(unknown, policy, &mut x, None, method)?;
            debug!("{}: initial policy evaluated in {} sweeps", method, sweeps);
        }
        Ok(x)
    }

    fn stats(&self, method: SolnMethod, iterations: usize, last_delta: f64) -> SolverStats {
        SolverStats {
            method: method.to_string(),
            iterations,
            last_delta,
            ..Default::default()
        }
    }

    fn non_convergence(&self, method: SolnMethod, iterations: usize, last_delta: f64) -> CheckError {
        CheckError::NonConvergence {
            method: method.to_string(),
            iterations,
            last_delta,
        }
    }

    pub fn value_iteration(&self, unknown: &BitSet, mut x: Vec<f64>) -> Result<(Vec<f64>, SolverStats), CheckError> {
        let method = SolnMethod::ValueIteration;
        let eps = self.options.term_crit_param;
        let mut next = x.clone();
        let mut last_delta = f64::INFINITY;
        for iter in 1..=self.options.max_iters {
            for s in unknown.iter() {
                if let Some((v, _)) = self.best(s, &x) {
                    next[s] = v;
                }
            }
            last_delta = delta(self.options.term_crit, &x, &next);
            std::mem::swap(&mut x, &mut next);
            if last_delta < eps {
                debug!("{} converged after {} iterations", method, iter);
                return Ok((x, self.stats(method, iter, last_delta)));
            }
        }
        Err(self.non_convergence(method, self.options.max_iters, last_delta))
    }

    pub fn gauss_seidel(&self, unknown: &BitSet, mut x: Vec<f64>) -> Result<(Vec<f64>, SolverStats), CheckError> {
        let method = SolnMethod::GaussSeidel;
        let eps = self.options.term_crit_param;
        let mut last_delta = f64::INFINITY;
        for iter in 1..=self.options.max_iters {
            last_delta = 0.0;
            for s in unknown.iter() {
                if let Some((v, _)) = self.best(s, &x) {
                    last_delta = last_delta.max(state_delta(self.options.term_crit, x[s], v));
                    x[s] = v;
                }
            }
            if last_delta < eps {
                debug!("{} converged after {} iterations", method, iter);
                return Ok((x, self.stats(method, iter, last_delta)));
            }
        }
        Err(self.non_convergence(method, self.options.max_iters, last_delta))
    }

    /// Evaluates a fixed policy in place. With `sweeps`, stops after that many
    /// sweeps instead of on convergence. Returns the number of sweeps.
    fn evaluate(
        &self,
        unknown: &BitSet,
        policy: &[usize],
        x: &mut [f64],
        sweeps: Option<usize>,
        method: SolnMethod,
    ) -> Result<usize, CheckError> {
        let eps = self.options.term_crit_param;
        let limit = sweeps.unwrap_or(self.options.max_iters);
        let mut last_delta = f64::INFINITY;
        for sweep in 1..=limit {
            last_delta = 0.0;
            for s in unknown.iter() {
                if self.choices.choices(s).is_empty() {
                    continue;
                }
                let v = self.choice_value(s, policy[s], x);
                last_delta = last_delta.max(state_delta(self.options.term_crit, x[s], v));
                x[s] = v;
            }
            if last_delta < eps {
                return Ok(sweep);
            }
        }
        match sweeps {
            Some(_) => Ok(limit),
            None => Err(self.non_convergence(method, limit, last_delta)),
        }
    }

    fn policy_iteration(
        &self,
        unknown: &BitSet,
        mut x: Vec<f64>,
        policy: Option<Vec<usize>>,
        sweeps: Option<usize>,
    ) -> Result<(Vec<f64>, SolverStats), CheckError> {
        let method = match sweeps {
            Some(_) => SolnMethod::ModifiedPolicyIteration,
            None => SolnMethod::PolicyIteration,
        };
        let n = self.choices.num_states();
        let mut policy = match policy {
            Some(policy) => policy,
            None => (0..n).map(|s| self.best(s, &x).map_or(0, |(_, c)| c)).collect(),
        };

        let mut iterations = 0;
        let mut last_delta = f64::INFINITY;
        for round in 1..=self.options.max_iters {
            iterations += self.evaluate(unknown, &policy, &mut x, sweeps, method)?;

            let mut changed = false;
            last_delta = 0.0;
            for s in unknown.iter() {
                let (Some((v, c)), Some(opt)) = (self.best(s, &x), self.dirs[s]) else {
                    continue;
                };
                let current = self.choice_value(s, policy[s], &x);
                last_delta = last_delta.max(state_delta(self.options.term_crit, x[s], v));
                if c != policy[s] && opt.better(v, current) {
                    policy[s] = c;
                    changed = true;
                }
            }
            debug!("{} round {}: policy changed = {}", method, round, changed);

            let done = match sweeps {
                None => !changed,
                Some(_) => !changed && last_delta < self.options.term_crit_param,
            };
            if done {
                return Ok((x, self.stats(method, iterations, last_delta)));
            }
        }
        Err(self.non_convergence(method, iterations, last_delta))
    }

    /// Runs exactly `k` steps on `unknown`, without a convergence test.
    ///
    /// With `record`, also returns `actions[s][m - 1]`, the choice taken in
    /// `s` by the step computing the value with `m` steps remaining.
    pub fn bounded(
        &self,
        unknown: &BitSet,
        mut x: Vec<f64>,
        k: usize,
        record: bool,
    ) -> (Vec<f64>, Option<Vec<Vec<usize>>>) {
        let n = self.choices.num_states();
        let mut actions = record.then(|| vec![vec![0; k]; n]);
        let mut next = x.clone();
        for m in 1..=k {
            for s in unknown.iter() {
                if let Some((v, c)) = self.best(s, &x) {
                    next[s] = v;
                    if let Some(actions) = actions.as_mut() {
                        actions[s][m - 1] = c;
                    }
                }
            }
            std::mem::swap(&mut x, &mut next);
        }
        debug!("Bounded iteration finished after {} steps", k);
        (x, actions)
    }

    /// Time-bounded reachability by backward uniformisation.
    ///
    /// `self.choices` must be uniformised; `weights` are the Poisson
    /// probabilities of the jump counts. Values are optimised step by step,
    /// which is exact for chains and for uniform decision processes.
    pub fn transient(&self, unknown: &BitSet, target: &BitSet, weights: &[f64]) -> Vec<f64> {
        let n = self.choices.num_states();
        let mut tails = vec![0.0; weights.len() + 1];
        for i in (0..weights.len()).rev() {
            tails[i] = tails[i + 1] + weights[i];
        }

        let last = weights.len() - 1;
        let mut x = vec![0.0; n];
        for s in target.iter() {
            x[s] = tails[last];
        }
        let mut next = x.clone();
        for k in (0..last).rev() {
            for s in target.iter() {
                next[s] = tails[k];
            }
            for s in unknown.iter() {
                if let Some((v, _)) = self.best(s, &x) {
                    next[s] = v;
                }
            }
            std::mem::swap(&mut x, &mut next);
        }
        x
    }
}
