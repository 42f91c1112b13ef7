//! Discrete-time solution procedures.
//!
//! [`DiscreteSolver`] implements next-state, (bounded) until, reachability
//! reward and cumulative reward computations over a [`Choices`] table. The
//! DTMC, MDP and game checkers run it on the model itself; the
//! continuous-time checkers run it on the embedded structure.

use log::debug;

use crate::bitset::BitSet;
use crate::checker::numeric::{indicator, Choices, Iteration, StepRewards};
use crate::checker::precomp::{prob0, prob1};
use crate::checker::Computed;
use crate::config::CheckerOptions;
use crate::error::CheckError;
use crate::property::Opt;
use crate::result::SolverStats;

pub struct DiscreteSolver<'a> {
    pub choices: &'a Choices,
    pub dirs: &'a [Option<Opt>],
    pub options: &'a CheckerOptions,
}

impl<'a> DiscreteSolver<'a> {
    fn iteration(&self, rewards: Option<&'a StepRewards>) -> Iteration<'a> {
        Iteration {
            choices: self.choices,
            dirs: self.dirs,
            rewards,
            options: self.options,
        }
    }

    fn num_states(&self) -> usize {
        self.choices.num_states()
    }

    /// Probability of moving into `target` in one step.
    pub fn next(&self, target: &BitSet) -> Computed {
        let n = self.num_states();
        let x = indicator(target, n);
        let it = self.iteration(None);
        let values = (0..n).map(|s| it.best(s, &x).map_or(0.0, |(v, _)| v)).collect();
        Computed::new(values, SolverStats::default())
    }

    /// Probability of `left U<=k right`.
    ///
    /// With `record`, also returns the choices taken, as
    /// `actions[s][m - 1]` for `m` steps remaining.
    pub fn bounded_until(
        &self,
        left: &BitSet,
        right: &BitSet,
        k: usize,
        record: bool,
    ) -> (Computed, Option<Vec<Vec<usize>>>) {
        let n = self.num_states();
        let mut unknown = left.clone();
        unknown.difference_with(right);

        let (values, actions) = self.iteration(None).bounded(&unknown, indicator(right, n), k, record);
        let stats = SolverStats {
            method: "Bounded iteration".to_string(),
            iterations: k,
            ..Default::default()
        };
        (Computed::new(values, stats), actions)
    }

    /// Probability of `left U right`.
    pub fn until(&self, left: &BitSet, right: &BitSet) -> Result<Computed, CheckError> {
        let n = self.num_states();
        let (no, yes) = if self.options.precomputation {
            let no = prob0(self.choices, self.dirs, left, right);
            let (yes, _) = prob1(self.choices, self.dirs, left, right);
            (no, yes)
        } else {
            let mut maybe = left.clone();
            maybe.union_with(right);
            (maybe.complement(n), right.clone())
        };
        debug!("until: {} no, {} yes, {} states", no.len(), yes.len(), n);

        let mut unknown = no.clone();
        unknown.union_with(&yes);
        let unknown = unknown.complement(n);

        let (values, mut stats) = if unknown.is_empty() {
            (indicator(&yes, n), SolverStats::default())
        } else {
            self.iteration(None).solve(&unknown, indicator(&yes, n), None)?
        };
        stats.num_no = no.len();
        stats.num_yes = yes.len();
        Ok(Computed::new(values, stats))
    }

    /// Expected reward accumulated until `target` is reached.
    ///
    /// States that fail to reach `target` almost surely under the optimal
    /// resolution get an infinite value, determined graphically.
    pub fn reach_reward(&self, rewards: &StepRewards, target: &BitSet) -> Result<Computed, CheckError> {
        let n = self.num_states();

        // Finiteness depends on reaching the target, which the opposite
        // direction of the reward objective pursues.
        let reach_dirs: Vec<_> = self.dirs.iter().map(|d| d.map(Opt::flip)).collect();
        let (finite, witness) = prob1(self.choices, &reach_dirs, &BitSet::full(n), target);
        let inf = finite.complement(n);
        debug!("reach_reward: {} infinite, {} target, {} states", inf.len(), target.len(), n);

        let mut unknown = finite;
        unknown.difference_with(target);

        let mut x = vec![0.0; n];
        for s in inf.iter() {
            x[s] = f64::INFINITY;
        }

        let it = Iteration {
            choices: self.choices,
            dirs: self.dirs,
            rewards: Some(rewards),
            options: self.options,
        };
        let (values, mut stats) = if unknown.is_empty() {
            (x, SolverStats::default())
        } else {
            it.solve(&unknown, x, Some(witness))?
        };
        stats.num_no = inf.len();
        stats.num_yes = target.len();
        Ok(Computed::new(values, stats))
    }

    /// Expected reward accumulated within `k` steps.
    pub fn cumulative_reward(&self, rewards: &StepRewards, k: usize) -> Computed {
        let n = self.num_states();
        let it = Iteration {
            choices: self.choices,
            dirs: self.dirs,
            rewards: Some(rewards),
            options: self.options,
        };
        let (values, _) = it.bounded(&BitSet::full(n), vec![0.0; n], k, false);
        let stats = SolverStats {
            method: "Bounded iteration".to_string(),
            iterations: k,
            ..Default::default()
        };
        Computed::new(values, stats)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::config::SolnMethod;
    use crate::distribution::Distribution;
    use crate::model::{ExplicitModel, RewardStructure};
    use crate::types::ModelType;

    // Coin flips until heads: 0 -> {0: 0.5, 1: 0.5}, 1 absorbing
    fn geometric() -> Choices {
        let mut m = ExplicitModel::new(ModelType::Dtmc, 2);
        m.add_choice(0, [(0, 0.5), (1, 0.5)].into_iter().collect());
        m.add_choice(1, Distribution::point(1));
        Choices::from_model(&m)
    }

    fn solver<'a>(choices: &'a Choices, dirs: &'a [Option<Opt>], options: &'a CheckerOptions) -> DiscreteSolver<'a> {
        DiscreteSolver { choices, dirs, options }
    }

    #[test]
    fn test_bounded_until() {
        let choices = geometric();
        let options = CheckerOptions::default();
        let s = solver(&choices, &[None, None], &options);
        let all = BitSet::full(2);
        let goal: BitSet = [1].into_iter().collect();
        let (c, _) = s.bounded_until(&all, &goal, 3, false);
        assert_eq!(c.values, vec![0.875, 1.0]);
        assert_eq!(c.stats.iterations, 3);
    }

    #[test]
    fn test_until_with_and_without_precomputation() {
        let choices = geometric();
        let goal: BitSet = [1].into_iter().collect();
        let all = BitSet::full(2);
        for precomputation in [true, false] {
            for soln_method in [SolnMethod::ValueIteration, SolnMethod::GaussSeidel] {
                let options = CheckerOptions {
                    precomputation,
                    soln_method,
                    term_crit_param: 1e-10,
                    ..Default::default()
                };
                let c = solver(&choices, &[None, None], &options).until(&all, &goal).unwrap();
                assert!((c.values[0] - 1.0).abs() < 1e-8, "{:?}", c.values);
            }
        }
    }

    #[test]
    fn test_reach_reward() {
        let choices = geometric();
        let options = CheckerOptions {
            term_crit_param: 1e-10,
            ..Default::default()
        };
        let rewards = StepRewards::per_step(&RewardStructure::new("steps", vec![1.0, 0.0]), &choices);
        let goal: BitSet = [1].into_iter().collect();
        let c = solver(&choices, &[None, None], &options).reach_reward(&rewards, &goal).unwrap();
        assert!((c.values[0] - 2.0).abs() < 1e-8);
        assert_eq!(c.values[1], 0.0);

        // unreachable target
        let never: BitSet = BitSet::empty();
        let c = solver(&choices, &[None, None], &options).reach_reward(&rewards, &never).unwrap();
        assert_eq!(c.values, vec![f64::INFINITY, f64::INFINITY]);
    }

    #[test]
    fn test_cumulative_reward() {
        let choices = geometric();
        let options = CheckerOptions::default();
        let rewards = StepRewards::per_step(&RewardStructure::new("steps", vec![1.0, 0.0]), &choices);
        let c = solver(&choices, &[None, None], &options).cumulative_reward(&rewards, 2);
        assert_eq!(c.values, vec![1.5, 0.0]);
    }

    #[test]
    fn test_non_convergence() {
        let choices = geometric();
        let options = CheckerOptions {
            precomputation: false,
            max_iters: 3,
            term_crit_param: 1e-12,
            ..Default::default()
        };
        let goal: BitSet = [1].into_iter().collect();
        let err = solver(&choices, &[None, None], &options)
            .until(&BitSet::full(2), &goal)
            .unwrap_err();
        match err {
            CheckError::NonConvergence { iterations, last_delta, .. } => {
                assert_eq!(iterations, 3);
                assert!(last_delta > 0.0);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
