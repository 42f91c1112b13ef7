use log::debug;

use crate::bitset::BitSet;
use crate::checker::discrete::DiscreteSolver;
use crate::checker::numeric::{indicator, poisson_weights, Choices, Iteration, StepRewards};
use crate::checker::{Computed, ModelChecker};
use crate::config::CheckerOptions;
use crate::error::CheckError;
use crate::model::{Model, RewardStructure};
use crate::property::Opt;
use crate::result::SolverStats;
use crate::types::ModelType;

/// Slack on the maximal exit rate used as uniformisation rate.
pub(super) const UNIFORMISATION_SLACK: f64 = 1.02;

/// Checker for continuous-time Markov chains.
///
/// Unbounded properties are computed on the embedded DTMC, time-bounded
/// ones by uniformisation.
#[derive(Debug, Clone)]
pub struct CtmcChecker {
    options: CheckerOptions,
}

impl CtmcChecker {
    pub fn new(options: CheckerOptions) -> Self {
        Self { options }
    }

    fn with_embedded<T>(&self, rates: &Choices, f: impl FnOnce(&DiscreteSolver<'_>) -> T) -> T {
        let embedded = rates.embedded();
        let dirs = vec![None; embedded.num_states()];
        f(&DiscreteSolver {
            choices: &embedded,
            dirs: &dirs,
            options: &self.options,
        })
    }

    fn uniformisation_stats(&self, terms: usize) -> SolverStats {
        SolverStats {
            method: "Uniformisation".to_string(),
            iterations: terms,
            ..Default::default()
        }
    }
}

impl ModelChecker for CtmcChecker {
    fn model_type(&self) -> ModelType {
        ModelType::Ctmc
    }

    fn options(&self) -> &CheckerOptions {
        &self.options
    }

    fn compute_next(&self, model: &dyn Model, _opt: Option<Opt>, target: &BitSet) -> Result<Computed, CheckError> {
        let rates = Choices::from_model(model);
        Ok(self.with_embedded(&rates, |solver| solver.next(target)))
    }

    fn compute_until(
        &self,
        model: &dyn Model,
        _opt: Option<Opt>,
        left: &BitSet,
        right: &BitSet,
        bound: Option<f64>,
    ) -> Result<Computed, CheckError> {
        let rates = Choices::from_model(model);
        let Some(t) = bound else {
            return self.with_embedded(&rates, |solver| solver.until(left, right));
        };

        let n = rates.num_states();
        let q = rates.max_exit_rate() * UNIFORMISATION_SLACK;
        if q == 0.0 || t == 0.0 {
            return Ok(Computed::new(indicator(right, n), SolverStats::default()));
        }

        let weights = poisson_weights(q * t, self.options.term_crit_param);
        debug!("Uniformisation rate {}, {} Poisson terms", q, weights.len());
        let uniformised = rates.uniformised(q);
        let dirs = vec![None; n];
        let it = Iteration {
            choices: &uniformised,
            dirs: &dirs,
            rewards: None,
            options: &self.options,
        };
        let mut unknown = left.clone();
        unknown.difference_with(right);
        let values = it.transient(&unknown, right, &weights);
        Ok(Computed::new(values, self.uniformisation_stats(weights.len())))
    }

    fn compute_reach_reward(
        &self,
        model: &dyn Model,
        _opt: Option<Opt>,
        rewards: &RewardStructure,
        target: &BitSet,
    ) -> Result<Computed, CheckError> {
        let rates = Choices::from_model(model);
        let rewards = StepRewards::per_jump(rewards, &rates);
        self.with_embedded(&rates, |solver| solver.reach_reward(&rewards, target))
    }

    /// Expected reward accumulated up to time `t`:
    /// `Σ_i (1 - F(i)) / q · P^i r`, where `F` is the Poisson distribution
    /// function and `r` the reward rate of each state.
    fn compute_cumulative_reward(
        &self,
        model: &dyn Model,
        _opt: Option<Opt>,
        rewards: &RewardStructure,
        bound: f64,
    ) -> Result<Computed, CheckError> {
        let rates = Choices::from_model(model);
        let n = rates.num_states();

        // Choice rewards are earned per transition, i.e. at the exit rate
        let rate_of = |s: usize| {
            let transitions = match rates.choices(s).len() {
                0 => 0.0,
                _ => rewards.choice_reward(s, 0) * rates.exit_rate(s, 0),
            };
            rewards.state_reward(s) + transitions
        };
        let r: Vec<f64> = (0..n).map(rate_of).collect();

        let q = rates.max_exit_rate() * UNIFORMISATION_SLACK;
        if q == 0.0 || bound == 0.0 {
            let values = r.iter().map(|x| x * bound).collect();
            return Ok(Computed::new(values, SolverStats::default()));
        }

        let weights = poisson_weights(q * bound, self.options.term_crit_param);
        let uniformised = rates.uniformised(q);
        let dirs = vec![None; n];
        let it = Iteration {
            choices: &uniformised,
            dirs: &dirs,
            rewards: None,
            options: &self.options,
        };

        let mut values = vec![0.0; n];
        let mut v = r;
        let mut next = v.clone();
        let mut cdf = 0.0;
        for (i, w) in weights.iter().enumerate() {
            cdf += w;
            let coeff = (1.0 - cdf).max(0.0) / q;
            for s in 0..n {
                values[s] += coeff * v[s];
            }
            if i + 1 < weights.len() {
                for s in 0..n {
                    next[s] = it.best(s, &v).map_or(v[s], |(x, _)| x);
                }
                std::mem::swap(&mut v, &mut next);
            }
        }
        Ok(Computed::new(values, self.uniformisation_stats(weights.len())))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::distribution::Distribution;
    use crate::model::ExplicitModel;

    // 0 --2.0--> 1, 1 absorbing
    fn decay() -> ExplicitModel {
        let mut m = ExplicitModel::new(ModelType::Ctmc, 2);
        m.add_choice(0, Distribution::point(1).scaled(0.5));
        m.add_initial_state(0);
        m.add_reward_structure(RewardStructure::new("time", vec![1.0, 0.0]));
        m
    }

    fn checker() -> CtmcChecker {
        CtmcChecker::new(CheckerOptions {
            term_crit_param: 1e-10,
            ..Default::default()
        })
    }

    #[test]
    fn test_time_bounded_reachability() {
        let m = decay();
        let target: BitSet = [1].into_iter().collect();
        for t in [0.1, 0.5, 2.0] {
            let c = checker().compute_until(&m, None, &BitSet::full(2), &target, Some(t)).unwrap();
            let exact = 1.0 - (-2.0 * t).exp();
            assert!((c.values[0] - exact).abs() < 1e-8, "t = {}: {} vs {}", t, c.values[0], exact);
            assert!((c.values[1] - 1.0).abs() < 1e-8);
        }
        let c = checker().compute_until(&m, None, &BitSet::full(2), &target, Some(0.0)).unwrap();
        assert_eq!(c.values, vec![0.0, 1.0]);
    }

    #[test]
    fn test_unbounded_on_embedded_chain() {
        // Race between rate 1 to state 1 and rate 3 to state 2
        let mut m = ExplicitModel::new(ModelType::Ctmc, 3);
        m.add_choice(0, [(1, 1.0), (2, 3.0)].into_iter().collect());
        m.add_initial_state(0);
        let target: BitSet = [1].into_iter().collect();
        let c = checker().compute_until(&m, None, &BitSet::full(3), &target, None).unwrap();
        assert!((c.values[0] - 0.25).abs() < 1e-12, "{:?}", c.values);
        assert_eq!(c.values[1], 1.0);
        assert_eq!(c.values[2], 0.0);

        let next = checker().compute_next(&m, None, &target).unwrap();
        assert!((next.values[0] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_expected_time_to_absorption() {
        let m = decay();
        let target: BitSet = [1].into_iter().collect();
        let rewards = m.reward_structure(None).unwrap();
        let c = checker().compute_reach_reward(&m, None, rewards, &target).unwrap();
        assert!((c.values[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cumulative_time() {
        let m = decay();
        let rewards = m.reward_structure(None).unwrap();
        let t = 1.0;
        let c = checker().compute_cumulative_reward(&m, None, rewards, t).unwrap();
        // expected time spent in 0 before t: (1 - e^{-2t}) / 2
        let exact = (1.0 - (-2.0 * t).exp()) / 2.0;
        assert!((c.values[0] - exact).abs() < 1e-7, "{} vs {}", c.values[0], exact);
        assert_eq!(c.values[1], 0.0);
    }
}
