use log::debug;

use crate::bitset::BitSet;
use crate::checker::ctmc::UNIFORMISATION_SLACK;
use crate::checker::discrete::DiscreteSolver;
use crate::checker::numeric::{directions, indicator, poisson_weights, Choices, Iteration, StepRewards};
use crate::checker::{require_opt, Computed, ModelChecker};
use crate::config::CheckerOptions;
use crate::error::CheckError;
use crate::model::{Model, RewardStructure};
use crate::property::Opt;
use crate::result::SolverStats;
use crate::types::ModelType;

/// Checker for continuous-time Markov decision processes.
///
/// Unbounded properties are computed on the embedded MDP. Time-bounded
/// reachability uses uniformisation with a step-wise optimal scheduler,
/// which is exact when all choices share one exit rate.
#[derive(Debug, Clone)]
pub struct CtmdpChecker {
    options: CheckerOptions,
}

impl CtmdpChecker {
    pub fn new(options: CheckerOptions) -> Self {
        Self { options }
    }

    fn unsupported(&self, what: &str) -> CheckError {
        CheckError::PropertyModelMismatch {
            model_type: ModelType::Ctmdp,
            reason: format!("{} is not supported", what),
        }
    }
}

impl ModelChecker for CtmdpChecker {
    fn model_type(&self) -> ModelType {
        ModelType::Ctmdp
    }

    fn options(&self) -> &CheckerOptions {
        &self.options
    }

    fn compute_next(&self, _model: &dyn Model, _opt: Option<Opt>, _target: &BitSet) -> Result<Computed, CheckError> {
        Err(self.unsupported("the next operator"))
    }

    fn compute_until(
        &self,
        model: &dyn Model,
        opt: Option<Opt>,
        left: &BitSet,
        right: &BitSet,
        bound: Option<f64>,
    ) -> Result<Computed, CheckError> {
        let opt = require_opt(ModelType::Ctmdp, opt)?;
        let rates = Choices::from_model(model);
        let dirs = directions(model, Some(opt));
        let n = rates.num_states();

        let Some(t) = bound else {
            let embedded = rates.embedded();
            let solver = DiscreteSolver {
                choices: &embedded,
                dirs: &dirs,
                options: &self.options,
            };
            return solver.until(left, right);
        };

        let q = rates.max_exit_rate() * UNIFORMISATION_SLACK;
        if q == 0.0 || t == 0.0 {
            return Ok(Computed::new(indicator(right, n), SolverStats::default()));
        }
        let weights = poisson_weights(q * t, self.options.term_crit_param);
        debug!("Uniformisation rate {}, {} Poisson terms", q, weights.len());
        let uniformised = rates.uniformised(q);
        let it = Iteration {
            choices: &uniformised,
            dirs: &dirs,
            rewards: None,
            options: &self.options,
        };
        let mut unknown = left.clone();
        unknown.difference_with(right);
        let values = it.transient(&unknown, right, &weights);
        let stats = SolverStats {
            method: "Uniformisation".to_string(),
            iterations: weights.len(),
            ..Default::default()
        };
        Ok(Computed::new(values, stats))
    }

    fn compute_reach_reward(
        &self,
        model: &dyn Model,
        opt: Option<Opt>,
        rewards: &RewardStructure,
        target: &BitSet,
    ) -> Result<Computed, CheckError> {
        let opt = require_opt(ModelType::Ctmdp, opt)?;
        let rates = Choices::from_model(model);
        let rewards = StepRewards::per_jump(rewards, &rates);
        let embedded = rates.embedded();
        let dirs = directions(model, Some(opt));
        let solver = DiscreteSolver {
            choices: &embedded,
            dirs: &dirs,
            options: &self.options,
        };
        solver.reach_reward(&rewards, target)
    }

    fn compute_cumulative_reward(
        &self,
        _model: &dyn Model,
        _opt: Option<Opt>,
        _rewards: &RewardStructure,
        _bound: f64,
    ) -> Result<Computed, CheckError> {
        Err(self.unsupported("cumulative reward"))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::model::ExplicitModel;

    // Uniform CTMDP with exit rate 2 everywhere:
    // 0: fast -> {1: 2.0}, split -> {1: 1.0, 2: 1.0}
    // 1: goal, 2: sink (both loop at rate 2)
    fn uniform() -> ExplicitModel {
        let mut m = ExplicitModel::new(ModelType::Ctmdp, 3);
        m.add_choice(0, [(1, 2.0)].into_iter().collect());
        m.add_choice(0, [(1, 1.0), (2, 1.0)].into_iter().collect());
        m.add_choice(1, [(1, 2.0)].into_iter().collect());
        m.add_choice(2, [(2, 2.0)].into_iter().collect());
        m.add_initial_state(0);
        m.add_reward_structure(RewardStructure::new("time", vec![1.0, 0.0, 0.0]));
        m
    }

    fn checker() -> CtmdpChecker {
        CtmdpChecker::new(CheckerOptions {
            term_crit_param: 1e-10,
            ..Default::default()
        })
    }

    #[test]
    fn test_time_bounded_uniform() {
        let m = uniform();
        let goal: BitSet = [1].into_iter().collect();
        let t = 0.5;
        let max = checker().compute_until(&m, Some(Opt::Max), &BitSet::full(3), &goal, Some(t)).unwrap();
        let min = checker().compute_until(&m, Some(Opt::Min), &BitSet::full(3), &goal, Some(t)).unwrap();
        let leave = 1.0 - (-2.0 * t).exp();
        assert!((max.values[0] - leave).abs() < 1e-8, "{:?}", max.values);
        assert!((min.values[0] - leave / 2.0).abs() < 1e-8, "{:?}", min.values);
        assert_eq!(max.stats.method, "Uniformisation");
    }

    #[test]
    fn test_unbounded_on_embedded_mdp() {
        let m = uniform();
        let goal: BitSet = [1].into_iter().collect();
        let max = checker().compute_until(&m, Some(Opt::Max), &BitSet::full(3), &goal, None).unwrap();
        assert_eq!(max.values[0], 1.0);
        let min = checker().compute_until(&m, Some(Opt::Min), &BitSet::full(3), &goal, None).unwrap();
        assert!((min.values[0] - 0.5).abs() < 1e-9);

        let rewards = m.reward_structure(None).unwrap();
        let r = checker().compute_reach_reward(&m, Some(Opt::Max), rewards, &goal).unwrap();
        assert_eq!(r.values[0], f64::INFINITY);
        let r = checker().compute_reach_reward(&m, Some(Opt::Min), rewards, &goal).unwrap();
        assert!((r.values[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_unsupported_operators() {
        let m = uniform();
        let goal: BitSet = [1].into_iter().collect();
        assert!(matches!(
            checker().compute_next(&m, Some(Opt::Max), &goal),
            Err(CheckError::PropertyModelMismatch { .. })
        ));
        let rewards = m.reward_structure(None).unwrap();
        assert!(checker().compute_cumulative_reward(&m, Some(Opt::Max), rewards, 1.0).is_err());
        assert!(checker().compute_until(&m, None, &BitSet::full(3), &goal, None).is_err());
    }
}
