use log::info;

use crate::bitset::BitSet;
use crate::checker::discrete::DiscreteSolver;
use crate::checker::numeric::{directions, Choices, StepRewards};
use crate::checker::{require_opt, step_bound, Computed, ModelChecker};
use crate::config::CheckerOptions;
use crate::error::CheckError;
use crate::model::{Model, RewardStructure};
use crate::property::Opt;
use crate::strategy::{StepBoundedDeterministicStrategy, Strategy};
use crate::types::ModelType;

/// Checker for Markov decision processes.
///
/// Step-bounded until queries can also synthesise an optimal
/// [`StepBoundedDeterministicStrategy`] when
/// [`CheckerOptions::generate_strategy`] is set.
#[derive(Debug, Clone)]
pub struct MdpChecker {
    options: CheckerOptions,
}

impl MdpChecker {
    pub fn new(options: CheckerOptions) -> Self {
        Self { options }
    }

    fn prepare(&self, model: &dyn Model, opt: Option<Opt>) -> Result<(Choices, Vec<Option<Opt>>), CheckError> {
        let opt = require_opt(ModelType::Mdp, opt)?;
        Ok((Choices::from_model(model), directions(model, Some(opt))))
    }
}

impl ModelChecker for MdpChecker {
    fn model_type(&self) -> ModelType {
        ModelType::Mdp
    }

    fn options(&self) -> &CheckerOptions {
        &self.options
    }

    fn compute_next(&self, model: &dyn Model, opt: Option<Opt>, target: &BitSet) -> Result<Computed, CheckError> {
        let (choices, dirs) = self.prepare(model, opt)?;
        let solver = DiscreteSolver {
            choices: &choices,
            dirs: &dirs,
            options: &self.options,
        };
        Ok(solver.next(target))
    }

    fn compute_until(
        &self,
        model: &dyn Model,
        opt: Option<Opt>,
        left: &BitSet,
        right: &BitSet,
        bound: Option<f64>,
    ) -> Result<Computed, CheckError> {
        let (choices, dirs) = self.prepare(model, opt)?;
        let solver = DiscreteSolver {
            choices: &choices,
            dirs: &dirs,
            options: &self.options,
        };
        let Some(bound) = bound else {
            return solver.until(left, right);
        };

        let k = step_bound(ModelType::Mdp, bound)?;
        let record = self.options.generate_strategy && k > 0;
        let (mut computed, actions) = solver.bounded_until(left, right, k, record);
        if let Some(actions) = actions {
            let mut strategy = StepBoundedDeterministicStrategy::from_actions(&actions, k)
                .map_err(|e| CheckError::InvalidModel(e.to_string()))?;
            strategy.set_info(format!("Optimal strategy for {} steps", k));
            info!(
                "Generated step-bounded strategy for {} states, bound {}, table size {}",
                strategy.num_states(),
                k,
                strategy.choice_table_size()
            );
            computed.strategy = Some(strategy);
        }
        Ok(computed)
    }

    fn compute_reach_reward(
        &self,
        model: &dyn Model,
        opt: Option<Opt>,
        rewards: &RewardStructure,
        target: &BitSet,
    ) -> Result<Computed, CheckError> {
        let (choices, dirs) = self.prepare(model, opt)?;
        let rewards = StepRewards::per_step(rewards, &choices);
        let solver = DiscreteSolver {
            choices: &choices,
            dirs: &dirs,
            options: &self.options,
        };
        solver.reach_reward(&rewards, target)
    }

    fn compute_cumulative_reward(
        &self,
        model: &dyn Model,
        opt: Option<Opt>,
        rewards: &RewardStructure,
        bound: f64,
    ) -> Result<Computed, CheckError> {
        let k = step_bound(ModelType::Mdp, bound)?;
        let (choices, dirs) = self.prepare(model, opt)?;
        let rewards = StepRewards::per_step(rewards, &choices);
        let solver = DiscreteSolver {
            choices: &choices,
            dirs: &dirs,
            options: &self.options,
        };
        Ok(solver.cumulative_reward(&rewards, k))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::config::SolnMethod;
    use crate::distribution::Distribution;
    use crate::model::ExplicitModel;
    use crate::strategy::MemoryElement;

    // 0: safe -> {1: 0.9, 2: 0.1}, risky -> {1: 0.5, 3: 0.5}
    // 1: retry -> 0, give up -> 2
    // 2: fail, 3: goal (absorbing)
    fn retry() -> ExplicitModel {
        let mut m = ExplicitModel::new(ModelType::Mdp, 4);
        m.add_choice(0, [(1, 0.9), (2, 0.1)].into_iter().collect());
        m.add_choice(0, [(1, 0.5), (3, 0.5)].into_iter().collect());
        m.add_choice(1, Distribution::point(0));
        m.add_choice(1, Distribution::point(2));
        m.add_choice(2, Distribution::point(2));
        m.add_choice(3, Distribution::point(3));
        m.add_initial_state(0);
        m.add_label("goal", [3].into_iter().collect());
        m.add_reward_structure(RewardStructure::new("steps", vec![1.0, 1.0, 0.0, 0.0]));
        m
    }

    fn goal() -> BitSet {
        [3].into_iter().collect()
    }

    #[test]
    fn test_all_methods_agree() {
        let m = retry();
        for soln_method in [
            SolnMethod::ValueIteration,
            SolnMethod::GaussSeidel,
            SolnMethod::PolicyIteration,
            SolnMethod::ModifiedPolicyIteration,
        ] {
            let checker = MdpChecker::new(CheckerOptions {
                soln_method,
                term_crit_param: 1e-10,
                ..Default::default()
            });
            let max = checker.compute_until(&m, Some(Opt::Max), &BitSet::full(4), &goal(), None).unwrap();
            assert!((max.values[0] - 1.0).abs() < 1e-8, "{}: {:?}", soln_method, max.values);
            let min = checker.compute_until(&m, Some(Opt::Min), &BitSet::full(4), &goal(), None).unwrap();
            assert!(min.values[0].abs() < 1e-8, "{}: {:?}", soln_method, min.values);
        }
    }

    #[test]
    fn test_policy_iteration_without_precomputation() {
        let m = retry();
        let checker = MdpChecker::new(CheckerOptions {
            precomputation: false,
            soln_method: SolnMethod::PolicyIteration,
            term_crit_param: 1e-10,
            ..Default::default()
        });
        let max = checker.compute_until(&m, Some(Opt::Max), &BitSet::full(4), &goal(), None).unwrap();
        assert!((max.values[0] - 1.0).abs() < 1e-6, "{:?}", max.values);
    }

    #[test]
    fn test_min_expected_steps() {
        let m = retry();
        for soln_method in [SolnMethod::ValueIteration, SolnMethod::PolicyIteration] {
            let checker = MdpChecker::new(CheckerOptions {
                soln_method,
                term_crit_param: 1e-10,
                ..Default::default()
            });
            let rewards = m.reward_structure(Some("steps")).unwrap();
            let c = checker.compute_reach_reward(&m, Some(Opt::Min), rewards, &goal()).unwrap();
            // risky until it works: x0 = 1 + 0.5 * x1, x1 = 1 + x0
            assert!((c.values[0] - 3.0).abs() < 1e-7, "{}: {:?}", soln_method, c.values);
            assert_eq!(c.values[2], f64::INFINITY);

            let c = checker.compute_reach_reward(&m, Some(Opt::Max), rewards, &goal()).unwrap();
            assert_eq!(c.values[0], f64::INFINITY);
        }
    }

    #[test]
    fn test_min_reward_ignores_zero_reward_cycles() {
        // 0: idle -> self (free), go -> 1 (cost 1); 1: goal
        let mut m = ExplicitModel::new(ModelType::Mdp, 2);
        m.add_choice(0, Distribution::point(0));
        m.add_choice(0, Distribution::point(1));
        m.add_choice(1, Distribution::point(1));
        m.add_reward_structure(
            RewardStructure::new("cost", vec![0.0, 0.0]).with_choice_rewards(vec![vec![0.0, 1.0], vec![0.0]]),
        );
        let rewards = m.reward_structure(Some("cost")).unwrap();
        let target: BitSet = [1].into_iter().collect();

        for soln_method in [
            SolnMethod::ValueIteration,
            SolnMethod::GaussSeidel,
            SolnMethod::PolicyIteration,
            SolnMethod::ModifiedPolicyIteration,
        ] {
            let checker = MdpChecker::new(CheckerOptions {
                soln_method,
                term_crit_param: 1e-10,
                ..Default::default()
            });
            let c = checker.compute_reach_reward(&m, Some(Opt::Min), rewards, &target).unwrap();
            assert!((c.values[0] - 1.0).abs() < 1e-9, "{}: {:?}", soln_method, c.values);
            assert_eq!(c.values[1], 0.0);
        }
    }

    #[test]
    fn test_bounded_strategy_generation() {
        let m = retry();
        let checker = MdpChecker::new(CheckerOptions {
            generate_strategy: true,
            ..Default::default()
        });
        let c = checker
            .compute_until(&m, Some(Opt::Max), &BitSet::full(4), &goal(), Some(3.0))
            .unwrap();
        // risky, retry, risky
        assert_eq!(c.values[0], 0.75);

        let mut strategy = c.strategy.unwrap();
        assert_eq!(strategy.bound(), 3);
        assert_eq!(strategy.num_states(), 4);
        strategy.set_memory(MemoryElement::Int(3)).unwrap();
        assert_eq!(strategy.next_move(0).unwrap().get(1), 1.0);
        strategy.set_memory(MemoryElement::Int(2)).unwrap();
        assert_eq!(strategy.next_move(1).unwrap().get(0), 1.0);
    }

    #[test]
    fn test_no_strategy_unless_requested() {
        let m = retry();
        let checker = MdpChecker::new(CheckerOptions::default());
        let c = checker
            .compute_until(&m, Some(Opt::Max), &BitSet::full(4), &goal(), Some(3.0))
            .unwrap();
        assert!(c.strategy.is_none());
        assert!(checker.compute_until(&m, None, &BitSet::full(4), &goal(), None).is_err());
    }
}
