use crate::bitset::BitSet;
use crate::checker::discrete::DiscreteSolver;
use crate::checker::numeric::{Choices, StepRewards};
use crate::checker::{step_bound, Computed, ModelChecker};
use crate::config::CheckerOptions;
use crate::error::CheckError;
use crate::model::{Model, RewardStructure};
use crate::property::Opt;
use crate::types::ModelType;

/// Checker for discrete-time Markov chains.
#[derive(Debug, Clone)]
pub struct DtmcChecker {
    options: CheckerOptions,
}

impl DtmcChecker {
    pub fn new(options: CheckerOptions) -> Self {
        Self { options }
    }
}

impl ModelChecker for DtmcChecker {
    fn model_type(&self) -> ModelType {
        ModelType::Dtmc
    }

    fn options(&self) -> &CheckerOptions {
        &self.options
    }

    fn compute_next(&self, model: &dyn Model, _opt: Option<Opt>, target: &BitSet) -> Result<Computed, CheckError> {
        let choices = Choices::from_model(model);
        let dirs = vec![None; choices.num_states()];
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
        _opt: Option<Opt>,
        left: &BitSet,
        right: &BitSet,
        bound: Option<f64>,
    ) -> Result<Computed, CheckError> {
        let choices = Choices::from_model(model);
        let dirs = vec![None; choices.num_states()];
        let solver = DiscreteSolver {
            choices: &choices,
            dirs: &dirs,
            options: &self.options,
        };
        match bound {
            Some(bound) => {
                let k = step_bound(ModelType::Dtmc, bound)?;
                Ok(solver.bounded_until(left, right, k, false).0)
            }
            None => solver.until(left, right),
        }
    }

    fn compute_reach_reward(
        &self,
        model: &dyn Model,
        _opt: Option<Opt>,
        rewards: &RewardStructure,
        target: &BitSet,
    ) -> Result<Computed, CheckError> {
        let choices = Choices::from_model(model);
        let dirs = vec![None; choices.num_states()];
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
        _opt: Option<Opt>,
        rewards: &RewardStructure,
        bound: f64,
    ) -> Result<Computed, CheckError> {
        let k = step_bound(ModelType::Dtmc, bound)?;
        let choices = Choices::from_model(model);
        let dirs = vec![None; choices.num_states()];
        let rewards = StepRewards::per_step(rewards, &choices);
        let solver = DiscreteSolver {
            choices: &choices,
            dirs: &dirs,
            options: &self.options,
        };
        Ok(solver.cumulative_reward(&rewards, k))
    }
}
