use crate::bitset::BitSet;
use crate::checker::discrete::DiscreteSolver;
use crate::checker::numeric::{directions, Choices, StepRewards};
use crate::checker::{require_opt, step_bound, Computed, ModelChecker};
use crate::config::CheckerOptions;
use crate::error::CheckError;
use crate::model::{Model, RewardStructure};
use crate::property::Opt;
use crate::types::ModelType;

/// Checker for stochastic two-player games.
///
/// Player 1 optimises in the direction of the query, player 2 in the
/// opposite one.
#[derive(Debug, Clone)]
pub struct StpgChecker {
    options: CheckerOptions,
}

impl StpgChecker {
    pub fn new(options: CheckerOptions) -> Self {
        Self { options }
    }

    fn solve<T>(
        &self,
        model: &dyn Model,
        opt: Option<Opt>,
        f: impl FnOnce(&DiscreteSolver<'_>, &Choices) -> Result<T, CheckError>,
    ) -> Result<T, CheckError> {
        let opt = require_opt(ModelType::Stpg, opt)?;
        let choices = Choices::from_model(model);
        let dirs = directions(model, Some(opt));
        let solver = DiscreteSolver {
            choices: &choices,
            dirs: &dirs,
            options: &self.options,
        };
        f(&solver, &choices)
    }
}

impl ModelChecker for StpgChecker {
    fn model_type(&self) -> ModelType {
        ModelType::Stpg
    }

    fn options(&self) -> &CheckerOptions {
        &self.options
    }

    fn compute_next(&self, model: &dyn Model, opt: Option<Opt>, target: &BitSet) -> Result<Computed, CheckError> {
        self.solve(model, opt, |solver, _| Ok(solver.next(target)))
    }

    fn compute_until(
        &self,
        model: &dyn Model,
        opt: Option<Opt>,
        left: &BitSet,
        right: &BitSet,
        bound: Option<f64>,
    ) -> Result<Computed, CheckError> {
        let k = bound.map(|b| step_bound(ModelType::Stpg, b)).transpose()?;
        self.solve(model, opt, |solver, _| match k {
            Some(k) => Ok(solver.bounded_until(left, right, k, false).0),
            None => solver.until(left, right),
        })
    }

    fn compute_reach_reward(
        &self,
        model: &dyn Model,
        opt: Option<Opt>,
        rewards: &RewardStructure,
        target: &BitSet,
    ) -> Result<Computed, CheckError> {
        self.solve(model, opt, |solver, choices| {
            solver.reach_reward(&StepRewards::per_step(rewards, choices), target)
        })
    }

    fn compute_cumulative_reward(
        &self,
        model: &dyn Model,
        opt: Option<Opt>,
        rewards: &RewardStructure,
        bound: f64,
    ) -> Result<Computed, CheckError> {
        let k = step_bound(ModelType::Stpg, bound)?;
        self.solve(model, opt, |solver, choices| {
            Ok(solver.cumulative_reward(&StepRewards::per_step(rewards, choices), k))
        })
    }
}
