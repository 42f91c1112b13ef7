//! Model checkers, one per model type.
//!
//! A [`ModelChecker`] computes per-state values for the basic path and
//! reward operators of its model class. The provided [`ModelChecker::check`]
//! method does the common part: it evaluates state formulas to sets,
//! reduces `G` to `F`, selects the reward structure, and turns the computed
//! values into a [`CheckResult`].
//!
//! | type    | checker          | methods                                                        |
//! |---------|------------------|----------------------------------------------------------------|
//! | DTMC    | [`DtmcChecker`]  | value iteration, Gauss-Seidel                                  |
//! | MDP     | [`MdpChecker`]   | value iteration, Gauss-Seidel, (modified) policy iteration     |
//! | CTMC    | [`CtmcChecker`]  | embedded DTMC, uniformisation for time bounds                  |
//! | CTMDP   | [`CtmdpChecker`] | embedded MDP, step-wise optimal uniformisation for time bounds |
//! | STPG    | [`StpgChecker`]  | value iteration, Gauss-Seidel                                  |

mod ctmc;
mod ctmdp;
mod discrete;
mod dtmc;
mod mdp;
pub mod numeric;
pub mod precomp;
mod stpg;

use std::time::Instant;

use log::debug;

use crate::bitset::BitSet;
use crate::config::CheckerOptions;
use crate::error::{CheckError, EvalError};
use crate::expr::EvalContext;
use crate::labels::Labels;
use crate::model::{Model, RewardStructure};
use crate::property::{Opt, PathFormula, Property, PropertySet, RewardPath, StateFormula};
use crate::result::{CheckResult, ResultValue, SolverStats, StateVector};
use crate::strategy::StepBoundedDeterministicStrategy;
use crate::types::ModelType;

pub use ctmc::CtmcChecker;
pub use ctmdp::CtmdpChecker;
pub use dtmc::DtmcChecker;
pub use mdp::MdpChecker;
pub use stpg::StpgChecker;

/// Per-state values computed for one operator.
#[derive(Debug, Clone)]
pub struct Computed {
    pub values: Vec<f64>,
    pub stats: SolverStats,
    pub strategy: Option<StepBoundedDeterministicStrategy>,
}

impl Computed {
    pub fn new(values: Vec<f64>, stats: SolverStats) -> Self {
        Self {
            values,
            stats,
            strategy: None,
        }
    }
}

/// A checker for one model type.
pub trait ModelChecker {
    fn model_type(&self) -> ModelType;

    fn options(&self) -> &CheckerOptions;

    /// `P [ X target ]`
    fn compute_next(&self, model: &dyn Model, opt: Option<Opt>, target: &BitSet) -> Result<Computed, CheckError>;

    /// `P [ left U right ]`, with an optional step or time bound.
    fn compute_until(
        &self,
        model: &dyn Model,
        opt: Option<Opt>,
        left: &BitSet,
        right: &BitSet,
        bound: Option<f64>,
    ) -> Result<Computed, CheckError>;

    /// `R [ F target ]`
    fn compute_reach_reward(
        &self,
        model: &dyn Model,
        opt: Option<Opt>,
        rewards: &RewardStructure,
        target: &BitSet,
    ) -> Result<Computed, CheckError>;

    /// `R [ C<=bound ]`
    fn compute_cumulative_reward(
        &self,
        model: &dyn Model,
        opt: Option<Opt>,
        rewards: &RewardStructure,
        bound: f64,
    ) -> Result<Computed, CheckError>;

    /// Computes the values of a probabilistic path formula.
    fn compute_path(
        &self,
        model: &dyn Model,
        sat: &StateEvaluator<'_>,
        opt: Option<Opt>,
        path: &PathFormula,
    ) -> Result<Computed, CheckError> {
        match path {
            PathFormula::Next(target) => self.compute_next(model, opt, &sat.evaluate(target)?),
            PathFormula::Until { left, right, bound } => {
                self.compute_until(model, opt, &sat.evaluate(left)?, &sat.evaluate(right)?, *bound)
            }
            PathFormula::Globally { inner, bound } => {
                // G φ = ¬ F ¬φ, optimised in the opposite direction
                let n = model.num_states();
                let bad = sat.evaluate(inner)?.complement(n);
                let mut computed = self.compute_until(model, opt.map(Opt::flip), &BitSet::full(n), &bad, *bound)?;
                for v in computed.values.iter_mut() {
                    *v = 1.0 - *v;
                }
                Ok(computed)
            }
        }
    }

    /// Model checks `property` on `model`.
    fn check(
        &self,
        model: &dyn Model,
        labels: &Labels,
        props: &PropertySet,
        property: &Property,
    ) -> Result<CheckResult, CheckError> {
        let start = Instant::now();
        let sat = StateEvaluator::new(model, labels, props);

        let (computed, threshold) = match property {
            Property::State(phi) => {
                let set = sat.evaluate(phi)?;
                return Ok(CheckResult {
                    value: ResultValue::Bool(model.initial_states().is_subset(&set)),
                    states: StateVector::Bools(set),
                    stats: SolverStats {
                        elapsed: start.elapsed(),
                        ..Default::default()
                    },
                    model_type: self.model_type(),
                    options: self.options().clone(),
                    strategy: None,
                });
            }
            Property::Prob { opt, threshold, path } => (self.compute_path(model, &sat, *opt, path)?, threshold),
            Property::Reward {
                structure,
                opt,
                threshold,
                path,
            } => {
                let rewards = model.reward_structure(structure.as_deref()).ok_or_else(|| {
                    CheckError::MalformedProperty(format!("unknown reward structure in {}", property))
                })?;
                let computed = match path {
                    RewardPath::Reach(target) => {
                        self.compute_reach_reward(model, *opt, rewards, &sat.evaluate(target)?)?
                    }
                    RewardPath::Cumulative(bound) => self.compute_cumulative_reward(model, *opt, rewards, *bound)?,
                };
                (computed, threshold)
            }
        };

        let Computed {
            values,
            mut stats,
            strategy,
        } = computed;
        stats.elapsed = start.elapsed();
        debug!("{} computed in {:?} ({} iterations)", property, stats.elapsed, stats.iterations);

        let initial = model.initial_states();
        let (value, states) = match threshold {
            Some((op, bound)) => {
                let set: BitSet = (0..values.len()).filter(|&s| op.apply(values[s], *bound)).collect();
                (ResultValue::Bool(initial.is_subset(&set)), StateVector::Bools(set))
            }
            None => {
                let value = match (initial.len(), initial.iter().next()) {
                    (1, Some(s)) => ResultValue::Scalar(values[s]),
                    _ => ResultValue::Vector(values.clone()),
                };
                (value, StateVector::Doubles(values))
            }
        };

        Ok(CheckResult {
            value,
            states,
            stats,
            model_type: self.model_type(),
            options: self.options().clone(),
            strategy,
        })
    }
}

/// Evaluates state formulas to sets of states.
///
/// Labels are looked up in the labelling reference, then the model, then
/// among the label definitions of the property set.
pub struct StateEvaluator<'a> {
    model: &'a dyn Model,
    labels: &'a Labels,
    props: &'a PropertySet,
}

impl<'a> StateEvaluator<'a> {
    pub fn new(model: &'a dyn Model, labels: &'a Labels, props: &'a PropertySet) -> Self {
        Self { model, labels, props }
    }

    pub fn evaluate(&self, phi: &StateFormula) -> Result<BitSet, CheckError> {
        self.eval(phi, &mut Vec::new())
    }

    fn eval(&self, phi: &StateFormula, defining: &mut Vec<String>) -> Result<BitSet, CheckError> {
        let n = self.model.num_states();
        match phi {
            StateFormula::True => Ok(BitSet::full(n)),
            StateFormula::False => Ok(BitSet::new(n)),
            StateFormula::Label(name) => {
                if let Some(states) = self.labels.resolve(name, self.model) {
                    return Ok(states);
                }
                let definition = self
                    .props
                    .label(name)
                    .ok_or_else(|| CheckError::MalformedProperty(format!("undefined label \"{}\"", name)))?;
                if defining.contains(name) {
                    return Err(CheckError::MalformedProperty(format!(
                        "label \"{}\" is defined in terms of itself",
                        name
                    )));
                }
                defining.push(name.clone());
                let states = self.eval(definition, defining)?;
                defining.pop();
                Ok(states)
            }
            StateFormula::Expr(expr) => {
                let states = self.model.states_list().ok_or_else(|| {
                    CheckError::MalformedProperty(format!("{} needs state variables, the model has none", expr))
                })?;
                if states.len() != n {
                    return Err(CheckError::InvalidModel(format!(
                        "the model has {} states but {} state valuations",
                        n,
                        states.len()
                    )));
                }
                let constants = self.props.constants();
                let mut set = BitSet::new(n);
                for (s, state) in states.iter().enumerate() {
                    let holds = expr
                        .evaluate_bool(&EvalContext::new(state, constants))
                        .map_err(|e| match e {
                            EvalError::TypeMismatch { .. } => {
                                CheckError::MalformedProperty(format!("{} is not a boolean formula: {}", expr, e))
                            }
                            other => CheckError::Eval(other),
                        })?;
                    if holds {
                        set.insert(s);
                    }
                }
                Ok(set)
            }
            StateFormula::Not(inner) => Ok(self.eval(inner, defining)?.complement(n)),
            StateFormula::And(lhs, rhs) => {
                let mut set = self.eval(lhs, defining)?;
                set.intersect_with(&self.eval(rhs, defining)?);
                Ok(set)
            }
            StateFormula::Or(lhs, rhs) => {
                let mut set = self.eval(lhs, defining)?;
                set.union_with(&self.eval(rhs, defining)?);
                Ok(set)
            }
        }
    }
}

/// Optimisation direction of a query on a nondeterministic model.
pub(crate) fn require_opt(model_type: ModelType, opt: Option<Opt>) -> Result<Opt, CheckError> {
    opt.ok_or_else(|| CheckError::PropertyModelMismatch {
        model_type,
        reason: "min or max is required".to_string(),
    })
}

/// Step count of a discrete-time bound.
pub(crate) fn step_bound(model_type: ModelType, bound: f64) -> Result<usize, CheckError> {
    if bound.is_finite() && bound >= 0.0 && bound.fract() == 0.0 {
        Ok(bound as usize)
    } else {
        Err(CheckError::PropertyModelMismatch {
            model_type,
            reason: format!("invalid step bound {}", bound),
        })
    }
}
