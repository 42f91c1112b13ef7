//! Temporal-logic properties (PCTL / CSL with rewards).
//!
//! Properties are built programmatically. A [`Property`] is either a
//! probabilistic operator over a [`PathFormula`], a reward operator over a
//! [`RewardPath`], or a plain [`StateFormula`].
//!
//! # Example
//!
//! ```
//! use pmc_rs::property::{Opt, Property, StateFormula};
//!
//! // Pmax=? [ F<=10 "goal" ]
//! let p = Property::prob(Some(Opt::Max), StateFormula::label("goal").eventually_within(10.0));
//! assert_eq!(p.to_string(), "Pmax=? [ true U<=10 \"goal\" ]");
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::error::CheckError;
use crate::expr::{Constants, Expr};
use crate::model::Model;
use crate::state::Value;
use crate::types::ModelType;

/// Optimisation direction of a `P`/`R` operator on nondeterministic models.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Opt {
    Min,
    Max,
}

impl Opt {
    pub fn flip(self) -> Self {
        match self {
            Opt::Min => Opt::Max,
            Opt::Max => Opt::Min,
        }
    }

    /// Returns true if `candidate` improves on `current` in this direction.
    pub fn better(self, candidate: f64, current: f64) -> bool {
        match self {
            Opt::Min => candidate < current,
            Opt::Max => candidate > current,
        }
    }

    /// Identity element for folding with [`Opt::pick`].
    pub fn worst(self) -> f64 {
        match self {
            Opt::Min => f64::INFINITY,
            Opt::Max => f64::NEG_INFINITY,
        }
    }

    pub fn pick(self, a: f64, b: f64) -> f64 {
        match self {
            Opt::Min => a.min(b),
            Opt::Max => a.max(b),
        }
    }
}

impl fmt::Display for Opt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opt::Min => write!(f, "min"),
            Opt::Max => write!(f, "max"),
        }
    }
}

/// Comparison against a probability or reward threshold.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn apply(self, value: f64, threshold: f64) -> bool {
        match self {
            CmpOp::Lt => value < threshold,
            CmpOp::Le => value <= threshold,
            CmpOp::Gt => value > threshold,
            CmpOp::Ge => value >= threshold,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmpOp::Lt => write!(f, "<"),
            CmpOp::Le => write!(f, "<="),
            CmpOp::Gt => write!(f, ">"),
            CmpOp::Ge => write!(f, ">="),
        }
    }
}

/// A state formula: evaluates to a set of states.
#[derive(Debug, Clone, PartialEq)]
pub enum StateFormula {
    True,
    False,
    /// A label from the labelling reference, the model, or the property set.
    Label(String),
    /// A boolean expression over state variables and constants.
    Expr(Expr),
    Not(Box<StateFormula>),
    And(Box<StateFormula>, Box<StateFormula>),
    Or(Box<StateFormula>, Box<StateFormula>),
}

impl StateFormula {
    pub fn label(name: impl Into<String>) -> Self {
        StateFormula::Label(name.into())
    }

    pub fn not(self) -> Self {
        match self {
            StateFormula::Not(inner) => *inner,
            StateFormula::True => StateFormula::False,
            StateFormula::False => StateFormula::True,
            other => StateFormula::Not(Box::new(other)),
        }
    }

    pub fn and(self, other: Self) -> Self {
        StateFormula::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Self) -> Self {
        StateFormula::Or(Box::new(self), Box::new(other))
    }

    /// `F φ`
    pub fn eventually(self) -> PathFormula {
        PathFormula::Until {
            left: StateFormula::True,
            right: self,
            bound: None,
        }
    }

    /// `F<=t φ`
    pub fn eventually_within(self, bound: f64) -> PathFormula {
        PathFormula::Until {
            left: StateFormula::True,
            right: self,
            bound: Some(bound),
        }
    }

    /// `φ U ψ`
    pub fn until(self, right: Self) -> PathFormula {
        PathFormula::Until {
            left: self,
            right,
            bound: None,
        }
    }

    /// `φ U<=t ψ`
    pub fn until_within(self, right: Self, bound: f64) -> PathFormula {
        PathFormula::Until {
            left: self,
            right,
            bound: Some(bound),
        }
    }

    /// `X φ`
    pub fn next(self) -> PathFormula {
        PathFormula::Next(self)
    }

    /// `G φ`, optionally bounded.
    pub fn globally(self, bound: Option<f64>) -> PathFormula {
        PathFormula::Globally { inner: self, bound }
    }
}

impl fmt::Display for StateFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateFormula::True => write!(f, "true"),
            StateFormula::False => write!(f, "false"),
            StateFormula::Label(name) => write!(f, "\"{}\"", name),
            StateFormula::Expr(e) => write!(f, "{}", e),
            StateFormula::Not(phi) => write!(f, "!{}", phi),
            StateFormula::And(phi, psi) => write!(f, "({} & {})", phi, psi),
            StateFormula::Or(phi, psi) => write!(f, "({} | {})", phi, psi),
        }
    }
}

/// A path formula under a `P` operator.
///
/// Bounds are step counts on discrete-time models and real time on
/// continuous-time models.
#[derive(Debug, Clone, PartialEq)]
pub enum PathFormula {
    Next(StateFormula),
    Until {
        left: StateFormula,
        right: StateFormula,
        bound: Option<f64>,
    },
    Globally {
        inner: StateFormula,
        bound: Option<f64>,
    },
}

impl PathFormula {
    pub fn bound(&self) -> Option<f64> {
        match self {
            PathFormula::Next(_) => None,
            PathFormula::Until { bound, .. } | PathFormula::Globally { bound, .. } => *bound,
        }
    }
}

fn fmt_bound(f: &mut fmt::Formatter<'_>, bound: Option<f64>) -> fmt::Result {
    match bound {
        Some(b) => write!(f, "<={}", b),
        None => Ok(()),
    }
}

impl fmt::Display for PathFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathFormula::Next(phi) => write!(f, "X {}", phi),
            PathFormula::Until { left, right, bound } => {
                write!(f, "{} U", left)?;
                fmt_bound(f, *bound)?;
                write!(f, " {}", right)
            }
            PathFormula::Globally { inner, bound } => {
                write!(f, "G")?;
                fmt_bound(f, *bound)?;
                write!(f, " {}", inner)
            }
        }
    }
}

/// The path part of an `R` operator.
#[derive(Debug, Clone, PartialEq)]
pub enum RewardPath {
    /// Expected reward accumulated until a target is reached.
    Reach(StateFormula),
    /// Expected reward accumulated within `k` steps (or time `k`).
    Cumulative(f64),
}

impl fmt::Display for RewardPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardPath::Reach(target) => write!(f, "F {}", target),
            RewardPath::Cumulative(k) => write!(f, "C<={}", k),
        }
    }
}

/// A property to be model checked.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Prob {
        opt: Option<Opt>,
        threshold: Option<(CmpOp, f64)>,
        path: PathFormula,
    },
    Reward {
        structure: Option<String>,
        opt: Option<Opt>,
        threshold: Option<(CmpOp, f64)>,
        path: RewardPath,
    },
    State(StateFormula),
}

impl Property {
    /// `P=? [path]`, `Pmin=? [path]` or `Pmax=? [path]`.
    pub fn prob(opt: Option<Opt>, path: PathFormula) -> Self {
        Property::Prob {
            opt,
            threshold: None,
            path,
        }
    }

    /// `R=? [path]`, `Rmin=? [path]` or `Rmax=? [path]` over the first reward structure.
    pub fn reward(opt: Option<Opt>, path: RewardPath) -> Self {
        Property::Reward {
            structure: None,
            opt,
            threshold: None,
            path,
        }
    }

    /// Turns a `=?` query into a bounded check `~ threshold`.
    pub fn with_threshold(self, op: CmpOp, value: f64) -> Self {
        match self {
            Property::Prob { opt, path, .. } => Property::Prob {
                opt,
                threshold: Some((op, value)),
                path,
            },
            Property::Reward {
                structure, opt, path, ..
            } => Property::Reward {
                structure,
                opt,
                threshold: Some((op, value)),
                path,
            },
            other => other,
        }
    }

    /// Selects a named reward structure.
    pub fn with_structure(self, name: impl Into<String>) -> Self {
        match self {
            Property::Reward {
                opt, threshold, path, ..
            } => Property::Reward {
                structure: Some(name.into()),
                opt,
                threshold,
                path,
            },
            other => other,
        }
    }

    /// Checks that this property makes sense for `model`.
    ///
    /// This runs before any checker is created, so a mismatch is attributed to
    /// the property rather than to a solver.
    pub fn check_valid(&self, model: &dyn Model) -> Result<(), CheckError> {
        let model_type = model.model_type();
        let mismatch = |reason: String| CheckError::PropertyModelMismatch { model_type, reason };

        let (opt, op_name) = match self {
            Property::State(_) => return Ok(()),
            Property::Prob { opt, .. } => (opt, "P"),
            Property::Reward { opt, .. } => (opt, "R"),
        };
        match (model_type.is_nondeterministic(), opt) {
            (false, Some(opt)) => {
                return Err(mismatch(format!("cannot use {}{} on a model without nondeterminism", op_name, opt)));
            }
            (true, None) => {
                return Err(mismatch(format!("{} operator requires min or max on nondeterministic models", op_name)));
            }
            _ => {}
        }

        let check_bound = |bound: f64| -> Result<(), CheckError> {
            if !bound.is_finite() || bound < 0.0 {
                return Err(mismatch(format!("invalid bound {}", bound)));
            }
            if !model_type.is_continuous_time() && bound.fract() != 0.0 {
                return Err(mismatch(format!("non-integer step bound {}", bound)));
            }
            Ok(())
        };

        match self {
            Property::Prob { path, .. } => {
                if let Some(bound) = path.bound() {
                    check_bound(bound)?;
                }
                if model_type == ModelType::Ctmdp && matches!(path, PathFormula::Next(_)) {
                    return Err(mismatch("next-state operator is not supported".to_string()));
                }
            }
            Property::Reward { structure, path, .. } => {
                if model.reward_structure(structure.as_deref()).is_none() {
                    return Err(mismatch(match structure {
                        Some(name) => format!("model has no reward structure \"{}\"", name),
                        None => "model has no rewards".to_string(),
                    }));
                }
                if let RewardPath::Cumulative(k) = path {
                    check_bound(*k)?;
                    if model_type == ModelType::Ctmdp {
                        return Err(mismatch("cumulative rewards are not supported".to_string()));
                    }
                }
            }
            Property::State(_) => {}
        }
        Ok(())
    }
}

fn fmt_operator(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    opt: &Option<Opt>,
    threshold: &Option<(CmpOp, f64)>,
) -> fmt::Result {
    write!(f, "{}", name)?;
    if let Some(opt) = opt {
        write!(f, "{}", opt)?;
    }
    match threshold {
        Some((op, value)) => write!(f, "{}{}", op, value),
        None => write!(f, "=?"),
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Prob { opt, threshold, path } => {
                fmt_operator(f, "P", opt, threshold)?;
                write!(f, " [ {} ]", path)
            }
            Property::Reward {
                structure,
                opt,
                threshold,
                path,
            } => {
                write!(f, "R")?;
                if let Some(name) = structure {
                    write!(f, "{{\"{}\"}}", name)?;
                }
                fmt_operator(f, "", opt, threshold)?;
                write!(f, " [ {} ]", path)
            }
            Property::State(phi) => write!(f, "{}", phi),
        }
    }
}

/// Constants, label definitions and named properties that accompany a model.
#[derive(Debug, Clone, Default)]
pub struct PropertySet {
    constants: Constants,
    labels: HashMap<String, StateFormula>,
    properties: Vec<(String, Property)>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_constant(&mut self, name: impl Into<String>, value: Value) {
        self.constants.insert(name.into(), value);
    }

    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    /// Defines a label as a state formula, e.g. `label "done" = x=10`.
    pub fn define_label(&mut self, name: impl Into<String>, formula: StateFormula) {
        self.labels.insert(name.into(), formula);
    }

    pub fn label(&self, name: &str) -> Option<&StateFormula> {
        self.labels.get(name)
    }

    pub fn add_property(&mut self, name: impl Into<String>, property: Property) {
        self.properties.push((name.into(), property));
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.properties.iter().map(|(n, p)| (n.as_str(), p))
    }
}
