//! Model-checking results.

use std::fmt;
use std::time::Duration;

use crate::bitset::BitSet;
use crate::config::CheckerOptions;
use crate::strategy::StepBoundedDeterministicStrategy;
use crate::types::ModelType;

/// Per-state values computed for a property.
#[derive(Debug, Clone, PartialEq)]
pub enum StateVector {
    Doubles(Vec<f64>),
    Bools(BitSet),
}

impl StateVector {
    pub fn as_doubles(&self) -> Option<&[f64]> {
        match self {
            StateVector::Doubles(v) => Some(v),
            StateVector::Bools(_) => None,
        }
    }

    pub fn as_bools(&self) -> Option<&BitSet> {
        match self {
            StateVector::Bools(b) => Some(b),
            StateVector::Doubles(_) => None,
        }
    }
}

/// The headline outcome of a check.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    /// Numerical value in the (single) initial state.
    Scalar(f64),
    /// Truth value: holds in every initial state.
    Bool(bool),
    /// Values for every state, reported when there are several initial states.
    Vector(Vec<f64>),
}

impl ResultValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ResultValue::Scalar(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ResultValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultValue::Scalar(x) => write!(f, "{}", x),
            ResultValue::Bool(b) => write!(f, "{}", b),
            ResultValue::Vector(v) => write!(f, "{:?}", v),
        }
    }
}

/// Diagnostics attached by the solver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverStats {
    /// Numerical method actually used (empty for purely graph-based results).
    pub method: String,
    pub iterations: usize,
    /// Largest difference between the last two iterates.
    pub last_delta: f64,
    /// States fixed to 0 (or infinite reward) by precomputation.
    pub num_no: usize,
    /// States fixed to 1 (or the target) by precomputation.
    pub num_yes: usize,
    pub elapsed: Duration,
}

impl SolverStats {
    pub fn merge(&mut self, other: SolverStats) {
        if !other.method.is_empty() {
            self.method = other.method;
        }
        self.iterations += other.iterations;
        self.last_delta = self.last_delta.max(other.last_delta);
        self.num_no = other.num_no.max(self.num_no);
        self.num_yes = other.num_yes.max(self.num_yes);
    }
}

/// Everything a single `model_check` call produces.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub value: ResultValue,
    pub states: StateVector,
    pub stats: SolverStats,
    /// Model type the checker was selected for.
    pub model_type: ModelType,
    /// Options the checker ran with.
    pub options: CheckerOptions,
    /// Optimal step-bounded strategy, when one was requested and supported.
    pub strategy: Option<StepBoundedDeterministicStrategy>,
}

impl CheckResult {
    pub fn value_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }

    pub fn value_bool(&self) -> Option<bool> {
        self.value.as_bool()
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
