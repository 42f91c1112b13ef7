//! Error types.
//!
//! Each concern has its own error enum: model checking ([`CheckError`]),
//! strategies and product construction ([`StrategyError`]), and expression
//! evaluation ([`EvalError`]).

use thiserror::Error;

use crate::types::ModelType;

/// An error raised while evaluating an expression or checking an update.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("value of variable {var} overflows in {expr}")]
    Overflow { var: String, expr: String },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("undefined constant: {0}")]
    UndefinedConstant(String),

    #[error("division by zero")]
    DivisionByZero,
}

pub type EvalResult<T> = Result<T, EvalError>;

/// An error raised by the model-checking dispatcher or one of the checkers.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("property is not valid for {model_type} models: {reason}")]
    PropertyModelMismatch { model_type: ModelType, reason: String },

    #[error("unsupported model type: {0}")]
    UnsupportedModelType(String),

    #[error("invalid value {value:?} for setting {key}")]
    Configuration { key: &'static str, value: String },

    #[error("malformed property: {0}")]
    MalformedProperty(String),

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("{method} did not converge after {iterations} iterations (last delta {last_delta:e})")]
    NonConvergence {
        method: String,
        iterations: usize,
        last_delta: f64,
    },

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// An error raised by a strategy, either at construction, on misuse, or
/// while building a product.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("malformed strategy table at state {state}: {reason}")]
    MalformedStrategyTable { state: usize, reason: String },

    #[error("invalid strategy state: {0}")]
    InvalidStrategyState(String),

    #[error("the strategy is undefined for state {state} (table covers {num_states} states)")]
    UndefinedStrategyState { state: usize, num_states: usize },

    #[error("invalid memory: {0}")]
    InvalidMemoryType(String),

    #[error("product construction is not supported: {0}")]
    UnsupportedProductModel(String),

    #[error("product construction failed at state {state}, memory {memory}: {source}")]
    ProductConstruction {
        state: usize,
        memory: usize,
        #[source]
        source: Box<StrategyError>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type StrategyResult<T> = Result<T, StrategyError>;
