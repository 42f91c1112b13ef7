//! Variable valuations of model states.

use std::fmt;

use crate::error::{EvalError, EvalResult};

/// A typed value of a model variable or expression.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Double(f64),
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Bool(_) => Type::Bool,
            Value::Double(_) => Type::Double,
        }
    }

    pub fn as_bool(&self) -> EvalResult<bool> {
        match *self {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::TypeMismatch {
                expected: Type::Bool.to_string(),
                found: other.ty().to_string(),
            }),
        }
    }

    pub fn as_int(&self) -> EvalResult<i64> {
        match *self {
            Value::Int(i) => Ok(i),
            other => Err(EvalError::TypeMismatch {
                expected: Type::Int.to_string(),
                found: other.ty().to_string(),
            }),
        }
    }

    /// Numeric view: ints widen to doubles.
    pub fn as_double(&self) -> EvalResult<f64> {
        match *self {
            Value::Int(i) => Ok(i as f64),
            Value::Double(d) => Ok(d),
            Value::Bool(_) => Err(EvalError::TypeMismatch {
                expected: Type::Double.to_string(),
                found: Type::Bool.to_string(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Double(d) => write!(f, "{}", d),
        }
    }
}

/// Declared type of a variable.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Type {
    Int,
    Bool,
    Double,
}

impl Type {
    /// Coerces `value` to this type.
    ///
    /// Only the widening `int -> double` is implicit; every other mismatch is
    /// an error.
    pub fn cast_value_to(self, value: Value) -> EvalResult<Value> {
        match (self, value) {
            (Type::Int, Value::Int(_)) | (Type::Bool, Value::Bool(_)) | (Type::Double, Value::Double(_)) => Ok(value),
            (Type::Double, Value::Int(i)) => Ok(Value::Double(i as f64)),
            (expected, found) => Err(EvalError::TypeMismatch {
                expected: expected.to_string(),
                found: found.ty().to_string(),
            }),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Double => write!(f, "double"),
        }
    }
}

/// The valuation of all variables in one model state, by variable index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct State {
    values: Vec<Value>,
}

impl State {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Concatenation of two valuations, as used for product states.
    pub fn concat(&self, other: &State) -> State {
        let mut values = self.values.clone();
        values.extend_from_slice(&other.values);
        State { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.values.get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: Value) {
        self.values[index] = value;
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}

impl From<Vec<i64>> for State {
    fn from(values: Vec<i64>) -> Self {
        State::new(values.into_iter().map(Value::Int).collect())
    }
}
