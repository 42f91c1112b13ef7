//! Variable updates and overflow checking.
//!
//! An update assigns new values to state variables, e.g. `(x'=x+1)`. Every
//! right-hand side is evaluated in the *old* state and coerced to the
//! variable's declared type. [`UpdateElement::check_update`] additionally
//! verifies that the new value stays within the variable's declared range.

use std::fmt;

use log::debug;

use crate::error::{EvalError, EvalResult};
use crate::expr::{Constants, EvalContext, Expr};
use crate::state::{State, Type, Value};

/// Declaration of one state variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub ty: Type,
    pub low: i64,
    pub high: i64,
}

impl VarDecl {
    pub fn int(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self {
            name: name.into(),
            ty: Type::Int,
            low,
            high,
        }
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: Type::Bool,
            low: 0,
            high: 1,
        }
    }
}

/// Variable table with per-variable ranges, indexed like state valuations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarList {
    vars: Vec<VarDecl>,
}

impl VarList {
    pub fn new(vars: Vec<VarDecl>) -> Self {
        Self { vars }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.vars.iter().position(|v| v.name == name)
    }

    pub fn name(&self, index: usize) -> &str {
        &self.vars[index].name
    }

    pub fn ty(&self, index: usize) -> Type {
        self.vars[index].ty
    }

    pub fn low(&self, index: usize) -> i64 {
        self.vars[index].low
    }

    pub fn high(&self, index: usize) -> i64 {
        self.vars[index].high
    }

    /// Integer encoding of a value of variable `index`: booleans map to 0/1.
    pub fn encode_to_int(&self, index: usize, value: Value) -> EvalResult<i64> {
        match self.ty(index).cast_value_to(value)? {
            Value::Int(i) => Ok(i),
            Value::Bool(b) => Ok(b as i64),
            Value::Double(_) => Err(EvalError::TypeMismatch {
                expected: "int or bool".to_string(),
                found: Type::Double.to_string(),
            }),
        }
    }
}

/// A single assignment `var' = expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateElement {
    var: String,
    index: usize,
    expr: Expr,
    ty: Type,
}

impl UpdateElement {
    pub fn new(var: impl Into<String>, index: usize, expr: Expr, ty: Type) -> Self {
        Self {
            var: var.into(),
            index,
            expr,
            ty,
        }
    }

    pub fn var(&self) -> &str {
        &self.var
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn expression(&self) -> &Expr {
        &self.expr
    }

    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Evaluates the right-hand side in `old` and writes the coerced result
    /// into `new`.
    pub fn update(&self, old: &State, constants: &Constants, new: &mut State) -> EvalResult<()> {
        let ctx = EvalContext::new(old, constants);
        let value = self.ty.cast_value_to(self.expr.evaluate(&ctx)?)?;
        new.set(self.index, value);
        Ok(())
    }

    /// Checks that applying this assignment in `old` keeps the variable within
    /// its declared range.
    pub fn check_update(&self, old: &State, var_list: &VarList, constants: &Constants) -> EvalResult<()> {
        let ctx = EvalContext::new(old, constants);
        let value = var_list.encode_to_int(self.index, self.expr.evaluate(&ctx)?)?;
        if value < var_list.low(self.index) || value > var_list.high(self.index) {
            debug!("check_update: {} = {} outside [{}, {}]", self.var, value, var_list.low(self.index), var_list.high(self.index));
            return Err(EvalError::Overflow {
                var: self.var.clone(),
                expr: self.expr.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for UpdateElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}'={})", self.var, self.expr)
    }
}

/// A conjunction of assignments, performed simultaneously.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    elements: Vec<UpdateElement>,
}

impl Update {
    pub fn new(elements: Vec<UpdateElement>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[UpdateElement] {
        &self.elements
    }

    /// Returns the successor of `old`. Variables not assigned keep their value.
    pub fn apply(&self, old: &State, constants: &Constants) -> EvalResult<State> {
        let mut new = old.clone();
        for element in &self.elements {
            element.update(old, constants, &mut new)?;
        }
        Ok(new)
    }

    /// Runs [`UpdateElement::check_update`] for every assignment.
    pub fn check(&self, old: &State, var_list: &VarList, constants: &Constants) -> EvalResult<()> {
        self.elements
            .iter()
            .try_for_each(|e| e.check_update(old, var_list, constants))
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return write!(f, "true");
        }
        for (i, e) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, " & ")?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}
