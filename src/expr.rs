//! Expressions over model variables and constants.
//!
//! This is the evaluation service used by state predicates in properties and
//! by variable updates. Expressions are boxed trees; variables refer to their
//! index in the state valuation, constants are looked up by name.

use std::collections::HashMap;
use std::fmt;

use crate::error::{EvalError, EvalResult};
use crate::state::{State, Value};

/// Named constant values.
pub type Constants = HashMap<String, Value>;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UnOp {
    Not,
    Neg,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Implies,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "=",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Implies => "=>",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// State variable, by name and index into the valuation.
    Var { name: String, index: usize },
    /// Named constant.
    Const(String),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ite(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn int(i: i64) -> Self {
        Expr::Literal(Value::Int(i))
    }

    pub fn bool(b: bool) -> Self {
        Expr::Literal(Value::Bool(b))
    }

    pub fn double(d: f64) -> Self {
        Expr::Literal(Value::Double(d))
    }

    pub fn var(name: impl Into<String>, index: usize) -> Self {
        Expr::Var { name: name.into(), index }
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Expr::Const(name.into())
    }

    pub fn not(e: Self) -> Self {
        match e {
            Expr::Unary(UnOp::Not, inner) => *inner,
            _ => Expr::Unary(UnOp::Not, Box::new(e)),
        }
    }

    pub fn neg(e: Self) -> Self {
        Expr::Unary(UnOp::Neg, Box::new(e))
    }

    pub fn binary(op: BinOp, lhs: Self, rhs: Self) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn add(lhs: Self, rhs: Self) -> Self {
        Self::binary(BinOp::Add, lhs, rhs)
    }

    pub fn sub(lhs: Self, rhs: Self) -> Self {
        Self::binary(BinOp::Sub, lhs, rhs)
    }

    pub fn mul(lhs: Self, rhs: Self) -> Self {
        Self::binary(BinOp::Mul, lhs, rhs)
    }

    pub fn eq(lhs: Self, rhs: Self) -> Self {
        Self::binary(BinOp::Eq, lhs, rhs)
    }

    pub fn and(lhs: Self, rhs: Self) -> Self {
        Self::binary(BinOp::And, lhs, rhs)
    }

    pub fn or(lhs: Self, rhs: Self) -> Self {
        Self::binary(BinOp::Or, lhs, rhs)
    }

    pub fn ite(cond: Self, then: Self, else_: Self) -> Self {
        Expr::Ite(Box::new(cond), Box::new(then), Box::new(else_))
    }

    /// Evaluates the expression in the given context.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> EvalResult<Value> {
        match self {
            Expr::Literal(v) => Ok(*v),
            Expr::Var { name, index } => ctx
                .state
                .and_then(|s| s.get(*index))
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
            Expr::Const(name) => ctx
                .constants
                .and_then(|c| c.get(name).copied())
                .ok_or_else(|| EvalError::UndefinedConstant(name.clone())),
            Expr::Unary(UnOp::Not, e) => Ok(Value::Bool(!e.evaluate(ctx)?.as_bool()?)),
            Expr::Unary(UnOp::Neg, e) => match e.evaluate(ctx)? {
                Value::Int(i) => Ok(Value::Int(-i)),
                v => Ok(Value::Double(-v.as_double()?)),
            },
            Expr::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, ctx),
            Expr::Ite(c, t, e) => {
                if c.evaluate(ctx)?.as_bool()? {
                    t.evaluate(ctx)
                } else {
                    e.evaluate(ctx)
                }
            }
        }
    }

    /// Evaluates a boolean expression.
    pub fn evaluate_bool(&self, ctx: &EvalContext<'_>) -> EvalResult<bool> {
        self.evaluate(ctx)?.as_bool()
    }
}

fn eval_binary(op: BinOp, lhs: &Expr, rhs: &Expr, ctx: &EvalContext<'_>) -> EvalResult<Value> {
    // Short-circuit the boolean connectives
    match op {
        BinOp::And => {
            return Ok(Value::Bool(lhs.evaluate_bool(ctx)? && rhs.evaluate_bool(ctx)?));
        }
        BinOp::Or => {
            return Ok(Value::Bool(lhs.evaluate_bool(ctx)? || rhs.evaluate_bool(ctx)?));
        }
        BinOp::Implies => {
            return Ok(Value::Bool(!lhs.evaluate_bool(ctx)? || rhs.evaluate_bool(ctx)?));
        }
        _ => {}
    }

    let a = lhs.evaluate(ctx)?;
    let b = rhs.evaluate(ctx)?;

    match op {
        BinOp::Eq | BinOp::Ne => {
            let equal = match (a, b) {
                (Value::Bool(x), Value::Bool(y)) => x == y,
                (Value::Int(x), Value::Int(y)) => x == y,
                _ => a.as_double()? == b.as_double()?,
            };
            Ok(Value::Bool(if op == BinOp::Eq { equal } else { !equal }))
        }
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let (x, y) = (a.as_double()?, b.as_double()?);
            Ok(Value::Bool(match op {
                BinOp::Lt => x < y,
                BinOp::Le => x <= y,
                BinOp::Gt => x > y,
                _ => x >= y,
            }))
        }
        BinOp::Div => {
            let y = b.as_double()?;
            if y == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Double(a.as_double()? / y))
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul => match (a, b) {
            (Value::Int(x), Value::Int(y)) => Ok(Value::Int(match op {
                BinOp::Add => x + y,
                BinOp::Sub => x - y,
                _ => x * y,
            })),
            _ => {
                let (x, y) = (a.as_double()?, b.as_double()?);
                Ok(Value::Double(match op {
                    BinOp::Add => x + y,
                    BinOp::Sub => x - y,
                    _ => x * y,
                }))
            }
        },
        BinOp::And | BinOp::Or | BinOp::Implies => unreachable!("handled above"),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Var { name, .. } => write!(f, "{}", name),
            Expr::Const(name) => write!(f, "{}", name),
            Expr::Unary(UnOp::Not, e) => write!(f, "!{}", e),
            Expr::Unary(UnOp::Neg, e) => write!(f, "-{}", e),
            Expr::Binary(op, lhs, rhs) => write!(f, "({}{}{})", lhs, op.symbol(), rhs),
            Expr::Ite(c, t, e) => write!(f, "({} ? {} : {})", c, t, e),
        }
    }
}

/// Variable and constant valuations an expression is evaluated against.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext<'a> {
    pub state: Option<&'a State>,
    pub constants: Option<&'a Constants>,
}

impl<'a> EvalContext<'a> {
    pub fn new(state: &'a State, constants: &'a Constants) -> Self {
        Self {
            state: Some(state),
            constants: Some(constants),
        }
    }

    pub fn with_state(state: &'a State) -> Self {
        Self {
            state: Some(state),
            constants: None,
        }
    }
}
