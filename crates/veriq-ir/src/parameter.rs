//! Symbolic gate parameters.
//!
//! Rotation angles may be left symbolic while a circuit is constructed and
//! bound to concrete values later. The equivalence checker instantiates all
//! free variables before running its variable-free flow, so the expression
//! language is deliberately small.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fmt;

/// A gate parameter: a concrete angle or a symbolic expression over free
/// variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Parameter {
    /// A concrete value in radians.
    Value(f64),
    /// A free variable.
    Variable(String),
    /// The constant π.
    Pi,
    /// Negation of a sub-expression.
    Neg(Box<Parameter>),
    /// Sum of two sub-expressions.
    Add(Box<Parameter>, Box<Parameter>),
    /// Product of a sub-expression with a constant factor.
    Scale(f64, Box<Parameter>),
}

impl Parameter {
    /// Create a concrete parameter.
    pub fn value(v: f64) -> Self {
        Parameter::Value(v)
    }

    /// Create a free variable.
    pub fn variable(name: impl Into<String>) -> Self {
        Parameter::Variable(name.into())
    }

    /// Check whether the expression contains any free variable.
    pub fn is_symbolic(&self) -> bool {
        match self {
            Parameter::Variable(_) => true,
            Parameter::Value(_) | Parameter::Pi => false,
            Parameter::Neg(e) | Parameter::Scale(_, e) => e.is_symbolic(),
            Parameter::Add(a, b) => a.is_symbolic() || b.is_symbolic(),
        }
    }

    /// Evaluate to a concrete angle, or `None` if a variable is unbound.
    pub fn evaluate(&self) -> Option<f64> {
        match self {
            Parameter::Value(v) => Some(*v),
            Parameter::Variable(_) => None,
            Parameter::Pi => Some(PI),
            Parameter::Neg(e) => e.evaluate().map(|v| -v),
            Parameter::Add(a, b) => Some(a.evaluate()? + b.evaluate()?),
            Parameter::Scale(c, e) => e.evaluate().map(|v| c * v),
        }
    }

    /// Collect the names of all free variables into `vars`.
    pub fn collect_variables(&self, vars: &mut BTreeSet<String>) {
        match self {
            Parameter::Value(_) | Parameter::Pi => {}
            Parameter::Variable(name) => {
                vars.insert(name.clone());
            }
            Parameter::Neg(e) | Parameter::Scale(_, e) => e.collect_variables(vars),
            Parameter::Add(a, b) => {
                a.collect_variables(vars);
                b.collect_variables(vars);
            }
        }
    }

    /// Substitute every occurrence of `name` by `value`, returning the
    /// (partially) bound expression.
    pub fn bind(&self, name: &str, value: f64) -> Self {
        match self {
            Parameter::Variable(n) if n == name => Parameter::Value(value),
            Parameter::Value(_) | Parameter::Pi | Parameter::Variable(_) => self.clone(),
            Parameter::Neg(e) => Parameter::Neg(Box::new(e.bind(name, value))),
            Parameter::Scale(c, e) => Parameter::Scale(*c, Box::new(e.bind(name, value))),
            Parameter::Add(a, b) => {
                Parameter::Add(Box::new(a.bind(name, value)), Box::new(b.bind(name, value)))
            }
        }
    }

    /// Collapse the expression to a `Value` if it evaluates.
    pub fn simplified(&self) -> Self {
        match self.evaluate() {
            Some(v) => Parameter::Value(v),
            None => self.clone(),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Value(v) => write!(f, "{v}"),
            Parameter::Variable(name) => write!(f, "{name}"),
            Parameter::Pi => write!(f, "pi"),
            Parameter::Neg(e) => write!(f, "-({e})"),
            Parameter::Add(a, b) => write!(f, "({a} + {b})"),
            Parameter::Scale(c, e) => write!(f, "{c}*({e})"),
        }
    }
}

impl From<f64> for Parameter {
    fn from(value: f64) -> Self {
        Parameter::Value(value)
    }
}

impl std::ops::Neg for Parameter {
    type Output = Self;

    fn neg(self) -> Self::Output {
        match self {
            Parameter::Value(v) => Parameter::Value(-v),
            Parameter::Neg(e) => *e,
            other => Parameter::Neg(Box::new(other)),
        }
    }
}

impl std::ops::Add for Parameter {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Parameter::Add(Box::new(self), Box::new(rhs)).simplified()
    }
}
