//! Formula language for derived fields
//!
//! A small closed expression grammar: arithmetic, comparison, logic, a
//! conditional operator and a fixed function library. A formula can only see
//! the variables it is handed; there is no I/O and no way to reach host code.
//!
//! ```text
//! expr     := or ( "?" expr ":" expr )?
//! or       := and ( ("or" | "||") and )*
//! and      := not ( ("and" | "&&") not )*
//! not      := ("not" | "!") not | compare
//! compare  := concat ( ("==" | "!=" | "<" | "<=" | ">" | ">=") concat )?
//! concat   := additive ( "&" additive )*
//! additive := term ( ("+" | "-") term )*
//! term     := unary ( ("*" | "/" | "%") unary )*
//! unary    := ("-" | "+") unary | power
//! power    := primary ( "^" unary )?
//! primary  := NUMBER | STRING | "true" | "false" | IDENT | IDENT "(" args ")" | "(" expr ")"
//! ```
//!
//! Nesting is limited to 64 levels and a formula to 256 operators; longer
//! input is a syntax error rather than unbounded recursion.

mod eval;
mod lexer;
mod parser;

pub use eval::{Environment, Value};

use std::fmt;
use thiserror::Error;

/// Why a formula could not be parsed or evaluated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("function `{name}` expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },

    #[error("type error: {0}")]
    Type(String),

    #[error("result is not a finite number")]
    NonFinite,
}

impl FormulaError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }
}

/// A parsed formula, ready to evaluate against any number of environments
#[derive(Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: parser::Expr,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        Ok(Self {
            source: source.to_string(),
            expr: parser::parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, env: &Environment) -> Result<Value, FormulaError> {
        eval::evaluate(&self.expr, env)
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Formula").field(&self.source).finish()
    }
}

/// Parse and evaluate in one step
pub fn evaluate(source: &str, env: &Environment) -> Result<Value, FormulaError> {
    Formula::parse(source)?.evaluate(env)
}
