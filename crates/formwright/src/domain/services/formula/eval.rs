use std::collections::HashMap;
use std::fmt;

use super::parser::{BinaryOp, Expr};
use super::FormulaError;
use crate::domain::value_objects::field_value::format_number;

/// Runtime value inside a formula
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Bool(_) => "boolean",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Number(n) => *n != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::Bool(b) => *b,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Variables visible to a formula
#[derive(Clone, Debug, Default)]
pub struct Environment {
    vars: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.vars.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    fn lookup(&self, name: &str) -> Result<Value, FormulaError> {
        if let Some(value) = self.vars.get(name) {
            return Ok(value.clone());
        }
        match name {
            "PI" => Ok(Value::Number(std::f64::consts::PI)),
            "E" => Ok(Value::Number(std::f64::consts::E)),
            _ => Err(FormulaError::UnknownVariable(name.to_string())),
        }
    }
}

pub(crate) fn evaluate(expr: &Expr, env: &Environment) -> Result<Value, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::Text(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Var(name) => env.lookup(name),
        Expr::Neg(operand) => {
            let n = number(evaluate(operand, env)?, "-")?;
            Ok(Value::Number(-n))
        }
        Expr::Not(operand) => Ok(Value::Bool(!evaluate(operand, env)?.is_truthy())),
        Expr::And(lhs, rhs) => {
            let result = evaluate(lhs, env)?.is_truthy() && evaluate(rhs, env)?.is_truthy();
            Ok(Value::Bool(result))
        }
        Expr::Or(lhs, rhs) => {
            let result = evaluate(lhs, env)?.is_truthy() || evaluate(rhs, env)?.is_truthy();
            Ok(Value::Bool(result))
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            if evaluate(cond, env)?.is_truthy() {
                evaluate(then, env)
            } else {
                evaluate(otherwise, env)
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = evaluate(lhs, env)?;
            let rhs = evaluate(rhs, env)?;
            binary(*op, lhs, rhs)
        }
        Expr::Call { name, args } => call(name, args, env),
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, FormulaError> {
    match op {
        BinaryOp::Concat => Ok(Value::Text(format!("{lhs}{rhs}"))),
        BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::Ne => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
                _ => None,
            }
            .ok_or_else(|| mismatch(op, &lhs, &rhs))?;
            let result = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(result))
        }
        _ => {
            let (a, b) = match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => (*a, *b),
                _ => return Err(mismatch(op, &lhs, &rhs)),
            };
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                _ => a.powf(b),
            };
            finite(result)
        }
    }
}

fn call(name: &str, args: &[Expr], env: &Environment) -> Result<Value, FormulaError> {
    // `if` only evaluates the branch it picks
    if name == "if" {
        let [cond, then, otherwise] = args else {
            return Err(arity(name, "3", args.len()));
        };
        return if evaluate(cond, env)?.is_truthy() {
            evaluate(then, env)
        } else {
            evaluate(otherwise, env)
        };
    }

    let values = args
        .iter()
        .map(|arg| evaluate(arg, env))
        .collect::<Result<Vec<_>, _>>()?;

    match name {
        "abs" => unary_math(name, values, f64::abs),
        "ceil" => unary_math(name, values, f64::ceil),
        "floor" => unary_math(name, values, f64::floor),
        "trunc" => unary_math(name, values, f64::trunc),
        "sqrt" => unary_math(name, values, f64::sqrt),
        "exp" => unary_math(name, values, f64::exp),
        "ln" => unary_math(name, values, f64::ln),
        "log10" => unary_math(name, values, f64::log10),
        "sign" => unary_math(name, values, |n| if n == 0.0 { 0.0 } else { n.signum() }),
        "round" => match values.as_slice() {
            [x] => finite(round_half_up(number(x.clone(), name)?, 0)),
            [x, digits] => {
                let digits = number(digits.clone(), name)?;
                finite(round_half_up(number(x.clone(), name)?, digits as i32))
            }
            _ => Err(arity(name, "1 or 2", values.len())),
        },
        "pow" => match values.as_slice() {
            [base, exponent] => {
                finite(number(base.clone(), name)?.powf(number(exponent.clone(), name)?))
            }
            _ => Err(arity(name, "2", values.len())),
        },
        "min" | "max" => {
            if values.is_empty() {
                return Err(arity(name, "at least 1", 0));
            }
            let numbers = values
                .into_iter()
                .map(|v| number(v, name))
                .collect::<Result<Vec<_>, _>>()?;
            let pick: fn(f64, f64) -> f64 = if name == "min" { f64::min } else { f64::max };
            finite(numbers.into_iter().fold(
                if name == "min" { f64::INFINITY } else { f64::NEG_INFINITY },
                pick,
            ))
        }
        "length" => match values.as_slice() {
            [v] => Ok(Value::Number(v.to_string().chars().count() as f64)),
            _ => Err(arity(name, "1", values.len())),
        },
        "lower" => unary_text(name, values, |s| s.to_lowercase()),
        "upper" => unary_text(name, values, |s| s.to_uppercase()),
        "trim" => unary_text(name, values, |s| s.trim().to_string()),
        "concat" => Ok(Value::Text(
            values.iter().map(Value::to_string).collect::<String>(),
        )),
        _ => Err(FormulaError::UnknownFunction(name.to_string())),
    }
}

fn unary_math(name: &str, values: Vec<Value>, f: impl Fn(f64) -> f64) -> Result<Value, FormulaError> {
    match <[Value; 1]>::try_from(values) {
        Ok([v]) => finite(f(number(v, name)?)),
        Err(values) => Err(arity(name, "1", values.len())),
    }
}

fn unary_text(name: &str, values: Vec<Value>, f: impl Fn(&str) -> String) -> Result<Value, FormulaError> {
    match <[Value; 1]>::try_from(values) {
        Ok([v]) => Ok(Value::Text(f(&v.to_string()))),
        Err(values) => Err(arity(name, "1", values.len())),
    }
}

/// Half-way cases round toward positive infinity
fn round_half_up(x: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (x * scale + 0.5).floor() / scale
}

fn number(value: Value, context: &str) -> Result<f64, FormulaError> {
    match value {
        Value::Number(n) => Ok(n),
        other => Err(FormulaError::Type(format!(
            "`{context}` expects a number, got {} {:?}",
            other.type_name(),
            other.to_string()
        ))),
    }
}

fn finite(n: f64) -> Result<Value, FormulaError> {
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err(FormulaError::NonFinite)
    }
}

fn mismatch(op: BinaryOp, lhs: &Value, rhs: &Value) -> FormulaError {
    FormulaError::Type(format!(
        "cannot apply `{}` to {} and {}",
        op.symbol(),
        lhs.type_name(),
        rhs.type_name()
    ))
}

fn arity(name: &str, expected: &'static str, found: usize) -> FormulaError {
    FormulaError::Arity {
        name: name.to_string(),
        expected,
        found,
    }
}

#[cfg(test)]
mod tests {
    use super::super::{evaluate, Formula};
    use super::*;

    fn eval(source: &str) -> Result<Value, FormulaError> {
        let mut env = Environment::new();
        env.bind("a", Value::Number(3.0))
            .bind("b", Value::Number(4.0))
            .bind("name", Value::Text("Ada".into()));
        evaluate(source, &env)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("a + b * 2"), Ok(Value::Number(11.0)));
        assert_eq!(eval("(a + b) * 2"), Ok(Value::Number(14.0)));
        assert_eq!(eval("-a ^ 2"), Ok(Value::Number(-9.0)));
        assert_eq!(eval("(-a) ^ 2"), Ok(Value::Number(9.0)));
        assert_eq!(eval("2 ^ -1"), Ok(Value::Number(0.5)));
        assert_eq!(eval("2 ^ 3 ^ 2"), Ok(Value::Number(512.0)));
        assert_eq!(eval("b % a"), Ok(Value::Number(1.0)));
        assert_eq!(eval("sqrt(a * a + b * b)"), Ok(Value::Number(5.0)));
    }

    #[test]
    fn test_comparison_and_logic() {
        assert_eq!(eval("a < b and b < 10"), Ok(Value::Bool(true)));
        assert_eq!(eval("a == 3 || nosuch"), Ok(Value::Bool(true)));
        assert_eq!(eval("not (a > b)"), Ok(Value::Bool(true)));
        assert_eq!(eval("name == 'Ada'"), Ok(Value::Bool(true)));
        assert_eq!(eval("name == 3"), Ok(Value::Bool(false)));
        assert!(matches!(eval("name < 3"), Err(FormulaError::Type(_))));
    }

    #[test]
    fn test_conditional_is_lazy() {
        assert_eq!(eval("a > 1 ? 'big' : nosuch"), Ok(Value::Text("big".into())));
        assert_eq!(eval("if(a > 10, nosuch, 'small')"), Ok(Value::Text("small".into())));
        assert_eq!(
            eval("if(1, 2)"),
            Err(FormulaError::Arity {
                name: "if".into(),
                expected: "3",
                found: 2
            })
        );
    }

    #[test]
    fn test_text_functions() {
        assert_eq!(eval("'Hi ' & name & '!'"), Ok(Value::Text("Hi Ada!".into())));
        assert_eq!(eval("concat(name, '-', a)"), Ok(Value::Text("Ada-3".into())));
        assert_eq!(eval("upper(name)"), Ok(Value::Text("ADA".into())));
        assert_eq!(eval("length(trim('  xy '))"), Ok(Value::Number(2.0)));
    }

    #[test]
    fn test_math_functions() {
        assert_eq!(eval("round(2.5)"), Ok(Value::Number(3.0)));
        assert_eq!(eval("round(-2.5)"), Ok(Value::Number(-2.0)));
        assert_eq!(eval("round(1.2345, 2)"), Ok(Value::Number(1.23)));
        assert_eq!(eval("max(a, b, 1)"), Ok(Value::Number(4.0)));
        assert_eq!(eval("min(a)"), Ok(Value::Number(3.0)));
        assert_eq!(eval("floor(PI)"), Ok(Value::Number(3.0)));
        assert_eq!(eval("sign(-a)"), Ok(Value::Number(-1.0)));
    }

    #[test]
    fn test_errors() {
        assert_eq!(eval("zzz + 1"), Err(FormulaError::UnknownVariable("zzz".into())));
        assert_eq!(eval("system('ls')"), Err(FormulaError::UnknownFunction("system".into())));
        assert_eq!(eval("a / 0"), Err(FormulaError::NonFinite));
        assert_eq!(eval("sqrt(-1)"), Err(FormulaError::NonFinite));
        assert!(matches!(eval("name * 2"), Err(FormulaError::Type(_))));
        assert!(matches!(eval("abs()"), Err(FormulaError::Arity { .. })));
    }

    #[test]
    fn test_longest_chain_evaluates() {
        let sum = vec!["a"; super::super::parser::MAX_OPERATORS + 1].join(" + ");
        let expected = 3.0 * (super::super::parser::MAX_OPERATORS + 1) as f64;
        assert_eq!(eval(&sum), Ok(Value::Number(expected)));
    }

    #[test]
    fn test_variables_shadow_constants() {
        let mut env = Environment::new();
        env.bind("E", Value::Text("shadowed".into()));
        let formula = Formula::parse("E").unwrap();
        assert_eq!(formula.evaluate(&env), Ok(Value::Text("shadowed".into())));
        assert_eq!(formula.source(), "E");
    }
}
