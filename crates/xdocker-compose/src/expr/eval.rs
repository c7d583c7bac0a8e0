//! Tree-walking evaluation of parsed expressions and the builtin library.

use std::cmp::Ordering;
use std::path::Path;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::{Bindings, ExprError, Value};
use crate::env::EnvSource;

/// Evaluates an expression against the given bindings. `env()` reads
/// variables from `env`.
pub(super) fn eval(
    expr: &Expr,
    bindings: &Bindings,
    env: &dyn EnvSource,
) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Variable(name) => bindings
            .get(name)
            .cloned()
            .ok_or_else(|| ExprError::UnboundVariable(name.clone())),
        Expr::List(items) => items
            .iter()
            .map(|e| eval(e, bindings, env))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Unary(op, inner) => eval_unary(*op, eval(inner, bindings, env)?),
        Expr::Binary(op, lhs, rhs) => {
            eval_binary(*op, eval(lhs, bindings, env)?, eval(rhs, bindings, env)?)
        }
        Expr::And(lhs, rhs) => {
            let left = eval(lhs, bindings, env)?;
            if left.is_truthy() {
                eval(rhs, bindings, env)
            } else {
                Ok(left)
            }
        }
        Expr::Or(lhs, rhs) => {
            let left = eval(lhs, bindings, env)?;
            if left.is_truthy() {
                Ok(left)
            } else {
                eval(rhs, bindings, env)
            }
        }
        Expr::Call(name, args) => {
            let values = args
                .iter()
                .map(|e| eval(e, bindings, env))
                .collect::<Result<Vec<_>, _>>()?;
            call_builtin(name, &values, env)
        }
        Expr::If {
            cond,
            then,
            otherwise,
        } => {
            if eval(cond, bindings, env)?.is_truthy() {
                eval(then, bindings, env)
            } else {
                eval(otherwise, bindings, env)
            }
        }
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> Result<Value, ExprError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Neg => match to_number(&value)? {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| ExprError::Arithmetic("integer overflow".into())),
            Value::Float(x) => Ok(Value::Float(-x)),
            _ => not_a_number(),
        },
    }
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    match op {
        BinaryOp::Concat => Ok(Value::Str(format!(
            "{}{}",
            concat_operand(&lhs)?,
            concat_operand(&rhs)?
        ))),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, &to_number(&lhs)?, &to_number(&rhs)?)
        }
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        BinaryOp::NotEq => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        BinaryOp::Lt => compare(&lhs, &rhs).map(|o| Value::Bool(o == Ordering::Less)),
        BinaryOp::Le => compare(&lhs, &rhs).map(|o| Value::Bool(o != Ordering::Greater)),
        BinaryOp::Gt => compare(&lhs, &rhs).map(|o| Value::Bool(o == Ordering::Greater)),
        BinaryOp::Ge => compare(&lhs, &rhs).map(|o| Value::Bool(o != Ordering::Less)),
    }
}

fn concat_operand(value: &Value) -> Result<String, ExprError> {
    match value {
        Value::List(_) => Err(ExprError::Type("cannot concatenate a list".into())),
        other => Ok(other.to_string()),
    }
}

/// Coerces a value to a number; numeric strings are accepted.
fn to_number(value: &Value) -> Result<Value, ExprError> {
    match value {
        Value::Int(_) | Value::Float(_) => Ok(value.clone()),
        Value::Str(s) => parse_number(s).ok_or_else(|| {
            ExprError::Type(format!("cannot use non-numeric string {s:?} in arithmetic"))
        }),
        other => Err(ExprError::Type(format!(
            "cannot use {} in arithmetic",
            other.type_name()
        ))),
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    s.parse::<i64>()
        .map(Value::Int)
        .ok()
        .or_else(|| s.parse::<f64>().map(Value::Float).ok())
}

#[allow(clippy::cast_precision_loss)]
const fn as_float(value: &Value) -> f64 {
    match value {
        Value::Int(n) => *n as f64,
        Value::Float(x) => *x,
        _ => 0.0,
    }
}

fn not_a_number() -> Result<Value, ExprError> {
    Err(ExprError::Type("expected a number".into()))
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
    if op == BinaryOp::Div {
        let divisor = as_float(rhs);
        if divisor == 0.0 {
            return Err(ExprError::Arithmetic("division by zero".into()));
        }
        return Ok(Value::Float(as_float(lhs) / divisor));
    }

    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        let result = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Sub => a.checked_sub(*b),
            BinaryOp::Mul => a.checked_mul(*b),
            BinaryOp::Mod => {
                if *b == 0 {
                    return Err(ExprError::Arithmetic("modulo by zero".into()));
                }
                a.checked_rem_euclid(*b)
            }
            _ => None,
        };
        return result
            .map(Value::Int)
            .ok_or_else(|| ExprError::Arithmetic("integer overflow".into()));
    }

    let (a, b) = (as_float(lhs), as_float(rhs));
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(ExprError::Arithmetic("modulo by zero".into()));
            }
            a.rem_euclid(b)
        }
        _ => return not_a_number(),
    };
    Ok(Value::Float(result))
}

#[allow(clippy::float_cmp)]
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            as_float(lhs) == as_float(rhs)
        }
        _ => lhs == rhs,
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Result<Ordering, ExprError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => as_float(lhs)
            .partial_cmp(&as_float(rhs))
            .ok_or_else(|| ExprError::Type("cannot compare NaN".into())),
        _ => Err(ExprError::Type(format!(
            "cannot compare {} with {}",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn arity(function: &str, expected: &'static str, got: usize) -> ExprError {
    ExprError::Arity {
        function: function.to_string(),
        expected,
        got,
    }
}

fn expect_str<'a>(function: &str, value: &'a Value) -> Result<&'a str, ExprError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(ExprError::Type(format!(
            "{function} expects a string, got {}",
            other.type_name()
        ))),
    }
}

/// Dispatches a call to one of the builtin functions.
fn call_builtin(name: &str, args: &[Value], env: &dyn EnvSource) -> Result<Value, ExprError> {
    match (name, args) {
        ("upper", [v]) => Ok(Value::Str(v.to_string().to_uppercase())),
        ("lower", [v]) => Ok(Value::Str(v.to_string().to_lowercase())),
        ("trim", [v]) => Ok(Value::Str(v.to_string().trim().to_string())),
        ("tostring", [v]) => Ok(Value::Str(v.to_string())),
        ("tonumber", [v]) => Ok(match v {
            Value::Int(_) | Value::Float(_) => v.clone(),
            Value::Str(s) => parse_number(s).unwrap_or(Value::Nil),
            _ => Value::Nil,
        }),
        ("len", [v]) => {
            let n = match v {
                Value::Str(s) => s.chars().count(),
                Value::List(items) => items.len(),
                other => {
                    return Err(ExprError::Type(format!(
                        "len expects a string or list, got {}",
                        other.type_name()
                    )));
                }
            };
            i64::try_from(n)
                .map(Value::Int)
                .map_err(|_| ExprError::Arithmetic("length overflow".into()))
        }
        ("env", [var]) => Ok(env.var(expect_str("env", var)?).map_or(Value::Nil, Value::Str)),
        ("env", [var, fallback]) => Ok(env
            .var(expect_str("env", var)?)
            .map_or_else(|| fallback.clone(), Value::Str)),
        ("default", [v, fallback]) => Ok(match v {
            Value::Nil => fallback.clone(),
            Value::Str(s) if s.is_empty() => fallback.clone(),
            other => other.clone(),
        }),
        ("basename", [p]) => Ok(Path::new(expect_str("basename", p)?)
            .file_name()
            .map_or(Value::Str(String::new()), |n| {
                Value::Str(n.to_string_lossy().into_owned())
            })),
        ("dirname", [p]) => Ok(Path::new(expect_str("dirname", p)?)
            .parent()
            .map_or(Value::Str(String::new()), |d| {
                Value::Str(d.to_string_lossy().into_owned())
            })),
        ("replace", [s, from, to]) => Ok(Value::Str(
            s.to_string()
                .replace(expect_str("replace", from)?, &to.to_string()),
        )),
        ("contains", [Value::List(items), needle]) => {
            Ok(Value::Bool(items.iter().any(|i| values_equal(i, needle))))
        }
        ("contains", [haystack, needle]) => Ok(Value::Bool(
            haystack.to_string().contains(&needle.to_string()),
        )),
        ("join", [Value::List(items), sep]) => Ok(Value::Str(
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(&sep.to_string()),
        )),
        ("join", [other, _]) => Err(ExprError::Type(format!(
            "join expects a list, got {}",
            other.type_name()
        ))),
        ("upper" | "lower" | "trim" | "tostring" | "tonumber" | "len" | "basename"
        | "dirname", _) => Err(arity(name, "1", args.len())),
        ("env", _) => Err(arity(name, "1 or 2", args.len())),
        ("default" | "contains" | "join", _) => Err(arity(name, "2", args.len())),
        ("replace", _) => Err(arity(name, "3", args.len())),
        _ => Err(ExprError::UnknownFunction(name.to_string())),
    }
}
