//! The expression language used by `{{ ... }}` templates and extension
//! `generate` sources.
//!
//! The resolution pipeline only depends on the [`Evaluator`] trait: feed it
//! a source string plus named bindings, get back a [`Value`] or an error.
//! [`Interpreter`] is the shipped backend, a small Lua-flavoured language:
//!
//! ```text
//! return "volumes:\n  - /data:" .. size .. ":/cache"
//! if debug then "1" else "0" end
//! upper(env("STAGE", "dev")) .. "-" .. __service__
//! ```
//!
//! Only `nil` and `false` are falsy; `and`/`or` return one of their
//! operands, so `cond and a or b` works as a conditional.

pub mod ast;
mod eval;
pub mod lexer;
pub mod parser;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::env::EnvSource;

/// A value produced or consumed by the expression language.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Absence of a value.
    Nil,
    /// A boolean.
    Bool(bool),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A string.
    Str(String),
    /// A list of values.
    List(Vec<Value>),
}

impl Value {
    /// Returns the Lua-style truthiness of the value.
    #[must_use]
    pub const fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }

    /// Returns the name of the value's type, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
        }
    }
}

/// Renders the value the way it is substituted into a document:
/// strings verbatim, booleans as `true`/`false`, integers in decimal,
/// floats in their shortest round-trippable form, nil as an empty string,
/// and lists as JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
            Self::List(_) => match serde_json::to_string(self) {
                Ok(json) => f.write_str(&json),
                Err(_) => write!(f, "{self:?}"),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// Named values visible to an expression.
pub type Bindings = BTreeMap<String, Value>;

/// Errors raised while lexing, parsing, or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// The source contains characters that cannot be tokenized.
    #[error("lexer error: {0}")]
    Lex(String),
    /// The token stream is not a valid expression.
    #[error("syntax error: {0}")]
    Parse(String),
    /// A name is referenced without being bound.
    #[error("undefined variable: {0}")]
    UnboundVariable(String),
    /// A function name is not a known builtin.
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    /// A builtin was called with the wrong number of arguments.
    #[error("{function} expects {expected} argument(s), got {got}")]
    Arity {
        /// Builtin name.
        function: String,
        /// Accepted argument count(s).
        expected: &'static str,
        /// Supplied argument count.
        got: usize,
    },
    /// An operator or builtin received a value of the wrong type.
    #[error("type error: {0}")]
    Type(String),
    /// Integer arithmetic overflowed or divided by zero.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
}

/// Evaluates expression source against a set of bindings.
///
/// This is the only contract the resolution pipeline relies on, so tests
/// and embedders can substitute their own backend.
pub trait Evaluator {
    /// Evaluates `source` with `bindings` in scope. Environment lookups
    /// made by the expression go through `env`, the same source the
    /// pipeline uses for `$VAR` substitution.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is malformed or evaluation fails.
    fn evaluate(
        &self,
        source: &str,
        bindings: &Bindings,
        env: &dyn EnvSource,
    ) -> Result<Value, ExprError>;
}

/// The built-in tree-walking interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter;

impl Interpreter {
    /// Creates an interpreter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Evaluator for Interpreter {
    fn evaluate(
        &self,
        source: &str,
        bindings: &Bindings,
        env: &dyn EnvSource,
    ) -> Result<Value, ExprError> {
        let expr = parser::parse(source)?;
        tracing::trace!(source, "evaluating expression");
        eval::eval(&expr, bindings, env)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn display_follows_substitution_rules() {
        assert_eq!(Value::Str("plain".into()).to_string(), "plain");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int(-42).to_string(), "-42");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Float(2.0).to_string(), "2");
        assert_eq!(Value::Float(0.1).to_string(), "0.1");
        assert_eq!(Value::Nil.to_string(), "");
    }

    #[test]
    fn display_renders_lists_as_json() {
        let list = Value::List(vec![Value::Int(1), Value::Str("a".into()), Value::Nil]);
        assert_eq!(list.to_string(), r#"[1,"a",null]"#);
    }

    #[test]
    fn truthiness_matches_lua() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::Str(String::new()).is_truthy());
    }

    #[test]
    fn interpreter_evaluates_with_bindings() {
        let mut bindings = Bindings::new();
        let _ = bindings.insert("size".into(), Value::Int(512));
        let out = Interpreter::new()
            .evaluate(
                r#"return "/data:" .. size .. ":/cache""#,
                &bindings,
                &HashMap::new(),
            )
            .expect("evaluate");
        assert_eq!(out, Value::Str("/data:512:/cache".into()));
    }
}
