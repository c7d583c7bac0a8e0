//! Environment-variable interpolation and `{{ ... }}` expression evaluation
//! over every string value of every service.
//!
//! Each string goes through two passes in a fixed order:
//!
//! 1. `$NAME` / `${NAME}` tokens are replaced from the environment. Every
//!    missing variable is collected and the whole resolution fails, naming
//!    all of them.
//! 2. Each `{{ ... }}` span is evaluated. A failing expression is reported
//!    with a warning and left in place so the rest of the document still
//!    resolves.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_yaml::Value;
use xdocker_common::constants::{FILE_BINDING, SERVICE_BINDING};
use xdocker_common::error::{Result, XDockerError};

use crate::env::EnvSource;
use crate::expr::{Bindings, Evaluator};
use crate::model::{ComposeFile, key_string};

static ENV_REGEX: OnceLock<Regex> = OnceLock::new();
static EXPR_REGEX: OnceLock<Regex> = OnceLock::new();

#[allow(clippy::expect_used)]
fn env_regex() -> &'static Regex {
    ENV_REGEX.get_or_init(|| {
        Regex::new(r"\$(\w+)|\$\{(\w+)\}").expect("static regex pattern is valid")
    })
}

#[allow(clippy::expect_used)]
fn expr_regex() -> &'static Regex {
    EXPR_REGEX
        .get_or_init(|| Regex::new(r"\{\{(.+?)\}\}").expect("static regex pattern is valid"))
}

/// Rewrites the string values of a document in place.
pub struct TemplateResolver<'a> {
    evaluator: &'a dyn Evaluator,
    env: &'a dyn EnvSource,
}

impl<'a> TemplateResolver<'a> {
    /// Creates a resolver reading variables from `env` and evaluating
    /// expressions with `evaluator`.
    #[must_use]
    pub fn new(evaluator: &'a dyn Evaluator, env: &'a dyn EnvSource) -> Self {
        Self { evaluator, env }
    }

    /// Resolves every string reachable from every service definition.
    ///
    /// Expressions see the bindings `__file__` (the compose file path) and
    /// `__service__` (the owning service name).
    ///
    /// # Errors
    ///
    /// Returns [`XDockerError::MissingEnvVars`] if a string references a
    /// variable that is not set.
    pub fn resolve(&self, config: &mut ComposeFile) -> Result<()> {
        let file = config.filename.display().to_string();
        for (name, service) in config.services_mut() {
            tracing::debug!(service = %name, "resolving templates");
            let mut bindings = Bindings::new();
            let _ = bindings.insert(FILE_BINDING.into(), file.clone().into());
            let _ = bindings.insert(SERVICE_BINDING.into(), name.clone().into());
            let scope = Scope {
                service: &name,
                bindings: &bindings,
            };
            for (key, value) in service.iter_mut() {
                self.resolve_value(value, &key_string(key), &scope)?;
            }
        }
        Ok(())
    }

    fn resolve_value(&self, value: &mut Value, field: &str, scope: &Scope<'_>) -> Result<()> {
        match value {
            Value::String(text) => {
                *text = self.resolve_string(text, field, scope)?;
            }
            Value::Sequence(items) => {
                for (idx, item) in items.iter_mut().enumerate() {
                    self.resolve_value(item, &format!("{field}[{idx}]"), scope)?;
                }
            }
            Value::Mapping(map) => {
                for (key, item) in map.iter_mut() {
                    self.resolve_value(item, &format!("{field}.{}", key_string(key)), scope)?;
                }
            }
            Value::Tagged(tagged) => self.resolve_value(&mut tagged.value, field, scope)?,
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
        Ok(())
    }

    fn resolve_string(&self, text: &str, field: &str, scope: &Scope<'_>) -> Result<String> {
        let substituted =
            substitute_env(text, self.env).map_err(|names| XDockerError::MissingEnvVars {
                service: scope.service.to_string(),
                field: field.to_string(),
                names,
            })?;
        Ok(self.substitute_expressions(&substituted, field, scope))
    }

    fn substitute_expressions(&self, text: &str, field: &str, scope: &Scope<'_>) -> String {
        expr_regex()
            .replace_all(text, |caps: &Captures<'_>| {
                let source = &caps[1];
                match self.evaluator.evaluate(source, scope.bindings, self.env) {
                    Ok(value) => value.to_string(),
                    Err(e) => {
                        tracing::warn!(
                            service = scope.service,
                            field,
                            expression = source.trim(),
                            error = %e,
                            "expression evaluation failed, keeping original text"
                        );
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }
}

/// Per-service context shared by every string of the service.
struct Scope<'a> {
    service: &'a str,
    bindings: &'a Bindings,
}

/// Replaces `$NAME` and `${NAME}` tokens from `env`.
///
/// Returns the names of every missing variable, deduplicated in order of
/// first appearance, when at least one is not set.
pub fn substitute_env(
    text: &str,
    env: &dyn EnvSource,
) -> std::result::Result<String, Vec<String>> {
    let mut missing: Vec<String> = Vec::new();
    let out = env_regex().replace_all(text, |caps: &Captures<'_>| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        env.var(name).unwrap_or_else(|| {
            if !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
            caps[0].to_string()
        })
    });
    if missing.is_empty() {
        Ok(out.into_owned())
    } else {
        Err(missing)
    }
}
