//! Expansion of extension fields into compose fields.

use serde_yaml::{Mapping, Value as Yaml};
use xdocker_common::constants::{FILE_BINDING, SERVICE_BINDING};
use xdocker_common::error::{Result, XDockerError};

use super::{ArgType, Argument, Extension, ExtensionRegistry};
use crate::env::EnvSource;
use crate::expr::{Bindings, Evaluator, Value};
use crate::model::{ComposeFile, render_plain, value_kind};

/// Expands every extension field of every service.
///
/// Services are visited in document order and extensions in registry order.
/// A matched field is removed from the service and replaced by the keys of
/// the mapping the extension generates.
///
/// # Errors
///
/// Returns an error if an argument cannot be coerced to its declared type,
/// the `generate` expression fails, or its result is not a YAML mapping.
pub fn dispatch(
    config: &mut ComposeFile,
    registry: &ExtensionRegistry,
    evaluator: &dyn Evaluator,
    env: &dyn EnvSource,
) -> Result<()> {
    let file = config.filename.display().to_string();
    for (service_name, service) in config.services_mut() {
        for extension in registry.iter() {
            let Some(field) = extension.service_field() else {
                tracing::debug!(
                    extension = %extension.name,
                    path = %extension.path,
                    "extension path does not target a service field, ignoring"
                );
                continue;
            };
            let Some(captured) = service.shift_remove(field) else {
                continue;
            };

            tracing::debug!(
                extension = %extension.name,
                service = %service_name,
                field,
                "applying extension"
            );
            let context = Context {
                extension,
                service: &service_name,
                file: &file,
                env,
            };
            let generated = context.run(&render_plain(&captured), evaluator)?;
            for (key, value) in generated {
                let _ = service.insert(key, value);
            }
        }
    }
    Ok(())
}

/// One application of one extension to one service.
struct Context<'a> {
    extension: &'a Extension,
    service: &'a str,
    file: &'a str,
    env: &'a dyn EnvSource,
}

impl Context<'_> {
    fn run(&self, captured: &str, evaluator: &dyn Evaluator) -> Result<Mapping> {
        let bindings = self.bind(captured)?;
        let result = evaluator
            .evaluate(self.extension.expression(), &bindings, self.env)
            .map_err(|e| XDockerError::Expression {
                extension: self.extension.name.clone(),
                service: self.service.to_string(),
                message: e.to_string(),
            })?;
        self.parse_result(&result.to_string())
    }

    fn bind(&self, captured: &str) -> Result<Bindings> {
        let mut bindings = Bindings::new();
        for (name, argument) in &self.extension.arguments {
            let value = self.coerce(name, argument, captured)?;
            let _ = bindings.insert(name.clone(), value);
        }
        let _ = bindings.insert(FILE_BINDING.into(), self.file.into());
        let _ = bindings.insert(SERVICE_BINDING.into(), self.service.into());
        Ok(bindings)
    }

    fn coerce(&self, name: &str, argument: &Argument, captured: &str) -> Result<Value> {
        let text = captured.trim();
        match argument.kind {
            ArgType::String => Ok(Value::Str(captured.to_string())),
            ArgType::Bool => Ok(Value::Bool(matches!(
                text.to_ascii_lowercase().as_str(),
                "true" | "1" | "yes"
            ))),
            ArgType::Int => text
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| self.coercion_error(name, argument.kind, captured)),
            ArgType::Float => text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.coercion_error(name, argument.kind, captured)),
            ArgType::Env => Ok(self.read_env(name, argument)),
        }
    }

    /// `variable` (or the argument name), then `fallback`, then the literal
    /// `default`, else nil.
    fn read_env(&self, name: &str, argument: &Argument) -> Value {
        let primary = argument.variable.as_deref().unwrap_or(name);
        self.env
            .var(primary)
            .or_else(|| argument.fallback.as_deref().and_then(|v| self.env.var(v)))
            .map(Value::Str)
            .or_else(|| argument.default.as_ref().map(from_yaml))
            .unwrap_or(Value::Nil)
    }

    fn coercion_error(&self, argument: &str, kind: ArgType, value: &str) -> XDockerError {
        XDockerError::TypeCoercion {
            extension: self.extension.name.clone(),
            service: self.service.to_string(),
            argument: argument.to_string(),
            expected: kind.as_str(),
            value: value.to_string(),
        }
    }

    fn parse_result(&self, rendered: &str) -> Result<Mapping> {
        if rendered.trim().is_empty() {
            return Ok(Mapping::new());
        }
        let result_error = |message: String| XDockerError::ExtensionResult {
            extension: self.extension.name.clone(),
            message,
            output: rendered.to_string(),
        };
        match serde_yaml::from_str::<Yaml>(rendered) {
            Ok(Yaml::Mapping(map)) => Ok(map),
            Ok(Yaml::Null) => Ok(Mapping::new()),
            Ok(other) => Err(result_error(format!(
                "expected a mapping, found {}",
                value_kind(&other)
            ))),
            Err(e) => Err(result_error(e.to_string())),
        }
    }
}

/// Converts a literal from an extension file into an expression value.
fn from_yaml(value: &Yaml) -> Value {
    match value {
        Yaml::Null => Value::Nil,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or_else(|| Value::Str(n.to_string())),
        Yaml::String(s) => Value::Str(s.clone()),
        Yaml::Sequence(items) => Value::List(items.iter().map(from_yaml).collect()),
        Yaml::Tagged(tagged) => from_yaml(&tagged.value),
        Yaml::Mapping(_) => Value::Str(render_plain(value)),
    }
}
