//! Extensions: user-defined service fields expanded into plain compose
//! fields by an expression.
//!
//! An extension file looks like:
//!
//! ```yaml
//! name: cache
//! path: /$service/cache
//! arguments:
//!   size:
//!     type: int
//!     description: cache size in MiB
//! generate: |
//!   {{ return "volumes:\n  - /data:" .. size .. ":/cache" }}
//! ```
//!
//! A service carrying `cache: 512` has the field removed and the generated
//! mapping merged in instead.

pub mod dispatch;
pub mod registry;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

pub use dispatch::dispatch;
pub use registry::ExtensionRegistry;

/// Prefix every dispatchable extension path starts with.
pub const SERVICE_PATH_PREFIX: &str = "/$service/";

/// A single extension definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    /// Registry key. A later definition with the same name replaces an
    /// earlier one.
    pub name: String,
    /// Informational only.
    #[serde(default)]
    pub required: bool,
    /// Field the extension is attached to, as `/$service/<field>`.
    #[serde(default)]
    pub path: String,
    /// Declared arguments, bound by name when the expression runs.
    #[serde(default)]
    pub arguments: BTreeMap<String, Argument>,
    /// Expression source producing a YAML mapping.
    #[serde(default)]
    pub generate: String,
}

impl Extension {
    /// Returns the service field this extension handles, or `None` when the
    /// path is not of the `/$service/<field>` form.
    #[must_use]
    pub fn service_field(&self) -> Option<&str> {
        self.path
            .strip_prefix(SERVICE_PATH_PREFIX)
            .filter(|field| !field.is_empty() && !field.contains('/'))
    }

    /// Returns the `generate` source with an optional `{{ }}` wrapper
    /// removed.
    #[must_use]
    pub fn expression(&self) -> &str {
        let trimmed = self.generate.trim();
        trimmed
            .strip_prefix("{{")
            .and_then(|s| s.strip_suffix("}}"))
            .unwrap_or(trimmed)
    }
}

/// A declared extension argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// How the captured field value is coerced.
    #[serde(rename = "type", default)]
    pub kind: ArgType,
    /// Informational only.
    #[serde(default)]
    pub description: String,
    /// Informational only.
    #[serde(default)]
    pub required: bool,
    /// Literal used by `env` arguments when no variable is set.
    #[serde(default)]
    pub default: Option<Value>,
    /// Environment variable read by `env` arguments. Defaults to the
    /// argument name.
    #[serde(default)]
    pub variable: Option<String>,
    /// Second environment variable tried by `env` arguments.
    #[serde(default)]
    pub fallback: Option<String>,
}

/// Coercion applied to an argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    /// The captured text, unchanged.
    #[default]
    String,
    /// `true`, `1` or `yes` (any case) are true, anything else false.
    Bool,
    /// A 64-bit signed integer.
    Int,
    /// A 64-bit float.
    Float,
    /// Read from the environment; the captured text is ignored.
    Env,
}

impl ArgType {
    /// Returns the lowercase name used in extension files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Env => "env",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(doc: &str) -> Extension {
        serde_yaml::from_str(doc).expect("valid extension")
    }

    #[test]
    fn decodes_full_definition() {
        let ext = parse(
            "name: cache\nrequired: true\npath: /$service/cache\narguments:\n  size:\n    type: int\n    description: MiB\n  region:\n    type: env\n    variable: AWS_REGION\n    fallback: REGION\n    default: eu-west-1\ngenerate: '{{ size }}'\n",
        );
        assert_eq!(ext.name, "cache");
        assert!(ext.required);
        assert_eq!(ext.arguments["size"].kind, ArgType::Int);
        let region = &ext.arguments["region"];
        assert_eq!(region.kind, ArgType::Env);
        assert_eq!(region.variable.as_deref(), Some("AWS_REGION"));
        assert_eq!(region.fallback.as_deref(), Some("REGION"));
        assert_eq!(region.default, Some(Value::from("eu-west-1")));
    }

    #[test]
    fn argument_type_defaults_to_string() {
        let ext = parse("name: x\narguments:\n  a: {}\n");
        assert_eq!(ext.arguments["a"].kind, ArgType::String);
    }

    #[test]
    fn unknown_argument_type_is_rejected() {
        let result: Result<Extension, _> =
            serde_yaml::from_str("name: x\narguments:\n  a:\n    type: duration\n");
        assert!(result.is_err());
    }

    #[test]
    fn service_field_requires_service_prefix() {
        let mut ext = parse("name: x\npath: /$service/cache\n");
        assert_eq!(ext.service_field(), Some("cache"));
        ext.path = "/networks/cache".into();
        assert_eq!(ext.service_field(), None);
        ext.path = "/$service/".into();
        assert_eq!(ext.service_field(), None);
    }

    #[test]
    fn expression_strips_template_wrapper() {
        let mut ext = parse("name: x\ngenerate: \"  {{ return 1 }}\\n\"\n");
        assert_eq!(ext.expression(), " return 1 ");
        ext.generate = "return 2".into();
        assert_eq!(ext.expression(), "return 2");
    }
}
