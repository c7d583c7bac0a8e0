//! In-memory model of an xdocker compose file.
//!
//! Service definitions are open-ended: they stay as ordered
//! [`serde_yaml::Mapping`]s so every field the core does not interpret
//! passes through unchanged. Typed helpers exist only for the handful of
//! fields the core manipulates.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

/// Service field holding published port mappings.
pub const PORTS: &str = "ports";
/// Service field holding volume mappings.
pub const VOLUMES: &str = "volumes";
/// Service field marking a service as not started by default.
pub const SKIP: &str = "skip";
/// Service field receiving the skip profile.
pub const PROFILES: &str = "profiles";

/// Root of an xdocker compose document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeFile {
    /// Schema version tag, passed through and stripped from manifests.
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub version: String,
    /// Service name to service definition, in document order.
    #[serde(default)]
    pub services: Mapping,
    /// Network name to network definition, in document order.
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub networks: Mapping,
    /// Parent document, relative to this file's directory.
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub extend: String,
    /// Extra command-line arguments applied by `up`.
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub args: String,
    /// Any other top-level key (`volumes`, `secrets`, `x-*`, ...).
    #[serde(flatten)]
    pub extra: Mapping,
    /// The file this document was read from. Never serialized.
    #[serde(skip)]
    pub filename: PathBuf,
}

/// Accepts any scalar (`version: 3.8`, `version: "3"`) as a string.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(render_plain(&value)),
        other => Err(serde::de::Error::custom(format!(
            "expected a scalar, found {}",
            value_kind(&other)
        ))),
    }
}

impl ComposeFile {
    /// Returns the named service definition.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Mapping> {
        self.services.get(name).and_then(Value::as_mapping)
    }

    /// Returns the named service definition mutably.
    pub fn service_mut(&mut self, name: &str) -> Option<&mut Mapping> {
        self.services.get_mut(name).and_then(Value::as_mapping_mut)
    }

    /// Returns the service names in document order.
    #[must_use]
    pub fn service_names(&self) -> Vec<String> {
        self.services.keys().map(key_string).collect()
    }

    /// Iterates over `(name, definition)` pairs mutably, in document order.
    pub fn services_mut(&mut self) -> impl Iterator<Item = (String, &mut Mapping)> {
        self.services
            .iter_mut()
            .filter_map(|(k, v)| v.as_mapping_mut().map(|m| (key_string(k), m)))
    }
}

/// Renders a mapping key as a string.
#[must_use]
pub fn key_string(key: &Value) -> String {
    render_plain(key)
}

/// Renders a value as plain text: strings verbatim, numbers and booleans in
/// their YAML form, null as an empty string, structures as JSON.
#[must_use]
pub fn render_plain(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => render_plain(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
        }
    }
}

/// Describes the YAML kind of a value, for diagnostics.
#[must_use]
pub const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Returns the sequence stored under `field`, if present.
#[must_use]
pub fn sequence<'a>(service: &'a Mapping, field: &str) -> Option<&'a Vec<Value>> {
    service.get(field).and_then(Value::as_sequence)
}

/// Returns the sequence stored under `field` mutably, if present.
pub fn sequence_mut<'a>(service: &'a mut Mapping, field: &str) -> Option<&'a mut Vec<Value>> {
    service.get_mut(field).and_then(Value::as_sequence_mut)
}

/// Returns the sequence stored under `field`, creating an empty one when the
/// field is absent or null. Returns `None` when the field holds something
/// other than a sequence.
pub fn sequence_entry<'a>(service: &'a mut Mapping, field: &str) -> Option<&'a mut Vec<Value>> {
    let missing = service.get(field).is_none_or(Value::is_null);
    if missing {
        let _ = service.insert(Value::from(field), Value::Sequence(Vec::new()));
    }
    sequence_mut(service, field)
}

/// Returns the text before the first `:` of a mapping entry such as
/// `8080:80` or `./data:/data`, or the whole entry when it has no `:`.
#[must_use]
pub fn host_side(entry: &Value) -> String {
    let text = render_plain(entry);
    text.split(':').next().unwrap_or_default().to_string()
}
