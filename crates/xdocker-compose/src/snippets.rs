//! Reusable service snippets spliced into a document by `service add`.
//!
//! A snippet named `redis` is the first `redis.yml` found in the search
//! directories. It is either a full document with a `services:` section or
//! a bare mapping of service definitions.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use xdocker_common::constants::YAML_EXTENSION;
use xdocker_common::error::{Result, XDockerError};

use crate::loader::parse_merged;
use crate::model::{ComposeFile, key_string, value_kind};

const SERVICES_KEY: &str = "services";

/// Returns the first `<name>.yml` that exists in `dirs`.
#[must_use]
pub fn find_snippet<P: AsRef<Path>>(dirs: &[P], name: &str) -> Option<PathBuf> {
    let file_name = format!("{name}.{YAML_EXTENSION}");
    dirs.iter()
        .map(|dir| dir.as_ref().join(&file_name))
        .find(|candidate| {
            tracing::trace!(path = %candidate.display(), "looking for service snippet");
            candidate.is_file()
        })
}

/// Reads the service definitions of a snippet file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if it is not a
/// mapping of service definitions.
pub fn read_snippet(path: &Path) -> Result<Mapping> {
    let content = std::fs::read_to_string(path).map_err(|e| XDockerError::io(path, e))?;
    let document = parse_merged(&content).map_err(|source| XDockerError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let schema = |message: String| XDockerError::Schema {
        path: path.to_path_buf(),
        message,
    };

    let mut services = match document {
        Value::Mapping(mut map) => match map.shift_remove(SERVICES_KEY) {
            Some(Value::Mapping(services)) => services,
            Some(other) => {
                return Err(schema(format!(
                    "services must be a mapping, found {}",
                    value_kind(&other)
                )));
            }
            // Bare form: top-level `x-*` keys only hold anchors.
            None => {
                map.retain(|key, _| !key_string(key).starts_with("x-"));
                map
            }
        },
        other => {
            return Err(schema(format!(
                "snippet must be a mapping, found {}",
                value_kind(&other)
            )));
        }
    };

    for (name, definition) in services.iter_mut() {
        match definition {
            Value::Mapping(_) => {}
            Value::Null => *definition = Value::Mapping(Mapping::new()),
            other => {
                return Err(schema(format!(
                    "service {} must be a mapping, found {}",
                    key_string(name),
                    value_kind(other)
                )));
            }
        }
    }
    Ok(services)
}

/// Splices the snippet `name` into `config`, replacing services with the
/// same name.
///
/// Returns the names of the services added.
///
/// # Errors
///
/// Returns [`XDockerError::ServiceNotFound`] when no snippet exists in any
/// directory, or an error if the snippet is malformed.
pub fn add_service<P: AsRef<Path>>(
    config: &mut ComposeFile,
    name: &str,
    dirs: &[P],
) -> Result<Vec<String>> {
    let path = find_snippet(dirs, name).ok_or_else(|| XDockerError::ServiceNotFound {
        name: name.to_string(),
    })?;
    tracing::debug!(snippet = %path.display(), "using service snippet");

    let mut added = Vec::new();
    for (key, definition) in read_snippet(&path)? {
        let service = key_string(&key);
        if config.services.insert(key, definition).is_some() {
            tracing::warn!(service = %service, "replacing existing service definition");
        }
        tracing::info!(service = %service, "service added");
        added.push(service);
    }
    Ok(added)
}
