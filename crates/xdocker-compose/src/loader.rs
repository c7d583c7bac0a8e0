//! Loading of compose files and resolution of their `extend` chain.
//!
//! A document may name a parent through `extend`; parents are resolved
//! first and merged into the child with child-wins semantics at the
//! service-field level.

use std::path::{Component, Path, PathBuf};

use serde_yaml::{Mapping, Value};
use xdocker_common::error::{Result, XDockerError};

use crate::model::{ComposeFile, key_string, value_kind};

/// Reads `path` and resolves its whole `extend` chain.
///
/// The returned document has an empty `extend` field and its `filename`
/// set to `path`.
///
/// # Errors
///
/// Returns an error if any file in the chain cannot be read or parsed, or
/// if the chain loops back onto a file already being resolved.
pub fn load(path: &Path) -> Result<ComposeFile> {
    resolve_chain(path, &[])
}

/// Resolves one frame of the chain. `chain` holds the normalized paths of
/// every file between the entry point and this one.
fn resolve_chain(path: &Path, chain: &[PathBuf]) -> Result<ComposeFile> {
    let normalized = normalize(path)?;
    if chain.contains(&normalized) {
        return Err(XDockerError::CircularDependency { path: normalized });
    }

    let mut file = read_document(path)?;
    if file.extend.is_empty() {
        return Ok(file);
    }

    let parent_path = path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(&file.extend);
    tracing::debug!(
        child = %path.display(),
        parent = %parent_path.display(),
        "resolving extend"
    );

    let mut next = chain.to_vec();
    next.push(normalized);
    let parent = resolve_chain(&parent_path, &next)?;
    merge(parent, &mut file);
    Ok(file)
}

/// Reads and decodes a single document without following `extend`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid YAML, or a
/// service entry is not a mapping.
pub fn read_document(path: &Path) -> Result<ComposeFile> {
    let content = std::fs::read_to_string(path).map_err(|e| XDockerError::io(path, e))?;
    let mut file = parse_document(&content, path)?;
    file.filename = path.to_path_buf();
    Ok(file)
}

/// Decodes document text. `path` is used for diagnostics only.
///
/// Merge keys (`<<: *anchor`) are expanded before decoding, so fields
/// shared through anchors are visible to every later stage.
///
/// # Errors
///
/// Returns an error if the text is not valid YAML or a service entry is not
/// a mapping.
pub fn parse_document(content: &str, path: &Path) -> Result<ComposeFile> {
    let parse_error = |source: serde_yaml::Error| XDockerError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let document = parse_merged(content).map_err(parse_error)?;
    // An empty file decodes to null rather than an empty struct.
    let mut file: ComposeFile = if document.is_null() {
        ComposeFile::default()
    } else {
        serde_yaml::from_value(document).map_err(parse_error)?
    };
    normalize_services(&mut file.services, path)?;
    Ok(file)
}

/// Parses YAML text into a value with every merge key applied.
///
/// # Errors
///
/// Returns an error if the text is not valid YAML or a merge key does not
/// refer to a mapping or a list of mappings.
pub fn parse_merged(content: &str) -> std::result::Result<Value, serde_yaml::Error> {
    let mut document: Value = serde_yaml::from_str(content)?;
    document.apply_merge()?;
    Ok(document)
}

/// Turns `web:` (null) entries into empty mappings and rejects anything
/// that is not a mapping.
fn normalize_services(services: &mut Mapping, path: &Path) -> Result<()> {
    for (name, definition) in services.iter_mut() {
        match definition {
            Value::Mapping(_) => {}
            Value::Null => *definition = Value::Mapping(Mapping::new()),
            other => {
                return Err(XDockerError::Schema {
                    path: path.to_path_buf(),
                    message: format!(
                        "service {} must be a mapping, found {}",
                        key_string(name),
                        value_kind(other)
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Merges `parent` into `child`.
///
/// - Parent services missing from the child are appended verbatim.
/// - Services present in both merge field by field; child fields win and
///   are never merged below the field level.
/// - Networks and other top-level sections merge the same way by name.
/// - `version` is inherited only when the child has none.
/// - `extend` is cleared so the result can never re-trigger resolution.
pub fn merge(parent: ComposeFile, child: &mut ComposeFile) {
    if child.version.is_empty() {
        child.version = parent.version;
    }

    for (name, parent_service) in parent.services {
        match child.services.get_mut(&name) {
            None => {
                let _ = child.services.insert(name, parent_service);
            }
            Some(child_service) => {
                if let (Some(fields), Value::Mapping(parent_fields)) =
                    (child_service.as_mapping_mut(), parent_service)
                {
                    add_missing(fields, parent_fields);
                }
            }
        }
    }

    add_missing(&mut child.networks, parent.networks);
    add_missing(&mut child.extra, parent.extra);
    child.extend.clear();
}

/// Inserts every entry of `from` whose key is absent from `into`.
fn add_missing(into: &mut Mapping, from: Mapping) {
    for (key, value) in from {
        if !into.contains_key(&key) {
            let _ = into.insert(key, value);
        }
    }
}

/// Lexically normalizes a path against the current directory, folding `.`
/// and `..` components. Does not touch the filesystem beyond reading the
/// current directory, so missing files still surface as read errors.
fn normalize(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|e| XDockerError::io(".", e))?;
        cwd.join(path)
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let _ = out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}
