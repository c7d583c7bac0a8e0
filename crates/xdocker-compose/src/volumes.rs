//! Volume mapping edits on a single service.

use serde_yaml::{Mapping, Value};
use xdocker_common::error::{Result, XDockerError};

use crate::model::{ComposeFile, VOLUMES, host_side, sequence_entry, sequence_mut};

fn service<'a>(config: &'a mut ComposeFile, name: &str) -> Result<&'a mut Mapping> {
    config
        .service_mut(name)
        .ok_or_else(|| XDockerError::ServiceNotFound {
            name: name.to_string(),
        })
}

/// Appends `volume` to the service's volume list, creating it if needed.
///
/// # Errors
///
/// Returns [`XDockerError::ServiceNotFound`] for an unknown service, or
/// [`XDockerError::Schema`] when `volumes` is not a list.
pub fn add_volume(config: &mut ComposeFile, name: &str, volume: &str) -> Result<()> {
    let path = config.filename.clone();
    let volumes = sequence_entry(service(config, name)?, VOLUMES).ok_or_else(|| {
        XDockerError::Schema {
            path,
            message: format!("volumes of service {name} is not a list"),
        }
    })?;
    volumes.push(Value::from(volume));
    tracing::info!(service = name, volume, "volume added");
    Ok(())
}

/// Removes the service's volumes whose host side equals `host`.
///
/// Returns the number of entries removed.
///
/// # Errors
///
/// Returns [`XDockerError::ServiceNotFound`] for an unknown service.
pub fn remove_volume(config: &mut ComposeFile, name: &str, host: &str) -> Result<usize> {
    let Some(volumes) = sequence_mut(service(config, name)?, VOLUMES) else {
        return Ok(0);
    };
    let before = volumes.len();
    volumes.retain(|entry| host_side(entry) != host);
    let removed = before - volumes.len();
    tracing::info!(service = name, host, removed, "volume removed");
    Ok(removed)
}

/// Replaces the service's volumes whose host side equals `old_host` with
/// the literal `new`.
///
/// Returns the number of entries replaced.
///
/// # Errors
///
/// Returns [`XDockerError::ServiceNotFound`] for an unknown service.
pub fn update_volume(
    config: &mut ComposeFile,
    name: &str,
    old_host: &str,
    new: &str,
) -> Result<usize> {
    let Some(volumes) = sequence_mut(service(config, name)?, VOLUMES) else {
        return Ok(0);
    };
    let mut updated = 0;
    for entry in volumes.iter_mut().filter(|e| host_side(e) == old_host) {
        *entry = Value::from(new);
        updated += 1;
    }
    tracing::info!(service = name, old_host, new, updated, "volume updated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::loader::parse_document;
    use crate::model::render_plain;

    fn config(doc: &str) -> ComposeFile {
        parse_document(doc, Path::new("t.yml")).expect("parse")
    }

    fn volumes(file: &ComposeFile, name: &str) -> Vec<String> {
        file.service(name)
            .and_then(|s| s.get(VOLUMES))
            .and_then(Value::as_sequence)
            .map(|seq| seq.iter().map(render_plain).collect())
            .unwrap_or_default()
    }

    #[test]
    fn add_volume_appends() {
        let mut file = config("services:\n  db:\n    volumes: [\"./data:/var/lib/data\"]\n");
        add_volume(&mut file, "db", "./logs:/logs:ro").expect("add");
        assert_eq!(
            volumes(&file, "db"),
            vec!["./data:/var/lib/data", "./logs:/logs:ro"]
        );
    }

    #[test]
    fn remove_volume_matches_host_side_only() {
        let mut file = config(
            "services:\n  db:\n    volumes: [\"./data:/data\", \"./other:/data\"]\n",
        );
        assert_eq!(remove_volume(&mut file, "db", "./data").expect("remove"), 1);
        assert_eq!(remove_volume(&mut file, "db", "/data").expect("remove"), 0);
        assert_eq!(volumes(&file, "db"), vec!["./other:/data"]);
    }

    #[test]
    fn update_volume_replaces_whole_entry() {
        let mut file = config("services:\n  db:\n    volumes: [\"./data:/data\"]\n");
        assert_eq!(
            update_volume(&mut file, "db", "./data", "/mnt/data:/data:ro").expect("update"),
            1
        );
        assert_eq!(volumes(&file, "db"), vec!["/mnt/data:/data:ro"]);
    }

    #[test]
    fn service_without_volumes_is_a_no_op() {
        let mut file = config("services:\n  db: {}\n");
        assert_eq!(remove_volume(&mut file, "db", "x").expect("remove"), 0);
        assert_eq!(update_volume(&mut file, "db", "x", "y").expect("update"), 0);
    }

    #[test]
    fn unknown_service_is_reported() {
        let mut file = config("services:\n  db: {}\n");
        assert!(matches!(
            add_volume(&mut file, "web", "a:b"),
            Err(XDockerError::ServiceNotFound { .. })
        ));
        assert!(matches!(
            remove_volume(&mut file, "web", "a"),
            Err(XDockerError::ServiceNotFound { .. })
        ));
    }
}
