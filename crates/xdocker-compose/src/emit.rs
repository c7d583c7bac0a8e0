//! YAML serialization of resolved documents.

use std::io::Write;
use std::path::Path;

use xdocker_common::error::{Result, XDockerError};

use crate::model::ComposeFile;

/// Serializes a document for `docker-compose`: `version`, `extend` and
/// `args` are removed, empty `networks` are omitted.
///
/// # Errors
///
/// Returns an error if the document cannot be represented as YAML.
pub fn to_manifest(config: &ComposeFile) -> Result<String> {
    let mut manifest = config.clone();
    manifest.version.clear();
    manifest.extend.clear();
    manifest.args.clear();
    serialize(&manifest)
}

/// Serializes a document back to xdocker source form, keeping `version` and
/// `args`. `extend` is always dropped since the document is already merged.
///
/// # Errors
///
/// Returns an error if the document cannot be represented as YAML.
pub fn to_source(config: &ComposeFile) -> Result<String> {
    let mut source = config.clone();
    source.extend.clear();
    serialize(&source)
}

fn serialize(config: &ComposeFile) -> Result<String> {
    serde_yaml::to_string(config).map_err(|source| XDockerError::Parse {
        path: config.filename.clone(),
        source,
    })
}

/// Replaces `path` with `contents` atomically: the data is written to a
/// temporary file in the same directory, which is then renamed over the
/// target. On failure the target is left untouched.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written or renamed.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| XDockerError::io(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| XDockerError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| XDockerError::io(tmp.path(), e))?;
    let _ = tmp
        .persist(path)
        .map_err(|e| XDockerError::io(path, e.error))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "file written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::loader::parse_document;

    const DOC: &str = "version: '3.8'\nextend: base.yml\nargs: -d\nservices:\n  web:\n    image: nginx\n    ports:\n      - 8080:80\n    environment:\n      A: '1'\nvolumes:\n  data: {}\n";

    fn config() -> ComposeFile {
        let mut file = parse_document(DOC, Path::new("t.yml")).expect("parse");
        file.filename = PathBuf::from("/srv/secret-location.yml");
        file
    }

    #[test]
    fn manifest_strips_xdocker_fields() {
        let out = to_manifest(&config()).expect("serialize");
        assert!(!out.contains("version"), "got: {out}");
        assert!(!out.contains("extend"), "got: {out}");
        assert!(!out.contains("args"), "got: {out}");
        assert!(!out.contains("networks"), "got: {out}");
        assert!(!out.contains("secret-location"), "got: {out}");
        assert!(out.contains("volumes:"), "got: {out}");
    }

    #[test]
    fn manifest_reparses_to_same_structure() {
        let original = config();
        let out = to_manifest(&original).expect("serialize");
        let reparsed = parse_document(&out, Path::new("out.yml")).expect("reparse");
        assert_eq!(reparsed.services, original.services);
        assert_eq!(reparsed.extra, original.extra);
        assert_eq!(to_manifest(&reparsed).expect("serialize"), out);
    }

    #[test]
    fn manifest_uses_two_space_block_style() {
        let out = to_manifest(&config()).expect("serialize");
        assert!(out.starts_with("services:\n  web:\n    image: nginx\n"), "got: {out}");
    }

    #[test]
    fn source_keeps_version_and_args() {
        let out = to_source(&config()).expect("serialize");
        assert!(!out.contains("extend"), "got: {out}");
        let reparsed = parse_document(&out, Path::new("out.yml")).expect("reparse");
        assert_eq!(reparsed.version, "3.8");
        assert_eq!(reparsed.args, "-d");
    }

    #[test]
    fn write_atomic_replaces_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.yml");
        std::fs::write(&path, "old").expect("seed");
        write_atomic(&path, "new: 1\n").expect("write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "new: 1\n");
        let leftovers = std::fs::read_dir(dir.path()).expect("ls").count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn write_atomic_into_missing_dir_leaves_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("out.yml");
        assert!(matches!(
            write_atomic(&path, "x"),
            Err(XDockerError::Io { .. })
        ));
        assert!(!path.exists());
    }
}
