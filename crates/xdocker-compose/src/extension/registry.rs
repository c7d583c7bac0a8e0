//! Loading and lookup of extension definitions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use xdocker_common::constants::YAML_EXTENSION;
use xdocker_common::error::{Result, XDockerError};

use super::Extension;

/// All extensions known to one invocation, keyed by name.
///
/// Iteration is in name order. Extensions are expected to generate
/// non-overlapping keys, so the order carries no meaning beyond
/// reproducibility.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    extensions: BTreeMap<String, Extension>,
}

impl ExtensionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            extensions: BTreeMap::new(),
        }
    }

    /// Loads every `*.yml` file of every directory, in order.
    ///
    /// Files within a directory are read in file-name order. A definition
    /// replaces any earlier one with the same name. Directories that do not
    /// exist are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or file cannot be read, or if a file
    /// is not a valid extension definition.
    pub fn load<P: AsRef<Path>>(dirs: &[P]) -> Result<Self> {
        let mut registry = Self::new();
        for dir in dirs {
            registry.load_dir(dir.as_ref())?;
        }
        tracing::debug!(count = registry.len(), "extensions loaded");
        Ok(registry)
    }

    fn load_dir(&mut self, dir: &Path) -> Result<()> {
        if !dir.exists() {
            tracing::debug!(dir = %dir.display(), "extension directory not found, skipping");
            return Ok(());
        }

        let entries = std::fs::read_dir(dir).map_err(|e| XDockerError::io(dir, e))?;
        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| XDockerError::io(dir, e))?.path();
            let is_yaml = path.extension().is_some_and(|ext| ext == YAML_EXTENSION);
            if is_yaml && path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        for path in files {
            let extension = read_extension(&path)?;
            tracing::debug!(name = %extension.name, file = %path.display(), "loaded extension");
            self.insert(extension);
        }
        Ok(())
    }

    /// Adds a definition, replacing any with the same name.
    pub fn insert(&mut self, extension: Extension) {
        if let Some(previous) = self
            .extensions
            .insert(extension.name.clone(), extension)
        {
            tracing::debug!(name = %previous.name, "extension overridden");
        }
    }

    /// Looks up an extension by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Extension> {
        self.extensions.get(name)
    }

    /// Iterates over the extensions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.extensions.values()
    }

    /// Number of registered extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Returns `true` when no extension is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl FromIterator<Extension> for ExtensionRegistry {
    fn from_iter<I: IntoIterator<Item = Extension>>(iter: I) -> Self {
        let mut registry = Self::new();
        for extension in iter {
            registry.insert(extension);
        }
        registry
    }
}

fn read_extension(path: &Path) -> Result<Extension> {
    let content = std::fs::read_to_string(path).map_err(|e| XDockerError::io(path, e))?;
    serde_yaml::from_str(&content).map_err(|source| XDockerError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).expect("write fixture");
    }

    #[test]
    fn loads_yaml_files_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "cache.yml", "name: cache\npath: /$service/cache\n");
        write(dir.path(), "notes.txt", "not an extension");
        write(dir.path(), "other.yaml", "name: ignored\n");

        let registry = ExtensionRegistry::load(&[dir.path()]).expect("load");
        assert_eq!(registry.len(), 1);
        assert!(registry.get("cache").is_some());
    }

    #[test]
    fn later_directory_overrides_earlier() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");
        write(first.path(), "a.yml", "name: cache\npath: /$service/first\n");
        write(second.path(), "b.yml", "name: cache\npath: /$service/second\n");

        let registry = ExtensionRegistry::load(&[first.path(), second.path()]).expect("load");
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("cache").map(|e| e.path.as_str()),
            Some("/$service/second")
        );
    }

    #[test]
    fn files_load_in_name_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "b.yml", "name: dup\npath: /$service/b\n");
        write(dir.path(), "a.yml", "name: dup\npath: /$service/a\n");

        let registry = ExtensionRegistry::load(&[dir.path()]).expect("load");
        assert_eq!(
            registry.get("dup").map(|e| e.path.as_str()),
            Some("/$service/b")
        );
    }

    #[test]
    fn missing_directory_is_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        let registry = ExtensionRegistry::load(&[missing]).expect("load");
        assert!(registry.is_empty());
    }

    #[test]
    fn invalid_file_names_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            dir.path(),
            "broken.yml",
            "name: x\narguments:\n  a:\n    type: nonsense\n",
        );
        let err = ExtensionRegistry::load(&[dir.path()]).expect_err("must fail");
        match err {
            XDockerError::Parse { path, .. } => assert!(path.ends_with("broken.yml")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn iterates_in_name_order() {
        let registry: ExtensionRegistry = ["zeta", "alpha", "mid"]
            .into_iter()
            .map(|name| Extension {
                name: name.into(),
                required: false,
                path: String::new(),
                arguments: BTreeMap::new(),
                generate: String::new(),
            })
            .collect();
        let names: Vec<&str> = registry.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }
}
