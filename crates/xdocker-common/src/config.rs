//! Process-wide settings for a single xdocker invocation.

use std::path::PathBuf;

use crate::constants;

/// Directories and files consulted by one invocation.
///
/// Built once at start-up (defaults, then environment, then CLI flags) and
/// passed explicitly to every stage that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// The xdocker compose file to resolve.
    pub compose_file: PathBuf,
    /// User-configured extensions directory.
    pub extensions_dir: PathBuf,
    /// User-configured service snippet directory, if any.
    pub services_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            compose_file: PathBuf::from(constants::DEFAULT_COMPOSE_FILE),
            extensions_dir: PathBuf::from(constants::GLOBAL_EXTENSIONS_DIR),
            services_dir: None,
        }
    }
}

impl Settings {
    /// Builds settings from defaults overridden by `XDOCKER_*` variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(dir) = non_empty_env(constants::EXTENSIONS_DIR_ENV) {
            settings.extensions_dir = PathBuf::from(dir);
        }
        settings.services_dir = non_empty_env(constants::SERVICES_DIR_ENV).map(PathBuf::from);
        settings
    }

    /// Extension directories in load order: the configured one, then the
    /// global one when it differs.
    #[must_use]
    pub fn extension_dirs(&self) -> Vec<PathBuf> {
        let global = PathBuf::from(constants::GLOBAL_EXTENSIONS_DIR);
        if self.extensions_dir == global {
            vec![global]
        } else {
            vec![self.extensions_dir.clone(), global]
        }
    }

    /// Service snippet directories in search order: `services/` next to the
    /// compose file, the configured directory, then the global one.
    #[must_use]
    pub fn service_dirs(&self) -> Vec<PathBuf> {
        let base = self
            .compose_file
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default();
        let mut dirs = vec![base.join(constants::LOCAL_SERVICES_DIR)];
        if let Some(ref dir) = self.services_dir {
            dirs.push(dir.clone());
        }
        dirs.push(PathBuf::from(constants::GLOBAL_SERVICES_DIR));
        dirs
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
