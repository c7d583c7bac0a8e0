//! Environment variable sources.
//!
//! The resolver and the extension engine read variables through
//! [`EnvSource`] so they can be exercised against a fixed map instead of
//! the process environment.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use xdocker_common::constants::ENV_FILE;
use xdocker_common::error::{Result, XDockerError};

/// A read-only view of environment variables.
pub trait EnvSource {
    /// Returns the value of `name`, or `None` when it is not set.
    fn var(&self, name: &str) -> Option<String>;
}

/// The environment of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Loads `<dir>/.env` into the process environment when it exists.
///
/// Variables already set in the process keep their value. Returns whether a
/// file was loaded.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_dotenv(dir: &Path) -> Result<bool> {
    let path = dir.join(ENV_FILE);
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "no environment file");
        return Ok(false);
    }
    dotenvy::from_path(&path).map_err(|e| XDockerError::Config {
        message: format!("error loading {}: {e}", path.display()),
    })?;
    tracing::info!(path = %path.display(), "loaded environment file");
    Ok(true)
}
