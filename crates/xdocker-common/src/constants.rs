//! System-wide constants and default paths.

use std::path::{Path, PathBuf};

/// Directory searched for extension definitions after the configured one.
pub const GLOBAL_EXTENSIONS_DIR: &str = "/usr/local/share/xdocker/extensions";

/// Directory searched for service snippets after the local and configured ones.
pub const GLOBAL_SERVICES_DIR: &str = "/usr/local/share/xdocker/services";

/// Compose file used when `-f` is not given.
pub const DEFAULT_COMPOSE_FILE: &str = "xdocker-compose.yml";

/// Project-local directory holding service snippets.
pub const LOCAL_SERVICES_DIR: &str = "services";

/// File extension of extension definitions and service snippets.
pub const YAML_EXTENSION: &str = "yml";

/// Environment file loaded from the compose file's directory.
pub const ENV_FILE: &str = ".env";

/// Environment variable overriding the extensions directory.
pub const EXTENSIONS_DIR_ENV: &str = "XDOCKER_EXTENSIONS_DIR";

/// Environment variable overriding the services directory.
pub const SERVICES_DIR_ENV: &str = "XDOCKER_SERVICES_DIR";

/// Environment variable carrying the Tailscale auth key for installs.
pub const TAILSCALE_AUTH_KEY_ENV: &str = "TAILSCALE_AUTH_KEY";

/// Binding holding the originating compose file path in expressions.
pub const FILE_BINDING: &str = "__file__";

/// Binding holding the current service name in expressions.
pub const SERVICE_BINDING: &str = "__service__";

/// Profile assigned to services marked with `skip`.
pub const SKIP_PROFILE: &str = "donotstart";

/// Loopback address used by the localhost bind policy.
pub const LOCALHOST_ADDR: &str = "127.0.0.1";

/// Wildcard address used for globally bound services.
pub const WILDCARD_ADDR: &str = "0.0.0.0";

/// Returns the manifest path generated for a compose file:
/// `docker-compose-<basename>.yml` in the current directory, whatever
/// directory the compose file is in.
#[must_use]
pub fn manifest_path(compose_file: &Path) -> PathBuf {
    let base = compose_file
        .file_name()
        .map_or_else(|| "compose".into(), |n| n.to_string_lossy().into_owned());
    PathBuf::from(format!("docker-compose-{base}.yml"))
}
