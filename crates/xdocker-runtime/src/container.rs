//! Running commands inside the containers of a deployed stack.

use std::path::Path;

use xdocker_common::error::{Result, XDockerError};

use crate::compose::DOCKER_COMPOSE;
use crate::process;

/// Program used to talk to the container engine.
pub const DOCKER: &str = "docker";

/// Shell preferred by [`interactive_shell`].
pub const PREFERRED_SHELL: &str = "/bin/bash";

/// Shell used when the preferred one is missing from the image.
pub const FALLBACK_SHELL: &str = "/bin/sh";

/// Resolves a container name or a service name of the stack described by
/// `manifest` to a container name.
///
/// An existing container with that exact name wins. Otherwise the first
/// container `docker-compose ps -q` reports for the service is used.
///
/// # Errors
///
/// Returns [`XDockerError::ServiceNotFound`] if neither lookup finds a
/// container, or a command error if `docker-compose` fails.
pub fn resolve_name(manifest: &Path, name: &str) -> Result<String> {
    let mut inspect = process::command(DOCKER)?;
    let _ = inspect.args(["inspect", name]);
    if process::succeeds(&mut inspect) {
        tracing::debug!(container = name, "using existing container");
        return Ok(name.to_string());
    }

    let mut ps = process::command(DOCKER_COMPOSE)?;
    let _ = ps.arg("-f").arg(manifest).args(["ps", "-q", name]);
    let output = process::capture(DOCKER_COMPOSE, &mut ps)?;
    process::check_status(DOCKER_COMPOSE, output.status)?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    first_container(&stdout).ok_or_else(|| XDockerError::ServiceNotFound {
        name: name.to_string(),
    })
}

/// Picks the first container id from `docker-compose ps -q` output.
fn first_container(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(ToString::to_string)
}

/// Runs `command` inside `container` with a terminal attached.
///
/// # Errors
///
/// Returns an error if the command is empty or `docker exec` fails.
pub fn exec(container: &str, command: &[String]) -> Result<()> {
    if command.is_empty() {
        return Err(XDockerError::Config {
            message: "exec command is empty".into(),
        });
    }
    tracing::info!(container, cmd = ?command, "exec into container");
    let mut cmd = process::command(DOCKER)?;
    let _ = cmd.args(["exec", "-t", container]).args(command);
    process::run_inherited(DOCKER, &mut cmd)
}

/// Opens an interactive shell in `container`, preferring bash.
///
/// # Errors
///
/// Returns an error if `docker exec` fails.
pub fn interactive_shell(container: &str) -> Result<()> {
    let mut lookup = process::command(DOCKER)?;
    let _ = lookup.args(["exec", container, "which", PREFERRED_SHELL]);
    let shell = if process::succeeds(&mut lookup) {
        PREFERRED_SHELL
    } else {
        FALLBACK_SHELL
    };

    tracing::info!(container, shell, "opening interactive shell");
    let mut cmd = process::command(DOCKER)?;
    let _ = cmd.args(["exec", "-it", container, shell]);
    process::run_inherited(DOCKER, &mut cmd)
}
