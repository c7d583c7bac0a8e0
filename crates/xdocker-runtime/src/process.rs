//! Spawning of the external tools xdocker drives.

use std::path::PathBuf;
use std::process::{Command, ExitStatus, Output, Stdio};

use xdocker_common::error::{Result, XDockerError};

/// Locates `program` on `PATH`.
///
/// # Errors
///
/// Returns [`XDockerError::Command`] if the program is not installed.
pub fn locate(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|_| XDockerError::Command {
        program: program.to_string(),
        message: "not found in PATH".into(),
    })
}

/// Builds a command for `program`, resolved through `PATH`.
///
/// # Errors
///
/// Returns an error if the program is not installed.
pub fn command(program: &str) -> Result<Command> {
    Ok(Command::new(locate(program)?))
}

/// Runs `cmd` with inherited stdio and fails on a non-zero exit.
///
/// # Errors
///
/// Returns an error if the process cannot be spawned or exits unsuccessfully.
pub fn run_inherited(program: &str, cmd: &mut Command) -> Result<()> {
    tracing::debug!(program, args = ?args_of(cmd), "running");
    let status = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| spawn_error(program, &e))?;
    check_status(program, status)
}

/// Runs `cmd` with stdout and stderr inherited and stdin closed, so no
/// shell it starts can read from the terminal or from a piped script.
///
/// # Errors
///
/// Returns an error if the process cannot be spawned or exits unsuccessfully.
pub fn run_unattended(program: &str, cmd: &mut Command) -> Result<()> {
    tracing::debug!(program, args = ?args_of(cmd), "running unattended");
    let status = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| spawn_error(program, &e))?;
    check_status(program, status)
}

/// Runs `cmd` to completion and captures its output, whatever its exit
/// status.
///
/// # Errors
///
/// Returns an error if the process cannot be spawned.
pub fn capture(program: &str, cmd: &mut Command) -> Result<Output> {
    tracing::debug!(program, args = ?args_of(cmd), "capturing");
    cmd.stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(program, &e))
}

/// Runs `cmd` silently and reports only whether it succeeded.
pub fn succeeds(cmd: &mut Command) -> bool {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Maps a non-zero exit status to [`XDockerError::Command`].
///
/// # Errors
///
/// Returns an error when `status` is not successful.
pub fn check_status(program: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(XDockerError::Command {
            program: program.to_string(),
            message: status.code().map_or_else(
                || "terminated by signal".to_string(),
                |code| format!("exit status {code}"),
            ),
        })
    }
}

fn spawn_error(program: &str, e: &std::io::Error) -> XDockerError {
    XDockerError::Command {
        program: program.to_string(),
        message: format!("failed to start: {e}"),
    }
}

fn args_of(cmd: &Command) -> Vec<String> {
    cmd.get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}
