//! `docker-compose` invocations.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use xdocker_common::error::{Result, XDockerError};

use crate::process;

/// Program driven by this module.
pub const DOCKER_COMPOSE: &str = "docker-compose";

const ALREADY_EXISTS: &str = "already exists";

/// Flags accepted by `docker-compose up`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpFlags {
    /// Run containers in the background.
    pub detach: bool,
    /// Remove containers for services no longer in the manifest.
    pub remove_orphans: bool,
    /// Build images before starting.
    pub build: bool,
}

/// One `docker-compose -f <manifest> <subcommand> ...` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    manifest: PathBuf,
    subcommand: &'static str,
    flags: Vec<&'static str>,
    services: Vec<String>,
}

impl Invocation {
    /// `up` with the given flags, limited to `services` when non-empty.
    #[must_use]
    pub fn up(manifest: &Path, flags: UpFlags, services: &[String]) -> Self {
        let mut args = Vec::new();
        if flags.detach {
            args.push("-d");
        }
        if flags.build {
            args.push("--build");
        }
        if flags.remove_orphans {
            args.push("--remove-orphans");
        }
        Self {
            manifest: manifest.to_path_buf(),
            subcommand: "up",
            flags: args,
            services: services.to_vec(),
        }
    }

    /// `down`, optionally removing orphans.
    #[must_use]
    pub fn down(manifest: &Path, remove_orphans: bool, services: &[String]) -> Self {
        Self {
            manifest: manifest.to_path_buf(),
            subcommand: "down",
            flags: if remove_orphans {
                vec!["--remove-orphans"]
            } else {
                Vec::new()
            },
            services: services.to_vec(),
        }
    }

    /// Full argument list passed to `docker-compose`.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            self.manifest.display().to_string(),
            self.subcommand.to_string(),
        ];
        args.extend(self.flags.iter().map(ToString::to_string));
        args.extend(self.services.iter().cloned());
        args
    }

    /// Runs the invocation with stdout inherited and stderr echoed.
    ///
    /// When it fails because a container already exists and services were
    /// named, the container of the last named service is removed and the
    /// invocation retried once.
    ///
    /// # Errors
    ///
    /// Returns an error if `docker-compose` is missing or exits
    /// unsuccessfully.
    pub fn run(&self) -> Result<()> {
        match self.run_once() {
            Err(Conflict::AlreadyExists(err)) => {
                let Some(service) = self.services.last() else {
                    return Err(err);
                };
                tracing::warn!(service = %service, "container already exists, removing and retrying");
                self.remove(service)?;
                self.run_once().map_err(Conflict::into_error)
            }
            other => other.map_err(Conflict::into_error),
        }
    }

    fn run_once(&self) -> std::result::Result<(), Conflict> {
        let mut child = process::command(DOCKER_COMPOSE)
            .map_err(Conflict::Other)?
            .args(self.args())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Conflict::Other(XDockerError::Command {
                    program: DOCKER_COMPOSE.into(),
                    message: format!("failed to start: {e}"),
                })
            })?;

        let conflict = child.stderr.take().is_some_and(|stderr| {
            echo_lines(BufReader::new(stderr), &mut std::io::stderr().lock())
        });

        let status = child.wait().map_err(|e| {
            Conflict::Other(XDockerError::Command {
                program: DOCKER_COMPOSE.into(),
                message: e.to_string(),
            })
        })?;
        match process::check_status(DOCKER_COMPOSE, status) {
            Ok(()) => Ok(()),
            Err(err) if conflict => Err(Conflict::AlreadyExists(err)),
            Err(err) => Err(Conflict::Other(err)),
        }
    }

    fn remove(&self, service: &str) -> Result<()> {
        let mut cmd = process::command(DOCKER_COMPOSE)?;
        let _ = cmd
            .arg("-f")
            .arg(&self.manifest)
            .args(["rm", "-f", service]);
        process::run_inherited(DOCKER_COMPOSE, &mut cmd)
    }
}

enum Conflict {
    AlreadyExists(XDockerError),
    Other(XDockerError),
}

impl Conflict {
    fn into_error(self) -> XDockerError {
        match self {
            Self::AlreadyExists(e) | Self::Other(e) => e,
        }
    }
}

/// Runs `docker-compose -f <file> ps`.
///
/// # Errors
///
/// Returns an error if `docker-compose` is missing or fails.
pub fn ps(file: &Path) -> Result<()> {
    let mut cmd = process::command(DOCKER_COMPOSE)?;
    let _ = cmd.arg("-f").arg(file).arg("ps");
    process::run_inherited(DOCKER_COMPOSE, &mut cmd)
}

/// Copies `reader` to `sink` line by line until end of input, decoding
/// invalid UTF-8 lossily. Returns whether a line reported a container
/// that already exists.
fn echo_lines(mut reader: impl BufRead, sink: &mut impl Write) -> bool {
    let mut conflict = false;
    let mut buf = Vec::new();
    while reader.read_until(b'\n', &mut buf).is_ok_and(|read| read > 0) {
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        conflict |= line.contains(ALREADY_EXISTS);
        let _ = writeln!(sink, "{line}");
        buf.clear();
    }
    conflict
}
