//! Host provisioning: Docker, docker-compose, xdocker and Tailscale.
//!
//! Scripts run locally through `bash -c`, or remotely through `ssh ...
//! bash -c '<script>'`. Stdin is closed in both cases so a step that starts
//! a shell (`newgrp`) returns at once instead of waiting on input. Remote
//! hosts are processed one after the other; a failing host never stops
//! the others.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use xdocker_common::constants::TAILSCALE_AUTH_KEY_ENV;
use xdocker_common::error::{Result, XDockerError};

use crate::process;

const BASE_SCRIPT: &str = include_str!("../scripts/base.sh");
const DOCKER_SCRIPT: &str = include_str!("../scripts/docker.sh");
const XDOCKER_SCRIPT: &str = include_str!("../scripts/xdocker.sh");
const TAILSCALE_SCRIPT: &str = include_str!("../scripts/tailscale.sh");

const BASH: &str = "bash";
const SSH: &str = "ssh";

/// Which components to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// System packages, Docker, xdocker and Tailscale.
    Full,
    /// Docker and docker-compose only.
    DockerOnly,
    /// xdocker only.
    XDockerOnly,
}

impl Script {
    /// Picks the script from the `--only-*` flags. Docker wins when both
    /// are set.
    #[must_use]
    pub const fn from_flags(only_docker: bool, only_xdocker: bool) -> Self {
        if only_docker {
            Self::DockerOnly
        } else if only_xdocker {
            Self::XDockerOnly
        } else {
            Self::Full
        }
    }

    /// Returns the shell script text.
    #[must_use]
    pub fn body(self) -> String {
        match self {
            Self::DockerOnly => DOCKER_SCRIPT.to_string(),
            Self::XDockerOnly => XDOCKER_SCRIPT.to_string(),
            Self::Full => [
                BASE_SCRIPT,
                strip_shebang(DOCKER_SCRIPT),
                strip_shebang(XDOCKER_SCRIPT),
                TAILSCALE_SCRIPT,
                "echo \"Installation completed successfully.\"\n",
            ]
            .join("\n"),
        }
    }
}

fn strip_shebang(script: &str) -> &str {
    script
        .strip_prefix("#!/bin/bash\nset -e\n")
        .unwrap_or(script)
}

/// A remote `user@host` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// Login user.
    pub user: String,
    /// Host name or address.
    pub hostname: String,
}

impl FromStr for Host {
    type Err = XDockerError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || XDockerError::Config {
            message: format!("invalid host format: {s:?} (expected user@host)"),
        };
        let (user, hostname) = s.trim().split_once('@').ok_or_else(invalid)?;
        if user.is_empty() || hostname.is_empty() || hostname.contains('@') {
            return Err(invalid());
        }
        Ok(Self {
            user: user.to_string(),
            hostname: hostname.to_string(),
        })
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.hostname)
    }
}

/// Outcome of a remote install across several hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Hosts where the script completed.
    pub succeeded: Vec<String>,
    /// Hosts (or malformed entries) that failed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl InstallReport {
    /// Returns `true` when every host succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs `script` on this machine.
///
/// # Errors
///
/// Returns an error if bash is missing or the script fails.
pub fn install_local(script: Script, auth_key: Option<&str>) -> Result<()> {
    tracing::info!(script = ?script, "running local install");
    let mut cmd = process::command(BASH)?;
    let _ = cmd.arg("-c").arg(script.body());
    if let Some(key) = auth_key {
        let _ = cmd.env(TAILSCALE_AUTH_KEY_ENV, key);
    }
    process::run_unattended(BASH, &mut cmd)
}

/// Runs `script` on every host of the comma-separated `hosts` list.
///
/// Malformed entries and failing hosts are recorded in the report and the
/// next host is attempted.
pub fn install_remote(
    hosts: &str,
    identity: Option<&Path>,
    script: Script,
    auth_key: Option<&str>,
) -> InstallReport {
    let payload = remote_payload(&script.body(), auth_key);
    let mut report = InstallReport::default();

    for entry in hosts.split(',').map(str::trim).filter(|h| !h.is_empty()) {
        let host = match entry.parse::<Host>() {
            Ok(host) => host,
            Err(e) => {
                tracing::error!(host = entry, error = %e, "skipping host");
                report.failed.push((entry.to_string(), e.to_string()));
                continue;
            }
        };

        tracing::info!(host = %host, "running remote install");
        match run_remote(&host, identity, &payload) {
            Ok(()) => {
                tracing::info!(host = %host, "installation completed");
                report.succeeded.push(host.to_string());
            }
            Err(e) => {
                tracing::error!(host = %host, error = %e, "installation failed");
                report.failed.push((host.to_string(), e.to_string()));
            }
        }
    }
    report
}

fn run_remote(host: &Host, identity: Option<&Path>, payload: &str) -> Result<()> {
    let mut cmd = process::command(SSH)?;
    let _ = cmd.args(ssh_args(host, identity, payload));
    process::run_unattended(SSH, &mut cmd)
}

/// `ssh` arguments running `payload` through `bash -c` on `host`. The
/// remote command is a single, quoted argument for the remote shell.
fn ssh_args(host: &Host, identity: Option<&Path>, payload: &str) -> Vec<String> {
    let mut args = vec![
        "-o".to_string(),
        "StrictHostKeyChecking=accept-new".to_string(),
    ];
    if let Some(key) = identity {
        args.push("-i".into());
        args.push(key.display().to_string());
    }
    args.push(host.to_string());
    args.push(format!("{BASH} -c {}", shell_quote(payload)));
    args
}

/// Prefixes the script with the auth key export.
fn remote_payload(script: &str, auth_key: Option<&str>) -> String {
    let key = shell_quote(auth_key.unwrap_or_default());
    format!("export {TAILSCALE_AUTH_KEY_ENV}={key}\n{script}")
}

/// Single-quotes `text` for a POSIX shell.
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_select_script() {
        assert_eq!(Script::from_flags(false, false), Script::Full);
        assert_eq!(Script::from_flags(true, false), Script::DockerOnly);
        assert_eq!(Script::from_flags(false, true), Script::XDockerOnly);
        assert_eq!(Script::from_flags(true, true), Script::DockerOnly);
    }

    #[test]
    fn full_script_contains_every_component() {
        let body = Script::Full.body();
        assert!(body.starts_with("#!/bin/bash\nset -e\n"));
        assert!(body.contains("docker-ce"));
        assert!(body.contains("cargo install"));
        assert!(body.contains("tailscale up"));
        assert_eq!(body.matches("#!/bin/bash").count(), 1);
    }

    #[test]
    fn docker_only_script_skips_tailscale() {
        assert!(!Script::DockerOnly.body().contains("tailscale"));
    }

    #[test]
    fn parses_hosts() {
        let host: Host = "ubuntu@10.0.0.5".parse().expect("valid host");
        assert_eq!(host.user, "ubuntu");
        assert_eq!(host.hostname, "10.0.0.5");
        assert_eq!(host.to_string(), "ubuntu@10.0.0.5");
        assert!("10.0.0.5".parse::<Host>().is_err());
        assert!("@host".parse::<Host>().is_err());
        assert!("a@b@c".parse::<Host>().is_err());
    }

    #[test]
    fn malformed_hosts_are_reported_and_skipped() {
        let report = install_remote("nohost, also-bad", None, Script::DockerOnly, None);
        assert!(report.succeeded.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].0, "nohost");
        assert!(!report.is_success());
    }

    #[test]
    fn ssh_arguments_include_identity_and_quoted_script() {
        let host: Host = "root@box".parse().expect("host");
        let args = ssh_args(&host, Some(Path::new("/keys/id_ed25519")), "echo 'hi'\n");
        assert_eq!(
            args,
            vec![
                "-o",
                "StrictHostKeyChecking=accept-new",
                "-i",
                "/keys/id_ed25519",
                "root@box",
                "bash -c 'echo '\\''hi'\\''\n'"
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn quoted_script_runs_every_line_past_an_inner_shell() {
        let script = "set -e\nbash\necho \"after 'inner' shell\"\n";
        let mut cmd = std::process::Command::new("sh");
        let _ = cmd
            .arg("-c")
            .arg(format!("{BASH} -c {}", shell_quote(script)))
            .stdin(std::process::Stdio::null());
        let output = cmd.output().expect("run sh");
        assert!(output.status.success());
        assert_eq!(
            String::from_utf8_lossy(&output.stdout),
            "after 'inner' shell\n"
        );
    }

    #[test]
    fn docker_script_keeps_newgrp_off_stdin() {
        let line = DOCKER_SCRIPT
            .lines()
            .find(|l| l.contains("newgrp"))
            .expect("newgrp step");
        assert!(line.ends_with("</dev/null"), "got: {line}");
    }

    #[test]
    fn payload_quotes_auth_key() {
        let payload = remote_payload("echo hi\n", Some("tskey-it's"));
        assert_eq!(
            payload,
            "export TAILSCALE_AUTH_KEY='tskey-it'\\''s'\necho hi\n"
        );
    }
}
