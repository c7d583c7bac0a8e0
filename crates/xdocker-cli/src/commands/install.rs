//! `xdocker install` — Provision hosts with Docker, xdocker and Tailscale.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use xdocker_common::constants::TAILSCALE_AUTH_KEY_ENV;
use xdocker_runtime::install::{Script, install_local, install_remote};

use crate::output;

/// Arguments for the `install` command.
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Comma-separated `user@host` targets. Installs locally when absent.
    #[arg(long)]
    pub hosts: Option<String>,

    /// SSH private key used for remote hosts.
    #[arg(short, long)]
    pub identity: Option<PathBuf>,

    /// Install only Docker and docker-compose.
    #[arg(long)]
    pub only_docker: bool,

    /// Install only xdocker.
    #[arg(long)]
    pub only_xdocker: bool,

    /// Auth key passed to `tailscale up`.
    #[arg(long, env = TAILSCALE_AUTH_KEY_ENV, hide_env_values = true)]
    pub tailscale_auth_key: Option<String>,
}

/// Executes the `install` command.
///
/// # Errors
///
/// Returns an error if the local install fails or any remote host fails.
pub fn execute(args: InstallArgs) -> anyhow::Result<()> {
    let script = Script::from_flags(args.only_docker, args.only_xdocker);
    let auth_key = args.tailscale_auth_key.as_deref();
    if script == Script::Full && auth_key.is_none() {
        output::note(&format!(
            "{TAILSCALE_AUTH_KEY_ENV} not set, tailscale up will ask to log in"
        ));
    }

    let Some(hosts) = args.hosts else {
        install_local(script, auth_key).context("local installation failed")?;
        output::success("Installation completed");
        return Ok(());
    };

    let report = install_remote(&hosts, args.identity.as_deref(), script, auth_key);
    for host in &report.succeeded {
        output::success(&format!("{host}: installed"));
    }
    for (host, reason) in &report.failed {
        output::failure(&format!("{host}: {reason}"));
    }
    if !report.is_success() {
        anyhow::bail!(
            "installation failed on {} of {} host(s)",
            report.failed.len(),
            report.failed.len() + report.succeeded.len()
        );
    }
    Ok(())
}
