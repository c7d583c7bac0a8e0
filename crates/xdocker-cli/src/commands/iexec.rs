//! `xdocker iexec` — Open an interactive shell inside a container.

use anyhow::Context;
use clap::Args;
use xdocker_common::config::Settings;
use xdocker_runtime::container;

/// Arguments for the `iexec` command.
#[derive(Args, Debug)]
pub struct IexecArgs {
    /// Container or service name.
    pub container: String,
}

/// Executes the `iexec` command.
///
/// # Errors
///
/// Returns an error if the container cannot be found or the shell fails.
pub fn execute(args: &IexecArgs, settings: &Settings) -> anyhow::Result<()> {
    let manifest = super::existing_manifest(settings)?;
    let name = container::resolve_name(&manifest, &args.container)
        .with_context(|| format!("no container for {}", args.container))?;
    container::interactive_shell(&name).with_context(|| format!("shell in {name} failed"))
}
