//! `xdocker exec` — Run a command inside a container of the stack.

use anyhow::Context;
use clap::Args;
use xdocker_common::config::Settings;
use xdocker_runtime::container;

/// Arguments for the `exec` command.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Container or service name.
    pub container: String,

    /// Command and arguments to run.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Executes the `exec` command.
///
/// # Errors
///
/// Returns an error if the container cannot be found or the command fails.
pub fn execute(args: ExecArgs, settings: &Settings) -> anyhow::Result<()> {
    let manifest = super::existing_manifest(settings)?;
    let name = container::resolve_name(&manifest, &args.container)
        .with_context(|| format!("no container for {}", args.container))?;
    container::exec(&name, &args.command)
        .with_context(|| format!("exec in {name} failed"))
}
