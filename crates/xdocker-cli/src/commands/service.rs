//! `xdocker service` — Add predefined services to the compose file.

use anyhow::Context;
use clap::{Args, Subcommand};
use xdocker_common::config::Settings;
use xdocker_compose::pipeline::edit_in_place;
use xdocker_compose::snippets::add_service;

use crate::output;

/// Arguments for the `service` command.
#[derive(Args, Debug)]
pub struct ServiceArgs {
    /// Edit to apply.
    #[command(subcommand)]
    pub action: ServiceAction,
}

/// Service edits.
#[derive(Subcommand, Debug)]
pub enum ServiceAction {
    /// Copy the services of snippet `<name>.yml` into the compose file.
    Add {
        /// Snippet name.
        name: String,
    },
}

/// Executes the `service` command.
///
/// # Errors
///
/// Returns an error if no snippet is found or the compose file cannot be
/// loaded or written.
pub fn execute(args: &ServiceArgs, settings: &Settings) -> anyhow::Result<()> {
    let ServiceAction::Add { ref name } = args.action;
    let dirs = settings.service_dirs();
    let added = edit_in_place(&settings.compose_file, |config| {
        add_service(config, name, &dirs)
    })
    .with_context(|| format!("failed to add service {name}"))?;
    output::success(&format!("Added service(s): {}", added.join(", ")));
    Ok(())
}
