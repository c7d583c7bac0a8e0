//! `xdocker port` — Edit port mappings in the compose file.

use anyhow::Context;
use clap::{Args, Subcommand};
use xdocker_common::config::Settings;
use xdocker_compose::pipeline::edit_in_place;
use xdocker_compose::ports::{add_port, remove_port, update_port};

use crate::output;

/// Arguments for the `port` command.
#[derive(Args, Debug)]
pub struct PortArgs {
    /// Edit to apply.
    #[command(subcommand)]
    pub action: PortAction,
}

/// Port edits.
#[derive(Subcommand, Debug)]
pub enum PortAction {
    /// Publish a port on a service.
    Add {
        /// Service name.
        service: String,
        /// Mapping such as `8080:80`.
        port: String,
    },
    /// Remove every mapping with this host port, in all services.
    Remove {
        /// Host-side port.
        port: String,
    },
    /// Replace every mapping with this host port, in all services.
    Update {
        /// Host-side port to replace.
        old: String,
        /// Replacement mapping.
        new: String,
    },
}

/// Executes the `port` command.
///
/// # Errors
///
/// Returns an error if the compose file cannot be loaded, edited or
/// written.
pub fn execute(args: PortArgs, settings: &Settings) -> anyhow::Result<()> {
    let file = &settings.compose_file;
    let context = || format!("failed to edit {}", file.display());
    match args.action {
        PortAction::Add { service, port } => {
            edit_in_place(file, |config| add_port(config, &service, &port))
                .with_context(context)?;
            output::success(&format!("Added port {port} to {service}"));
        }
        PortAction::Remove { port } => {
            let removed = edit_in_place(file, |config| Ok(remove_port(config, &port)))
                .with_context(context)?;
            report(removed, &format!("Removed port {port}"));
        }
        PortAction::Update { old, new } => {
            let updated = edit_in_place(file, |config| Ok(update_port(config, &old, &new)))
                .with_context(context)?;
            report(updated, &format!("Updated port {old} to {new}"));
        }
    }
    Ok(())
}

fn report(count: usize, message: &str) {
    if count == 0 {
        output::note("No matching port mapping");
    } else {
        output::success(&format!("{message} ({count} mapping(s))"));
    }
}
