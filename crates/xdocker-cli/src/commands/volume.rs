//! `xdocker volume` — Edit volume mappings of a service.

use anyhow::Context;
use clap::{Args, Subcommand};
use xdocker_common::config::Settings;
use xdocker_compose::pipeline::edit_in_place;
use xdocker_compose::volumes::{add_volume, remove_volume, update_volume};

use crate::output;

/// Arguments for the `volume` command.
#[derive(Args, Debug)]
pub struct VolumeArgs {
    /// Edit to apply.
    #[command(subcommand)]
    pub action: VolumeAction,
}

/// Volume edits, each scoped to one service.
#[derive(Subcommand, Debug)]
pub enum VolumeAction {
    /// Mount a volume on a service.
    Add {
        /// Service name.
        service: String,
        /// Mapping such as `./data:/var/lib/data`.
        volume: String,
    },
    /// Remove the service's mappings with this host side.
    Remove {
        /// Service name.
        service: String,
        /// Host path or named volume.
        host: String,
    },
    /// Replace the service's mappings with this host side.
    Update {
        /// Service name.
        service: String,
        /// Host path or named volume to replace.
        old: String,
        /// Replacement mapping.
        new: String,
    },
}

/// Executes the `volume` command.
///
/// # Errors
///
/// Returns an error if the service does not exist or the compose file
/// cannot be loaded or written.
pub fn execute(args: VolumeArgs, settings: &Settings) -> anyhow::Result<()> {
    let file = &settings.compose_file;
    let context = || format!("failed to edit {}", file.display());
    match args.action {
        VolumeAction::Add { service, volume } => {
            edit_in_place(file, |config| add_volume(config, &service, &volume))
                .with_context(context)?;
            output::success(&format!("Added volume {volume} to {service}"));
        }
        VolumeAction::Remove { service, host } => {
            let removed = edit_in_place(file, |config| remove_volume(config, &service, &host))
                .with_context(context)?;
            if removed == 0 {
                output::note(&format!("No volume {host} on {service}"));
            } else {
                output::success(&format!("Removed volume {host} from {service}"));
            }
        }
        VolumeAction::Update { service, old, new } => {
            let updated =
                edit_in_place(file, |config| update_volume(config, &service, &old, &new))
                    .with_context(context)?;
            if updated == 0 {
                output::note(&format!("No volume {old} on {service}"));
            } else {
                output::success(&format!("Updated volume {old} to {new} on {service}"));
            }
        }
    }
    Ok(())
}
