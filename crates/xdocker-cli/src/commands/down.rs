//! `xdocker down` — Generate the manifest and stop the stack.

use anyhow::Context;
use clap::Args;
use xdocker_common::config::Settings;
use xdocker_common::constants::manifest_path;
use xdocker_compose::pipeline::write_manifest;
use xdocker_runtime::compose::Invocation;

use crate::output;

/// Arguments for the `down` command.
#[derive(Args, Debug)]
pub struct DownArgs {
    /// Keep containers of services no longer in the manifest.
    #[arg(long)]
    pub keep_orphans: bool,

    /// Write the manifest without stopping anything.
    #[arg(long)]
    pub dry: bool,

    /// Services to stop. All when empty.
    pub services: Vec<String>,
}

/// Executes the `down` command.
///
/// # Errors
///
/// Returns an error if resolution, the manifest write or `docker-compose`
/// fails.
pub fn execute(args: DownArgs, settings: &Settings) -> anyhow::Result<()> {
    let mut config = super::resolve(settings)?;
    let manifest = manifest_path(&settings.compose_file);
    write_manifest(&mut config, &manifest, None)
        .with_context(|| format!("failed to write {}", manifest.display()))?;
    output::success(&format!("Generated {}", manifest.display()));

    if args.dry {
        return Ok(());
    }
    Invocation::down(&manifest, !args.keep_orphans, &args.services)
        .run()
        .context("docker-compose down failed")
}
