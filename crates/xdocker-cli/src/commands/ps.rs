//! `xdocker ps` — List the containers of the stack.

use anyhow::Context;
use xdocker_common::config::Settings;
use xdocker_runtime::compose;

/// Executes the `ps` command against the last generated manifest.
///
/// # Errors
///
/// Returns an error if the manifest is missing or `docker-compose` fails.
pub fn execute(settings: &Settings) -> anyhow::Result<()> {
    let manifest = super::existing_manifest(settings)?;
    compose::ps(&manifest).context("docker-compose ps failed")
}
