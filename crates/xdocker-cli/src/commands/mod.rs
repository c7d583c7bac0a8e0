//! CLI command definitions and dispatch.

pub mod down;
pub mod exec;
pub mod iexec;
pub mod install;
pub mod port;
pub mod ps;
pub mod service;
pub mod up;
pub mod volume;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use xdocker_common::config::Settings;
use xdocker_common::constants::{DEFAULT_COMPOSE_FILE, manifest_path};
use xdocker_compose::env::{ProcessEnv, load_dotenv};
use xdocker_compose::expr::Interpreter;
use xdocker_compose::extension::ExtensionRegistry;
use xdocker_compose::model::ComposeFile;
use xdocker_compose::pipeline::Pipeline;

/// xdocker — docker-compose with inheritance, templating and extensions.
#[derive(Parser, Debug)]
#[command(name = "xdocker", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Extended compose file to read.
    #[arg(short, long, global = true, default_value = DEFAULT_COMPOSE_FILE)]
    pub file: PathBuf,

    /// Directory searched for extension definitions before the global one.
    #[arg(long, global = true)]
    pub extension_dir: Option<PathBuf>,

    /// Directory searched for service snippets.
    #[arg(long, global = true)]
    pub services_dir: Option<PathBuf>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Settings from the environment, overridden by command-line flags.
    #[must_use]
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::from_env();
        settings.compose_file.clone_from(&self.file);
        if let Some(ref dir) = self.extension_dir {
            settings.extensions_dir.clone_from(dir);
        }
        if self.services_dir.is_some() {
            settings.services_dir.clone_from(&self.services_dir);
        }
        settings
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install Docker, xdocker and Tailscale locally or over SSH.
    Install(install::InstallArgs),
    /// Generate the manifest and start the stack.
    Up(up::UpArgs),
    /// Generate the manifest and stop the stack.
    Down(down::DownArgs),
    /// List the containers of the stack.
    Ps,
    /// Run a command inside a container.
    Exec(exec::ExecArgs),
    /// Open an interactive shell inside a container.
    Iexec(iexec::IexecArgs),
    /// Edit the port mappings of the compose file.
    Port(port::PortArgs),
    /// Edit the volume mappings of the compose file.
    Volume(volume::VolumeArgs),
    /// Add predefined services to the compose file.
    Service(service::ServiceArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.settings();
    tracing::debug!(settings = ?settings, "settings resolved");
    match cli.command {
        Command::Install(args) => install::execute(args),
        Command::Up(args) => up::execute(args, &settings),
        Command::Down(args) => down::execute(args, &settings),
        Command::Ps => ps::execute(&settings),
        Command::Exec(args) => exec::execute(args, &settings),
        Command::Iexec(args) => iexec::execute(&args, &settings),
        Command::Port(args) => port::execute(args, &settings),
        Command::Volume(args) => volume::execute(args, &settings),
        Command::Service(args) => service::execute(&args, &settings),
    }
}

/// Loads `.env`, the extension registry and the compose file, and runs the
/// resolution pipeline.
fn resolve(settings: &Settings) -> anyhow::Result<ComposeFile> {
    let file = &settings.compose_file;
    let _ = load_dotenv(base_dir(file))?;

    let registry = ExtensionRegistry::load(&settings.extension_dirs())
        .context("failed to load extensions")?;
    tracing::debug!(extensions = registry.len(), "extension registry loaded");

    Pipeline::new(&registry, &Interpreter, &ProcessEnv)
        .resolve(file)
        .with_context(|| format!("failed to resolve {}", file.display()))
}

/// Manifest path of an already generated stack.
fn existing_manifest(settings: &Settings) -> anyhow::Result<PathBuf> {
    let manifest = manifest_path(&settings.compose_file);
    if !manifest.is_file() {
        anyhow::bail!(
            "manifest not found: {}\n\
             Generate it first: xdocker up --dry",
            manifest.display()
        );
    }
    Ok(manifest)
}

fn base_dir(file: &Path) -> &Path {
    file.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["xdocker", "ps", "-f", "stack.yml", "-v"]).expect("parse");
        assert!(matches!(cli.command, Command::Ps));
        assert_eq!(cli.file, PathBuf::from("stack.yml"));
        assert!(cli.verbose);
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::try_parse_from([
            "xdocker",
            "--extension-dir",
            "/opt/ext",
            "--services-dir",
            "/opt/svc",
            "ps",
        ])
        .expect("parse");
        let settings = cli.settings();
        assert_eq!(settings.compose_file, PathBuf::from(DEFAULT_COMPOSE_FILE));
        assert_eq!(settings.extensions_dir, PathBuf::from("/opt/ext"));
        assert_eq!(settings.services_dir, Some(PathBuf::from("/opt/svc")));
    }

    #[test]
    fn base_dir_of_bare_file_is_cwd() {
        assert_eq!(base_dir(Path::new("xdocker-compose.yml")), Path::new("."));
        assert_eq!(base_dir(Path::new("stack/app.yml")), Path::new("stack"));
    }
}
