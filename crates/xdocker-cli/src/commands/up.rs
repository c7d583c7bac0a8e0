//! `xdocker up` — Generate the manifest and start the stack.

use anyhow::Context;
use clap::{Args, Parser};
use xdocker_common::config::Settings;
use xdocker_common::constants::manifest_path;
use xdocker_compose::pipeline::{Remap, write_manifest};
use xdocker_compose::ports::{BindPolicy, RemapOptions};
use xdocker_runtime::compose::{Invocation, UpFlags};
use xdocker_runtime::tailscale::TailscaleCli;

use crate::output;

/// Arguments for the `up` command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct UpArgs {
    /// Run containers in the background.
    #[arg(short, long)]
    pub detach: bool,

    /// Keep containers of services no longer in the manifest.
    #[arg(long)]
    pub keep_orphans: bool,

    /// Start without building images.
    #[arg(long)]
    pub no_build: bool,

    /// Write the manifest without starting anything.
    #[arg(long)]
    pub dry: bool,

    /// Bind published ports to this host's Tailscale address.
    #[arg(long, conflicts_with = "localhost")]
    pub tailscale_ip: bool,

    /// Bind published ports to 127.0.0.1.
    #[arg(long)]
    pub localhost: bool,

    /// Services whose ports are left untouched (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Services bound to 0.0.0.0 (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub bind_all: Vec<String>,

    /// Services to start. All when empty.
    pub services: Vec<String>,
}

/// `up` flags written in the compose file's `args` field.
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct InlineArgs {
    #[command(flatten)]
    up: UpArgs,
}

impl UpArgs {
    /// Parses the whitespace-separated `args` string of a compose file.
    fn parse_inline(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        InlineArgs::try_parse_from(raw.split_whitespace())
            .map(|inline| inline.up)
            .with_context(|| format!("invalid args in compose file: {raw:?}"))
    }

    /// Combines command-line flags with inline ones. Flags are OR-ed, lists
    /// concatenated, inline services come first.
    fn merge(mut self, inline: Self) -> Self {
        self.detach |= inline.detach;
        self.keep_orphans |= inline.keep_orphans;
        self.no_build |= inline.no_build;
        self.dry |= inline.dry;
        self.tailscale_ip |= inline.tailscale_ip;
        self.localhost |= inline.localhost;
        self.exclude.extend(inline.exclude);
        self.bind_all.extend(inline.bind_all);
        let mut services = inline.services;
        services.append(&mut self.services);
        self.services = services;
        self
    }

    fn remap_options(&self) -> anyhow::Result<Option<RemapOptions>> {
        let policy = match (self.tailscale_ip, self.localhost) {
            (true, true) => anyhow::bail!("--tailscale-ip and --localhost cannot be combined"),
            (true, false) => BindPolicy::Tailscale,
            (false, true) => BindPolicy::Localhost,
            (false, false) => {
                if !self.exclude.is_empty() || !self.bind_all.is_empty() {
                    tracing::warn!(
                        "--exclude and --bind-all are ignored without --tailscale-ip or --localhost"
                    );
                }
                return Ok(None);
            }
        };
        Ok(Some(RemapOptions {
            policy,
            exclude: self.exclude.clone(),
            bind_all: self.bind_all.clone(),
        }))
    }

    const fn flags(&self) -> UpFlags {
        UpFlags {
            detach: self.detach,
            remove_orphans: !self.keep_orphans,
            build: !self.no_build,
        }
    }
}

/// Executes the `up` command.
///
/// # Errors
///
/// Returns an error if resolution, the manifest write or `docker-compose`
/// fails.
pub fn execute(args: UpArgs, settings: &Settings) -> anyhow::Result<()> {
    let mut config = super::resolve(settings)?;
    let args = args.merge(UpArgs::parse_inline(&config.args)?);
    tracing::debug!(args = ?args, "effective up arguments");

    let manifest = manifest_path(&settings.compose_file);
    let options = args.remap_options()?;
    let remap = options.as_ref().map(|options| Remap {
        options,
        lookup: &TailscaleCli,
    });
    write_manifest(&mut config, &manifest, remap.as_ref())
        .with_context(|| format!("failed to write {}", manifest.display()))?;
    output::success(&format!("Generated {}", manifest.display()));

    if args.dry {
        return Ok(());
    }
    Invocation::up(&manifest, args.flags(), &args.services)
        .run()
        .context("docker-compose up failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_inline_args() {
        let inline = UpArgs::parse_inline("-d --localhost --exclude db,cache worker").expect("parse");
        assert!(inline.detach);
        assert!(inline.localhost);
        assert_eq!(inline.exclude, strings(&["db", "cache"]));
        assert_eq!(inline.services, strings(&["worker"]));
    }

    #[test]
    fn blank_inline_args_are_empty() {
        assert_eq!(UpArgs::parse_inline("  ").expect("parse"), UpArgs::default());
    }

    #[test]
    fn unknown_inline_flag_is_an_error() {
        assert!(UpArgs::parse_inline("--frobnicate").is_err());
    }

    #[test]
    fn merge_ors_flags_and_puts_inline_services_first() {
        let cli = UpArgs {
            no_build: true,
            bind_all: strings(&["proxy"]),
            services: strings(&["web"]),
            ..UpArgs::default()
        };
        let inline = UpArgs {
            detach: true,
            bind_all: strings(&["dns"]),
            services: strings(&["db"]),
            ..UpArgs::default()
        };
        let merged = cli.merge(inline);
        assert!(merged.detach && merged.no_build);
        assert_eq!(merged.bind_all, strings(&["proxy", "dns"]));
        assert_eq!(merged.services, strings(&["db", "web"]));
    }

    #[test]
    fn remap_requires_a_policy() {
        let args = UpArgs {
            exclude: strings(&["db"]),
            ..UpArgs::default()
        };
        assert!(args.remap_options().expect("options").is_none());

        let args = UpArgs {
            localhost: true,
            exclude: strings(&["db"]),
            ..UpArgs::default()
        };
        let options = args.remap_options().expect("options").expect("remap");
        assert_eq!(options.policy, BindPolicy::Localhost);
        assert_eq!(options.exclude, strings(&["db"]));
    }

    #[test]
    fn both_policies_are_rejected() {
        let args = UpArgs {
            localhost: true,
            tailscale_ip: true,
            ..UpArgs::default()
        };
        assert!(args.remap_options().is_err());
    }

    #[test]
    fn defaults_build_and_remove_orphans() {
        let flags = UpArgs::default().flags();
        assert!(flags.build && flags.remove_orphans && !flags.detach);
    }
}
