//! Tailscale address lookup through the `tailscale` CLI.

use xdocker_common::error::{Result, XDockerError};
use xdocker_compose::ports::IpLookup;

use crate::process;

const TAILSCALE: &str = "tailscale";

/// Reads the host's Tailscale IPv4 address with `tailscale ip --4`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TailscaleCli;

impl IpLookup for TailscaleCli {
    fn tailscale_ipv4(&self) -> Result<String> {
        let mut cmd = process::command(TAILSCALE)?;
        let _ = cmd.args(["ip", "--4"]);
        let output = process::capture(TAILSCALE, &mut cmd)?;
        process::check_status(TAILSCALE, output.status)?;
        parse_address(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_address(output: &str) -> Result<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| XDockerError::Command {
            program: TAILSCALE.into(),
            message: "no IPv4 address reported".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_address() {
        assert_eq!(
            parse_address("100.101.102.103\n").expect("address"),
            "100.101.102.103"
        );
    }

    #[test]
    fn empty_output_is_an_error() {
        assert!(parse_address("\n").is_err());
    }
}
