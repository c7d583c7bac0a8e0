//! Port mapping edits and the bulk host-address remap applied by `up`.

use serde_yaml::Value;
use xdocker_common::constants::{LOCALHOST_ADDR, WILDCARD_ADDR};
use xdocker_common::error::{Result, XDockerError};

use crate::model::{ComposeFile, PORTS, host_side, sequence_entry, sequence_mut};

/// Source of the host's Tailscale address.
pub trait IpLookup {
    /// Returns the host's Tailscale IPv4 address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be determined.
    fn tailscale_ipv4(&self) -> Result<String>;
}

/// Address every published port is bound to by [`remap_ports`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindPolicy {
    /// Bind to the host's Tailscale address.
    Tailscale,
    /// Bind to the loopback address.
    Localhost,
}

/// Parameters of a bulk remap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapOptions {
    /// Address policy for services that are neither excluded nor global.
    pub policy: BindPolicy,
    /// Services whose ports are left exactly as written.
    pub exclude: Vec<String>,
    /// Services bound to every interface.
    pub bind_all: Vec<String>,
}

impl RemapOptions {
    /// Creates options with empty exclude and global lists.
    #[must_use]
    pub const fn new(policy: BindPolicy) -> Self {
        Self {
            policy,
            exclude: Vec::new(),
            bind_all: Vec::new(),
        }
    }
}

/// Appends `port` to the service's port list, creating the list if needed.
///
/// # Errors
///
/// Returns [`XDockerError::ServiceNotFound`] for an unknown service, or
/// [`XDockerError::Schema`] when `ports` is not a list.
pub fn add_port(config: &mut ComposeFile, service: &str, port: &str) -> Result<()> {
    let path = config.filename.clone();
    let definition = config
        .service_mut(service)
        .ok_or_else(|| XDockerError::ServiceNotFound {
            name: service.to_string(),
        })?;
    let ports = sequence_entry(definition, PORTS).ok_or_else(|| XDockerError::Schema {
        path,
        message: format!("ports of service {service} is not a list"),
    })?;
    ports.push(Value::from(port));
    tracing::info!(service, port, "port added");
    Ok(())
}

/// Removes, across all services, every entry whose host side equals `port`.
///
/// Returns the number of entries removed; running it again removes nothing.
pub fn remove_port(config: &mut ComposeFile, port: &str) -> usize {
    let mut removed = 0;
    for (name, service) in config.services_mut() {
        if let Some(ports) = sequence_mut(service, PORTS) {
            let before = ports.len();
            ports.retain(|entry| host_side(entry) != port);
            let count = before - ports.len();
            if count > 0 {
                tracing::info!(service = %name, port, count, "port removed");
            }
            removed += count;
        }
    }
    removed
}

/// Replaces, across all services, every entry whose host side equals `old`
/// with the literal `new`.
///
/// Returns the number of entries replaced.
pub fn update_port(config: &mut ComposeFile, old: &str, new: &str) -> usize {
    let mut updated = 0;
    for (name, service) in config.services_mut() {
        let Some(ports) = sequence_mut(service, PORTS) else {
            continue;
        };
        for entry in ports.iter_mut().filter(|e| host_side(e) == old) {
            *entry = Value::from(new);
            updated += 1;
            tracing::info!(service = %name, old, new, "port updated");
        }
    }
    updated
}

/// Prefixes every short-syntax port mapping with a host address.
///
/// Excluded services are skipped entirely, even when also listed in
/// `bind_all`. Services in `bind_all` are bound to `0.0.0.0`; all others
/// follow the policy. The Tailscale address is looked up at most once, and
/// only when a service actually needs it.
///
/// # Errors
///
/// Returns an error if the Tailscale address lookup fails.
pub fn remap_ports(
    config: &mut ComposeFile,
    options: &RemapOptions,
    lookup: &dyn IpLookup,
) -> Result<()> {
    let mut tailscale: Option<String> = None;
    for (name, service) in config.services_mut() {
        if options.exclude.contains(&name) {
            tracing::debug!(service = %name, "excluded from port remap");
            continue;
        }
        let Some(ports) = sequence_mut(service, PORTS) else {
            continue;
        };
        if ports.is_empty() {
            continue;
        }

        let address = if options.bind_all.contains(&name) {
            WILDCARD_ADDR.to_string()
        } else {
            match options.policy {
                BindPolicy::Localhost => LOCALHOST_ADDR.to_string(),
                BindPolicy::Tailscale => {
                    if let Some(ref ip) = tailscale {
                        ip.clone()
                    } else {
                        let ip = lookup.tailscale_ipv4()?;
                        tracing::debug!(ip = %ip, "resolved tailscale address");
                        tailscale = Some(ip.clone());
                        ip
                    }
                }
            }
        };

        tracing::debug!(service = %name, address = %address, "remapping ports");
        for entry in ports.iter_mut() {
            if let Some(mapped) = entry.as_str().and_then(|s| bind_to(s, &address)) {
                *entry = Value::from(mapped);
            }
        }
    }
    Ok(())
}

/// `h:c` becomes `addr:h:c` and `x:h:c` becomes `addr:h:c`. Anything else is
/// left alone.
fn bind_to(entry: &str, address: &str) -> Option<String> {
    let parts: Vec<&str> = entry.split(':').collect();
    match parts.as_slice() {
        [host, container] | [_, host, container] => Some(format!("{address}:{host}:{container}")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::Path;

    use super::*;
    use crate::loader::parse_document;

    struct FixedIp {
        calls: Cell<usize>,
    }

    impl FixedIp {
        const fn new() -> Self {
            Self {
                calls: Cell::new(0),
            }
        }
    }

    impl IpLookup for FixedIp {
        fn tailscale_ipv4(&self) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            Ok("100.64.0.7".into())
        }
    }

    struct NoTailscale;

    impl IpLookup for NoTailscale {
        fn tailscale_ipv4(&self) -> Result<String> {
            Err(XDockerError::Command {
                program: "tailscale".into(),
                message: "not installed".into(),
            })
        }
    }

    fn config(doc: &str) -> ComposeFile {
        parse_document(doc, Path::new("t.yml")).expect("parse")
    }

    fn ports(file: &ComposeFile, service: &str) -> Vec<String> {
        file.service(service)
            .and_then(|s| s.get(PORTS))
            .and_then(Value::as_sequence)
            .map(|seq| seq.iter().map(crate::model::render_plain).collect())
            .unwrap_or_default()
    }

    #[test]
    fn add_port_creates_list() {
        let mut file = config("services:\n  web:\n    image: nginx\n");
        add_port(&mut file, "web", "8080:80").expect("add");
        assert_eq!(ports(&file, "web"), vec!["8080:80"]);
    }

    #[test]
    fn add_port_to_unknown_service_fails() {
        let mut file = config("services:\n  web: {}\n");
        assert!(matches!(
            add_port(&mut file, "api", "1:1"),
            Err(XDockerError::ServiceNotFound { name }) if name == "api"
        ));
    }

    #[test]
    fn add_port_rejects_scalar_ports() {
        let mut file = config("services:\n  web:\n    ports: \"80:80\"\n");
        assert!(matches!(
            add_port(&mut file, "web", "1:1"),
            Err(XDockerError::Schema { .. })
        ));
    }

    #[test]
    fn remove_port_is_idempotent() {
        let mut file = config(
            "services:\n  a:\n    ports: [\"8080:80\", \"9000:9000\"]\n  b:\n    ports: [\"8080:8080\", 8080]\n",
        );
        assert_eq!(remove_port(&mut file, "8080"), 3);
        let once = file.clone();
        assert_eq!(remove_port(&mut file, "8080"), 0);
        assert_eq!(file, once);
        assert_eq!(ports(&file, "a"), vec!["9000:9000"]);
        assert!(ports(&file, "b").is_empty());
    }

    #[test]
    fn update_port_replaces_matching_entries() {
        let mut file = config(
            "services:\n  a:\n    ports: [\"8080:80\", \"9000:9000\"]\n  b:\n    ports: [\"8080:3000\"]\n",
        );
        assert_eq!(update_port(&mut file, "8080", "8081:80"), 2);
        assert_eq!(ports(&file, "a"), vec!["8081:80", "9000:9000"]);
        assert_eq!(ports(&file, "b"), vec!["8081:80"]);
    }

    #[test]
    fn localhost_policy_binds_loopback() {
        let mut file = config(
            "services:\n  web:\n    ports: [\"8080:80\", \"0.0.0.0:443:443\", \"9000\", 53]\n",
        );
        let lookup = FixedIp::new();
        remap_ports(&mut file, &RemapOptions::new(BindPolicy::Localhost), &lookup)
            .expect("remap");
        assert_eq!(
            ports(&file, "web"),
            vec!["127.0.0.1:8080:80", "127.0.0.1:443:443", "9000", "53"]
        );
        assert_eq!(lookup.calls.get(), 0);
    }

    #[test]
    fn tailscale_address_is_looked_up_once() {
        let mut file = config(
            "services:\n  a:\n    ports: [\"1:1\"]\n  b:\n    ports: [\"2:2\"]\n",
        );
        let lookup = FixedIp::new();
        remap_ports(&mut file, &RemapOptions::new(BindPolicy::Tailscale), &lookup)
            .expect("remap");
        assert_eq!(ports(&file, "a"), vec!["100.64.0.7:1:1"]);
        assert_eq!(ports(&file, "b"), vec!["100.64.0.7:2:2"]);
        assert_eq!(lookup.calls.get(), 1);
    }

    #[test]
    fn tailscale_lookup_skipped_when_not_needed() {
        let mut file = config("services:\n  a:\n    ports: [\"1:1\"]\n  b:\n    image: x\n");
        let mut options = RemapOptions::new(BindPolicy::Tailscale);
        options.bind_all = vec!["a".into()];
        remap_ports(&mut file, &options, &NoTailscale).expect("no lookup needed");
        assert_eq!(ports(&file, "a"), vec!["0.0.0.0:1:1"]);
    }

    #[test]
    fn tailscale_lookup_failure_propagates() {
        let mut file = config("services:\n  a:\n    ports: [\"1:1\"]\n");
        let result = remap_ports(
            &mut file,
            &RemapOptions::new(BindPolicy::Tailscale),
            &NoTailscale,
        );
        assert!(matches!(result, Err(XDockerError::Command { .. })));
    }

    #[test]
    fn exclusion_wins_over_bind_all() {
        let mut file = config(
            "services:\n  a:\n    ports: [\"1:1\"]\n  b:\n    ports: [\"2:2\"]\n  c:\n    ports: [\"3:3\"]\n",
        );
        let options = RemapOptions {
            policy: BindPolicy::Localhost,
            exclude: vec!["a".into()],
            bind_all: vec!["a".into(), "b".into()],
        };
        remap_ports(&mut file, &options, &FixedIp::new()).expect("remap");
        assert_eq!(ports(&file, "a"), vec!["1:1"]);
        assert_eq!(ports(&file, "b"), vec!["0.0.0.0:2:2"]);
        assert_eq!(ports(&file, "c"), vec!["127.0.0.1:3:3"]);
    }
}
