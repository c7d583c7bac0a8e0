//! External collaborators of the xdocker resolution core.
//!
//! Everything here shells out: `docker-compose` and `docker` for the
//! deployed stack, `tailscale` for address lookup, `bash`/`ssh` for host
//! provisioning.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod compose;
pub mod container;
pub mod install;
pub mod process;
pub mod tailscale;
