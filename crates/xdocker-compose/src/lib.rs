//! # xdocker-compose
//!
//! Resolution engine turning an xdocker compose file into a plain
//! `docker-compose` manifest.
//!
//! Handles:
//! - **Loader**: Reading documents and merging their `extend` chain.
//! - **Template**: `$VAR` substitution and `{{ }}` expression evaluation.
//! - **Expr**: The expression language behind templates and extensions.
//! - **Extension**: Loading extension definitions and expanding service fields.
//! - **Instructions**: Built-in service fields such as `skip`.
//! - **Ports / Volumes / Snippets**: Direct edits of a compose file.
//! - **Emit**: Manifest and source serialization, atomic writes.
//! - **Pipeline**: The stages above wired in order.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod emit;
pub mod env;
pub mod expr;
pub mod extension;
pub mod instructions;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod ports;
pub mod snippets;
pub mod template;
pub mod volumes;
