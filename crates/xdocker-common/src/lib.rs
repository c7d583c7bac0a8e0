//! # xdocker-common
//!
//! Shared error definitions, settings, and constants used across the
//! entire xdocker workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the foundational primitives that the
//! resolution core, the runtime collaborators, and the CLI build upon.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
