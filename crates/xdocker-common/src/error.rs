//! Unified error types for the xdocker workspace.
//!
//! Every fatal failure of the resolution pipeline maps onto one variant of
//! [`XDockerError`]. Each variant carries enough context (file, service,
//! extension, variable names) to locate the offending source.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum XDockerError {
    /// A file or directory could not be read or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A YAML document is malformed or has the wrong shape.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },

    /// A document has valid YAML syntax but an unexpected structure.
    #[error("invalid document {path}: {message}")]
    Schema {
        /// File containing the invalid structure.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// The `extend` chain loops back onto a file already being resolved.
    #[error("circular dependency detected in file: {}", .path.display())]
    CircularDependency {
        /// File that closes the cycle.
        path: PathBuf,
    },

    /// One or more `$VAR` references have no value in the environment.
    #[error(
        "missing required environment variables in service {service} ({field}): {}",
        .names.join(", ")
    )]
    MissingEnvVars {
        /// Service owning the string.
        service: String,
        /// Field path of the string inside the service.
        field: String,
        /// Every missing variable, in order of first appearance.
        names: Vec<String>,
    },

    /// An extension argument value does not fit its declared type.
    #[error(
        "extension {extension} (service {service}): cannot convert {value:?} to {expected} for argument {argument}"
    )]
    TypeCoercion {
        /// Extension declaring the argument.
        extension: String,
        /// Service whose field supplied the value.
        service: String,
        /// Argument name.
        argument: String,
        /// Declared argument type.
        expected: &'static str,
        /// Offending literal.
        value: String,
    },

    /// An extension's `generate` expression was rejected by the evaluator.
    #[error("error processing extension {extension} for service {service}: {message}")]
    Expression {
        /// Extension being evaluated.
        extension: String,
        /// Service being expanded.
        service: String,
        /// Evaluator diagnostic.
        message: String,
    },

    /// An extension produced output that is not a YAML mapping.
    #[error("error parsing extension result for {extension}: {message}\nResult:\n{output}")]
    ExtensionResult {
        /// Extension that produced the output.
        extension: String,
        /// Parse diagnostic.
        message: String,
        /// The rendered output.
        output: String,
    },

    /// A direct-edit operation targets a service that does not exist.
    #[error("service not found: {name}")]
    ServiceNotFound {
        /// Name of the missing service.
        name: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An external program could not be run or exited unsuccessfully.
    #[error("{program} failed: {message}")]
    Command {
        /// Program that failed.
        program: String,
        /// Exit status or spawn error.
        message: String,
    },
}

impl XDockerError {
    /// Builds an [`XDockerError::Io`] for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, XDockerError>;
