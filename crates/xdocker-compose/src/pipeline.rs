//! End-to-end resolution: compose file in, `docker-compose` manifest out.
//!
//! Stages run in a fixed order: load and merge the `extend` chain,
//! substitute environment variables and expressions, apply `skip`, expand
//! extensions, optionally remap ports, serialize. Any failure before the
//! final write leaves the output file untouched.

use std::path::Path;

use xdocker_common::error::Result;

use crate::emit::{to_manifest, to_source, write_atomic};
use crate::env::EnvSource;
use crate::expr::Evaluator;
use crate::extension::{ExtensionRegistry, dispatch};
use crate::instructions::apply_skip;
use crate::loader;
use crate::model::ComposeFile;
use crate::ports::{IpLookup, RemapOptions, remap_ports};
use crate::template::TemplateResolver;

/// Port remap applied before a manifest is written.
pub struct Remap<'a> {
    /// Bind policy and service lists.
    pub options: &'a RemapOptions,
    /// Source of the Tailscale address.
    pub lookup: &'a dyn IpLookup,
}

/// Collaborators shared by every stage of one invocation.
pub struct Pipeline<'a> {
    registry: &'a ExtensionRegistry,
    evaluator: &'a dyn Evaluator,
    env: &'a dyn EnvSource,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline over the given registry, evaluator and
    /// environment.
    #[must_use]
    pub fn new(
        registry: &'a ExtensionRegistry,
        evaluator: &'a dyn Evaluator,
        env: &'a dyn EnvSource,
    ) -> Self {
        Self {
            registry,
            evaluator,
            env,
        }
    }

    /// Loads `path` and runs every in-memory stage except the port remap.
    ///
    /// # Errors
    ///
    /// Returns the first loader, environment or extension error.
    pub fn resolve(&self, path: &Path) -> Result<ComposeFile> {
        let mut config = loader::load(path)?;
        tracing::debug!(
            file = %path.display(),
            services = config.services.len(),
            "configuration merged"
        );

        TemplateResolver::new(self.evaluator, self.env).resolve(&mut config)?;
        let skipped = apply_skip(&mut config);
        if !skipped.is_empty() {
            tracing::info!(services = ?skipped, "services will not start by default");
        }
        dispatch(&mut config, self.registry, self.evaluator, self.env)?;
        Ok(config)
    }

    /// Resolves `path` and writes its manifest to `output`.
    ///
    /// Returns the resolved document, whose `args` the caller may still
    /// need.
    ///
    /// # Errors
    ///
    /// Returns any resolution error, or an I/O error writing `output`.
    pub fn generate(
        &self,
        path: &Path,
        output: &Path,
        remap: Option<&Remap<'_>>,
    ) -> Result<ComposeFile> {
        let mut config = self.resolve(path)?;
        write_manifest(&mut config, output, remap)?;
        Ok(config)
    }
}

/// Applies `remap` if given, then atomically writes the manifest of
/// `config` to `output`.
///
/// # Errors
///
/// Returns a remap, serialization or I/O error. `output` is untouched on
/// failure.
pub fn write_manifest(
    config: &mut ComposeFile,
    output: &Path,
    remap: Option<&Remap<'_>>,
) -> Result<()> {
    if let Some(remap) = remap {
        remap_ports(config, remap.options, remap.lookup)?;
    }
    write_atomic(output, &to_manifest(config)?)?;
    tracing::info!(
        input = %config.filename.display(),
        output = %output.display(),
        "manifest generated"
    );
    Ok(())
}

/// Loads `path` with its `extend` chain merged, applies `edit`, and
/// atomically rewrites `path` in source form. Nothing is written if `edit`
/// fails.
///
/// # Errors
///
/// Returns any load error, the error returned by `edit`, or an I/O error
/// writing the file.
pub fn edit_in_place<T, F>(path: &Path, edit: F) -> Result<T>
where
    F: FnOnce(&mut ComposeFile) -> Result<T>,
{
    let mut config = loader::load(path)?;
    let outcome = edit(&mut config)?;
    write_atomic(path, &to_source(&config)?)?;
    tracing::debug!(file = %path.display(), "compose file rewritten");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    use serde_yaml::Value;
    use xdocker_common::error::XDockerError;

    use super::*;
    use crate::expr::Interpreter;
    use crate::extension::Extension;
    use crate::ports::{BindPolicy, add_port};

    struct StaticIp;

    impl IpLookup for StaticIp {
        fn tailscale_ipv4(&self) -> Result<String> {
            Ok("100.100.1.1".into())
        }
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).expect("write fixture");
        path
    }

    fn registry() -> ExtensionRegistry {
        let ext: Extension = serde_yaml::from_str(
            "name: cache\npath: /$service/cache\narguments:\n  size:\n    type: int\ngenerate: '{{ return \"volumes:\\n  - /data:\" .. size .. \":/cache\" }}'\n",
        )
        .expect("extension");
        std::iter::once(ext).collect()
    }

    fn env() -> HashMap<String, String> {
        std::iter::once(("TAG".to_string(), "1.4".to_string())).collect()
    }

    #[test]
    fn resolve_runs_every_stage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let _ = write(
            dir.path(),
            "base.yml",
            "services:\n  db:\n    image: postgres\n    skip: yes\n",
        );
        let path = write(
            dir.path(),
            "app.yml",
            "extend: base.yml\nservices:\n  web:\n    image: app:$TAG\n    cache: 256\n    ports: [\"8080:80\"]\n",
        );

        let (registry, vars) = (registry(), env());
        let pipeline = Pipeline::new(&registry, &Interpreter, &vars);
        let config = pipeline.resolve(&path).expect("resolve");

        let web = config.service("web").expect("web");
        assert_eq!(web.get("image"), Some(&Value::from("app:1.4")));
        assert!(web.get("cache").is_none());
        assert!(web.get("volumes").is_some());
        let db = config.service("db").expect("db");
        assert!(db.get("skip").is_none());
        assert!(db.get("profiles").is_some());
    }

    #[test]
    fn generate_writes_manifest_with_remap() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(
            dir.path(),
            "app.yml",
            "version: '3'\nargs: -d\nservices:\n  web:\n    image: nginx\n    ports: [\"8080:80\"]\n",
        );
        let output = dir.path().join("docker-compose-app.yml.yml");

        let (registry, vars) = (ExtensionRegistry::new(), env());
        let pipeline = Pipeline::new(&registry, &Interpreter, &vars);
        let options = RemapOptions::new(BindPolicy::Tailscale);
        let remap = Remap {
            options: &options,
            lookup: &StaticIp,
        };
        let config = pipeline
            .generate(&path, &output, Some(&remap))
            .expect("generate");
        assert_eq!(config.args, "-d");

        let written = fs::read_to_string(&output).expect("read manifest");
        assert!(written.contains("100.100.1.1:8080:80"), "got: {written}");
        assert!(!written.contains("version"), "got: {written}");
        assert!(!written.contains("args"), "got: {written}");
    }

    #[test]
    fn failed_resolution_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(
            dir.path(),
            "app.yml",
            "services:\n  web:\n    image: app:$UNSET_FOR_PIPELINE_TEST\n",
        );
        let output = dir.path().join("out.yml");

        let (registry, vars) = (ExtensionRegistry::new(), env());
        let pipeline = Pipeline::new(&registry, &Interpreter, &vars);
        let err = pipeline
            .generate(&path, &output, None)
            .expect_err("must fail");
        assert!(matches!(err, XDockerError::MissingEnvVars { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn edit_in_place_rewrites_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(
            dir.path(),
            "app.yml",
            "version: '3'\nservices:\n  web:\n    image: nginx\n",
        );

        edit_in_place(&path, |config| add_port(config, "web", "8080:80")).expect("edit");

        let reloaded = loader::load(&path).expect("reload");
        assert_eq!(reloaded.version, "3");
        let ports = reloaded
            .service("web")
            .and_then(|s| s.get("ports"))
            .and_then(Value::as_sequence)
            .expect("ports");
        assert_eq!(ports, &vec![Value::from("8080:80")]);
    }

    #[test]
    fn failed_edit_leaves_file_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = "services:\n  web:\n    image: nginx\n";
        let path = write(dir.path(), "app.yml", original);

        let result = edit_in_place(&path, |config| add_port(config, "api", "1:1"));
        assert!(matches!(result, Err(XDockerError::ServiceNotFound { .. })));
        assert_eq!(fs::read_to_string(&path).expect("read"), original);
    }
}
