//! Rust tooling via `cargo install`, with rustup component support.
//!
//! A `rustup:<component>` package spec installs the component instead of
//! a crate and runs the tool through cargo itself.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::spec::{slugify, split_package_spec};
use super::strategy::{
    load_json, make_executable, project_binary, write_json, RuntimeContext, RuntimeStrategy,
};
use super::versioning::VersionResolver;
use super::{CommandSource, PreparedCommand};
use crate::execute::process::{CommandOptions, CommandRunner};

pub struct RustStrategy {
    versions: Arc<VersionResolver>,
    runner: Arc<dyn CommandRunner>,
}

impl RustStrategy {
    pub fn new(versions: Arc<VersionResolver>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { versions, runner }
    }

    fn crate_spec(ctx: &RuntimeContext) -> (String, Option<String>) {
        match &ctx.tool.package {
            Some(package) => {
                let (name, version) = split_package_spec(package);
                (name, version.or_else(|| ctx.tool.min_version.clone()))
            }
            None => (ctx.tool.name.clone(), ctx.tool.min_version.clone()),
        }
    }

    async fn ensure_local_tool(&self, ctx: &RuntimeContext) -> Result<PathBuf> {
        if which::which("cargo").is_err() {
            bail!("Cargo toolchain is required to install rust-based linters");
        }

        let (crate_name, version_spec) = Self::crate_spec(ctx);
        let paths = ctx.layout.rust();

        if let Some(component) = crate_name.strip_prefix("rustup:") {
            let requirement = format!("rustup:{component}");
            let slug = slugify(&requirement);
            let meta_file = paths.meta_dir.join(format!("{slug}.json"));
            if !meta_file.exists() {
                self.install_rustup_component(component).await?;
                write_json(&meta_file, &json!({ "requirement": requirement }))?;
            }
            let cargo = which::which("cargo").context("cargo executable not found")?;
            return Ok(cargo);
        }

        let requirement = match &version_spec {
            Some(version) => format!("{crate_name}@{version}"),
            None => crate_name.clone(),
        };
        let slug = slugify(&requirement);
        let prefix = paths.cache_dir.join(&slug);
        let binary = prefix.join("bin").join(ctx.binary_name());
        let meta_file = paths.meta_dir.join(format!("{slug}.json"));

        if binary.exists() && meta_file.exists() {
            if let Some(meta) = load_json(&meta_file) {
                if meta.get("requirement").and_then(Value::as_str) == Some(requirement.as_str()) {
                    return Ok(binary);
                }
            }
        }

        std::fs::create_dir_all(&paths.meta_dir)?;
        for subdir in ["bin", "cargo", "target"] {
            std::fs::create_dir_all(prefix.join(subdir))?;
        }

        let mut env = BTreeMap::new();
        let _ = env.insert(
            "CARGO_HOME".to_string(),
            prefix.join("cargo").to_string_lossy().into_owned(),
        );
        let _ = env.insert(
            "CARGO_TARGET_DIR".to_string(),
            prefix.join("target").to_string_lossy().into_owned(),
        );

        let mut argv = vec![
            "cargo".to_string(),
            "install".to_string(),
            crate_name.clone(),
            "--root".to_string(),
            prefix.to_string_lossy().into_owned(),
            "--locked".to_string(),
        ];
        if let Some(version) = &version_spec {
            argv.push("--version".to_string());
            argv.push(version.clone());
        }
        let options = CommandOptions {
            env,
            ..CommandOptions::default()
        };
        let output = self.runner.run(&argv, &options).await?;
        if output.returncode != 0 {
            bail!(
                "cargo install failed for '{}': {}",
                ctx.tool.name,
                output.stderr.trim()
            );
        }
        if !binary.exists() {
            bail!("failed to install rust tool '{}'", ctx.tool.name);
        }
        write_json(&meta_file, &json!({ "requirement": requirement }))?;
        make_executable(&binary)?;
        Ok(binary)
    }

    async fn install_rustup_component(&self, component: &str) -> Result<()> {
        if which::which("rustup").is_err() {
            bail!("rustup is required to install rustup components");
        }
        let argv = vec![
            "rustup".to_string(),
            "component".to_string(),
            "add".to_string(),
            component.to_string(),
        ];
        let output = self.runner.run(&argv, &CommandOptions::default()).await?;
        if output.returncode != 0 {
            bail!(
                "rustup component add '{component}' failed: {}",
                output.stderr.trim()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl RuntimeStrategy for RustStrategy {
    fn versions(&self) -> &VersionResolver {
        &self.versions
    }

    async fn try_project(&self, ctx: &RuntimeContext) -> Result<Option<PreparedCommand>> {
        let Some(mut prepared) = project_binary(ctx, "bin") else {
            return Ok(None);
        };
        if let Some(command) = &ctx.tool.version_command {
            prepared.version = self.versions.capture(command, None).await;
        }
        Ok(Some(prepared))
    }

    async fn prepare_local(&self, ctx: &RuntimeContext) -> Result<PreparedCommand> {
        let binary = self.ensure_local_tool(ctx).await?;
        let mut cmd = ctx.command_list();
        if cmd.is_empty() {
            bail!("empty command for rust tool '{}'", ctx.tool.name);
        }
        cmd[0] = binary.to_string_lossy().into_owned();
        let mut version = None;
        if let Some(command) = &ctx.tool.version_command {
            version = self.versions.capture(command, None).await;
        }
        Ok(PreparedCommand {
            cmd,
            env: BTreeMap::new(),
            version,
            source: CommandSource::Local,
        })
    }
}
