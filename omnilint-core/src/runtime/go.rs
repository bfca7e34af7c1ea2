//! Go tooling via `go install` into a dedicated cache.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::spec::{slugify, split_package_spec};
use super::strategy::{
    load_json, make_executable, prepend_path_environment, project_binary, write_json,
    RuntimeContext, RuntimeStrategy,
};
use super::versioning::VersionResolver;
use super::{CommandSource, PreparedCommand};
use crate::execute::process::{CommandOptions, CommandRunner};

pub struct GoStrategy {
    versions: Arc<VersionResolver>,
    runner: Arc<dyn CommandRunner>,
}

impl GoStrategy {
    pub fn new(versions: Arc<VersionResolver>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { versions, runner }
    }

    fn module_spec(ctx: &RuntimeContext) -> (String, Option<String>) {
        match &ctx.tool.package {
            Some(package) => split_package_spec(package),
            None => (ctx.tool.name.clone(), ctx.tool.min_version.clone()),
        }
    }

    async fn ensure_local_tool(&self, ctx: &RuntimeContext) -> Result<PathBuf> {
        if which::which("go").is_err() {
            bail!("Go toolchain is required to install go-based linters");
        }

        let (module, version_spec) = Self::module_spec(ctx);
        let requirement = format!("{module}@{}", version_spec.as_deref().unwrap_or("latest"));
        let slug = slugify(&requirement);
        let paths = ctx.layout.go();
        let meta_file = paths.meta_dir.join(format!("{slug}.json"));
        let binary = paths.bin_dir.join(ctx.binary_name());

        if binary.exists() && meta_file.exists() {
            if let Some(meta) = load_json(&meta_file) {
                if meta.get("requirement").and_then(Value::as_str) == Some(requirement.as_str()) {
                    return Ok(binary);
                }
            }
        }

        let work = match paths.work_dir.clone() {
            Some(work) => work,
            None => bail!("go cache layout is missing its work directory"),
        };
        for subdir in ["gopath", "gocache", "modcache"] {
            std::fs::create_dir_all(work.join(subdir))?;
        }
        std::fs::create_dir_all(&paths.bin_dir)?;
        std::fs::create_dir_all(&paths.meta_dir)?;

        let mut env = BTreeMap::new();
        let _ = env.insert(
            "GOBIN".to_string(),
            paths.bin_dir.to_string_lossy().into_owned(),
        );
        let _ = env.insert(
            "GOCACHE".to_string(),
            work.join("gocache").to_string_lossy().into_owned(),
        );
        let _ = env.insert(
            "GOMODCACHE".to_string(),
            work.join("modcache").to_string_lossy().into_owned(),
        );
        let _ = env.insert(
            "GOPATH".to_string(),
            work.join("gopath").to_string_lossy().into_owned(),
        );

        let argv = vec!["go".to_string(), "install".to_string(), requirement.clone()];
        let options = CommandOptions {
            env,
            ..CommandOptions::default()
        };
        let output = self.runner.run(&argv, &options).await?;
        if output.returncode != 0 {
            bail!(
                "go install failed for '{}': {}",
                ctx.tool.name,
                output.stderr.trim()
            );
        }
        if !binary.exists() {
            bail!("failed to install go tool '{}'", ctx.tool.name);
        }
        write_json(&meta_file, &json!({ "requirement": requirement }))?;
        make_executable(&binary)?;
        Ok(binary)
    }
}

#[async_trait]
impl RuntimeStrategy for GoStrategy {
    fn versions(&self) -> &VersionResolver {
        &self.versions
    }

    async fn try_project(&self, ctx: &RuntimeContext) -> Result<Option<PreparedCommand>> {
        Ok(project_binary(ctx, "bin"))
    }

    async fn prepare_local(&self, ctx: &RuntimeContext) -> Result<PreparedCommand> {
        let binary = self.ensure_local_tool(ctx).await?;
        let mut cmd = ctx.command_list();
        if cmd.is_empty() {
            bail!("empty command for go tool '{}'", ctx.tool.name);
        }
        cmd[0] = binary.to_string_lossy().into_owned();
        let env = prepend_path_environment(&ctx.layout.go().bin_dir, &ctx.root, &[]);
        let mut version = None;
        if let Some(command) = &ctx.tool.version_command {
            version = self.versions.capture(command, Some(&env)).await;
        }
        Ok(PreparedCommand {
            cmd,
            env,
            version,
            source: CommandSource::Local,
        })
    }
}
