//! Lua tooling via luarocks trees.
//!
//! Installs land in a per-requirement tree; the produced binary is
//! copied into the shared `lua/bin` directory so PATH handling stays
//! uniform.

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

pub struct LuaStrategy {
    versions: Arc<VersionResolver>,
    runner: Arc<dyn CommandRunner>,
}

impl LuaStrategy {
    pub fn new(versions: Arc<VersionResolver>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { versions, runner }
    }

    fn package_spec(ctx: &RuntimeContext) -> (String, Option<String>) {
        match &ctx.tool.package {
            Some(package) => split_package_spec(package),
            None => (ctx.tool.name.clone(), ctx.tool.min_version.clone()),
        }
    }

    async fn ensure_local_tool(&self, ctx: &RuntimeContext) -> Result<PathBuf> {
        if which::which("luarocks").is_err() {
            bail!("luarocks is required to install Lua-based linters");
        }

        let (package, version) = Self::package_spec(ctx);
        let paths = ctx.layout.lua();
        let slug = slugify(&format!(
            "{package}@{}",
            version.as_deref().unwrap_or("latest")
        ));
        let prefix = paths.cache_dir.join(&slug);
        let meta_file = paths.meta_dir.join(format!("{slug}.json"));
        let binary = paths.bin_dir.join(ctx.binary_name());

        if binary.exists() && meta_file.exists() {
            if let Some(meta) = load_json(&meta_file) {
                let package_matches =
                    meta.get("package").and_then(Value::as_str) == Some(package.as_str());
                let version_matches = meta.get("version").and_then(Value::as_str)
                    == version.as_deref();
                if package_matches && version_matches {
                    return Ok(binary);
                }
            }
        }

        std::fs::create_dir_all(&prefix)?;
        std::fs::create_dir_all(&paths.meta_dir)?;
        std::fs::create_dir_all(&paths.bin_dir)?;
        if let Some(work) = &paths.work_dir {
            std::fs::create_dir_all(work)?;
        }

        let mut argv = vec![
            "luarocks".to_string(),
            "--tree".to_string(),
            prefix.to_string_lossy().into_owned(),
            "install".to_string(),
            package.clone(),
        ];
        if let Some(version) = &version {
            argv.push(version.clone());
        }
        let output = self.runner.run(&argv, &CommandOptions::default()).await?;
        if output.returncode != 0 {
            bail!(
                "luarocks install failed for '{}': {}",
                ctx.tool.name,
                output.stderr.trim()
            );
        }

        let target = prefix.join("bin").join(ctx.binary_name());
        if !target.exists() {
            bail!("failed to install lua tool '{}'", ctx.tool.name);
        }
        let _ = std::fs::copy(&target, &binary)?;
        make_executable(&binary)?;
        write_json(&meta_file, &json!({ "package": package, "version": version }))?;
        Ok(binary)
    }
}

#[async_trait]
impl RuntimeStrategy for LuaStrategy {
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
            bail!("empty command for lua tool '{}'", ctx.tool.name);
        }
        cmd[0] = binary.to_string_lossy().into_owned();
        let env = prepend_path_environment(&ctx.layout.lua().bin_dir, &ctx.root, &[]);
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
