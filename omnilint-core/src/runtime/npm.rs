//! Node tooling with cached `npm install --prefix` trees.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::spec::{desired_version, slugify, split_package_spec};
use super::strategy::{load_json, write_json, RuntimeContext, RuntimeStrategy};
use super::versioning::VersionResolver;
use super::{CommandSource, PreparedCommand};
use crate::execute::process::{CommandOptions, CommandRunner};

const META_FILE: &str = ".omnilint-meta.json";

pub struct NpmStrategy {
    versions: Arc<VersionResolver>,
    runner: Arc<dyn CommandRunner>,
}

impl NpmStrategy {
    pub fn new(versions: Arc<VersionResolver>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { versions, runner }
    }

    fn requirement(ctx: &RuntimeContext) -> String {
        if let Some(package) = &ctx.tool.package {
            return package.clone();
        }
        match desired_version(&ctx.tool) {
            Some(target) => format!("{}@{}", ctx.tool.name, target),
            None => ctx.tool.name.clone(),
        }
    }

    fn cache_env(ctx: &RuntimeContext) -> Vec<(&'static str, String)> {
        let cache = ctx.layout.npm_cache_dir().to_string_lossy().into_owned();
        vec![
            ("NPM_CONFIG_CACHE", cache.clone()),
            ("npm_config_cache", cache),
        ]
    }

    fn project_env(ctx: &RuntimeContext, bin_dir: &Path) -> BTreeMap<String, String> {
        super::strategy::prepend_path_environment(bin_dir, &ctx.root, &Self::cache_env(ctx))
    }

    fn local_env(ctx: &RuntimeContext, bin_dir: &Path, prefix: &Path) -> BTreeMap<String, String> {
        let mut extra = Self::cache_env(ctx);
        let prefix_value = prefix.to_string_lossy().into_owned();
        extra.push(("NPM_CONFIG_PREFIX", prefix_value.clone()));
        extra.push(("npm_config_prefix", prefix_value));
        super::strategy::prepend_path_environment(bin_dir, &ctx.root, &extra)
    }

    /// Install (or reuse) the cached package tree and return its prefix
    /// plus the version recorded at install time.
    async fn ensure_local_package(
        &self,
        ctx: &RuntimeContext,
    ) -> Result<(PathBuf, Option<String>)> {
        let requirement = Self::requirement(ctx);
        let packages: Vec<String> = requirement
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if packages.is_empty() {
            bail!("no npm packages specified for tool '{}'", ctx.tool.name);
        }
        let slug = slugify(&packages.join(" "));
        let prefix = ctx.layout.node_cache_dir().join(&slug);
        let meta_path = prefix.join(META_FILE);
        let bin_dir = prefix.join("node_modules").join(".bin");

        if meta_path.is_file() && bin_dir.exists() {
            if let Some(meta) = load_json(&meta_path) {
                if meta.get("requirement").and_then(Value::as_str) == Some(requirement.as_str()) {
                    let version = meta
                        .get("version")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    return Ok((prefix, version));
                }
            }
        }

        std::fs::create_dir_all(&prefix)?;
        let env = Self::local_env(ctx, &bin_dir, &prefix);
        let mut argv = vec![
            "npm".to_string(),
            "install".to_string(),
            "--prefix".to_string(),
            prefix.to_string_lossy().into_owned(),
        ];
        argv.extend(packages.iter().cloned());
        let options = CommandOptions {
            env: env.clone(),
            ..CommandOptions::default()
        };
        let output = self.runner.run(&argv, &options).await?;
        if output.returncode != 0 {
            bail!(
                "npm install failed for '{}': {}",
                ctx.tool.name,
                output.stderr.trim()
            );
        }

        let version = self.resolve_installed_version(ctx, &prefix, &packages, &env).await;
        write_json(
            &meta_path,
            &json!({ "requirement": requirement, "version": version }),
        )?;
        Ok((prefix, version))
    }

    /// Ask npm which version actually landed for the primary package.
    async fn resolve_installed_version(
        &self,
        ctx: &RuntimeContext,
        prefix: &Path,
        packages: &[String],
        env: &BTreeMap<String, String>,
    ) -> Option<String> {
        let (package_name, _) = split_package_spec(packages.first()?);
        let argv = vec![
            "npm".to_string(),
            "ls".to_string(),
            package_name.clone(),
            "--prefix".to_string(),
            prefix.to_string_lossy().into_owned(),
            "--depth".to_string(),
            "0".to_string(),
            "--json".to_string(),
        ];
        let options = CommandOptions {
            env: env.clone(),
            ..CommandOptions::default()
        };
        let output = self.runner.run(&argv, &options).await.ok()?;
        let payload: Value = serde_json::from_str(&output.stdout).ok()?;
        let raw = payload
            .get("dependencies")?
            .get(&package_name)?
            .get("version")?
            .as_str()?;
        self.versions.normalize(raw)
    }
}

#[async_trait]
impl RuntimeStrategy for NpmStrategy {
    fn versions(&self) -> &VersionResolver {
        &self.versions
    }

    async fn try_project(&self, ctx: &RuntimeContext) -> Result<Option<PreparedCommand>> {
        let bin_dir = ctx.root.join("node_modules").join(".bin");
        let executable = bin_dir.join(ctx.binary_name());
        if !executable.exists() {
            return Ok(None);
        }
        let env = Self::project_env(ctx, &bin_dir);
        let mut version = None;
        if let Some(command) = &ctx.tool.version_command {
            version = self.versions.capture(command, Some(&env)).await;
        }
        if !self
            .versions
            .is_compatible(version.as_deref(), ctx.target_version.as_deref())
        {
            return Ok(None);
        }
        let mut cmd = ctx.command_list();
        cmd[0] = executable.to_string_lossy().into_owned();
        Ok(Some(PreparedCommand {
            cmd,
            env,
            version,
            source: CommandSource::Project,
        }))
    }

    async fn prepare_local(&self, ctx: &RuntimeContext) -> Result<PreparedCommand> {
        let (prefix, cached_version) = self.ensure_local_package(ctx).await?;
        let bin_dir = prefix.join("node_modules").join(".bin");
        let executable = bin_dir.join(ctx.binary_name());
        let mut cmd = ctx.command_list();
        if cmd.is_empty() {
            bail!("empty command for npm tool '{}'", ctx.tool.name);
        }
        cmd[0] = executable.to_string_lossy().into_owned();
        let env = Self::local_env(ctx, &bin_dir, &prefix);
        let mut version = cached_version;
        if version.is_none() {
            if let Some(command) = &ctx.tool.version_command {
                version = self.versions.capture(command, Some(&env)).await;
            }
        }
        Ok(PreparedCommand {
            cmd,
            env,
            version,
            source: CommandSource::Local,
        })
    }
}
