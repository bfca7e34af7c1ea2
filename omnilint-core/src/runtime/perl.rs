//! Perl tooling via cpanm local::lib installs.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::spec::slugify;
use super::strategy::{
    load_json, make_executable, prepend_path_environment, project_binary, write_json,
    RuntimeContext, RuntimeStrategy,
};
use super::versioning::VersionResolver;
use super::{CommandSource, PreparedCommand};
use crate::execute::process::{CommandOptions, CommandRunner};

pub struct PerlStrategy {
    versions: Arc<VersionResolver>,
    runner: Arc<dyn CommandRunner>,
}

impl PerlStrategy {
    pub fn new(versions: Arc<VersionResolver>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { versions, runner }
    }

    async fn ensure_local_tool(&self, ctx: &RuntimeContext) -> Result<PathBuf> {
        let requirement = ctx
            .tool
            .package
            .clone()
            .unwrap_or_else(|| ctx.tool.name.clone());
        let slug = slugify(&requirement);
        let paths = ctx.layout.perl();
        let prefix = paths.cache_dir.join(&slug);
        let meta_file = paths.meta_dir.join(format!("{slug}.json"));
        let binary = paths.bin_dir.join(ctx.binary_name());

        if binary.exists() && meta_file.exists() {
            if let Some(meta) = load_json(&meta_file) {
                if meta.get("requirement").and_then(Value::as_str) == Some(requirement.as_str()) {
                    return Ok(binary);
                }
            }
        }

        std::fs::create_dir_all(&prefix)?;
        std::fs::create_dir_all(&paths.meta_dir)?;
        std::fs::create_dir_all(&paths.bin_dir)?;

        let argv = vec![
            "cpanm".to_string(),
            "--notest".to_string(),
            "--reinstall".to_string(),
            "--local-lib-contained".to_string(),
            prefix.to_string_lossy().into_owned(),
            requirement.clone(),
        ];
        let output = self.runner.run(&argv, &CommandOptions::default()).await?;
        if output.returncode != 0 {
            bail!(
                "cpanm install failed for '{}': {}",
                ctx.tool.name,
                output.stderr.trim()
            );
        }

        let target = prefix.join("bin").join(ctx.binary_name());
        if !target.exists() {
            bail!("failed to install perl tool '{}'", ctx.tool.name);
        }
        let _ = std::fs::copy(&target, &binary)?;
        make_executable(&binary)?;
        write_json(&meta_file, &json!({ "requirement": requirement }))?;
        Ok(binary)
    }

    fn perl_env(ctx: &RuntimeContext) -> std::collections::BTreeMap<String, String> {
        prepend_path_environment(&ctx.layout.perl().bin_dir, &ctx.root, &[])
    }
}

#[async_trait]
impl RuntimeStrategy for PerlStrategy {
    fn versions(&self) -> &VersionResolver {
        &self.versions
    }

    async fn try_project(&self, ctx: &RuntimeContext) -> Result<Option<PreparedCommand>> {
        let Some(mut prepared) = project_binary(ctx, "bin") else {
            return Ok(None);
        };
        let env = Self::perl_env(ctx);
        if let Some(command) = &ctx.tool.version_command {
            prepared.version = self.versions.capture(command, Some(&env)).await;
        }
        prepared.env = env;
        Ok(Some(prepared))
    }

    async fn prepare_local(&self, ctx: &RuntimeContext) -> Result<PreparedCommand> {
        let binary = self.ensure_local_tool(ctx).await?;
        let mut cmd = ctx.command_list();
        if cmd.is_empty() {
            bail!("empty command for perl tool '{}'", ctx.tool.name);
        }
        cmd[0] = binary.to_string_lossy().into_owned();
        let env = Self::perl_env(ctx);
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
