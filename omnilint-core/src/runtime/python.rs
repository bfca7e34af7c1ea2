//! Python tooling via uv.
//!
//! No binary is pre-installed: `uv run --with <requirement>` resolves
//! the tool per invocation against the shared uv cache.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::strategy::{RuntimeContext, RuntimeStrategy};
use super::versioning::VersionResolver;
use super::{CommandSource, PreparedCommand};

pub struct PythonStrategy {
    versions: Arc<VersionResolver>,
    /// Project manifest uv resolves against; falls back to standalone
    /// `uv run` when unset.
    uv_project: Option<PathBuf>,
}

impl PythonStrategy {
    pub fn new(versions: Arc<VersionResolver>) -> Self {
        let uv_project = std::env::var_os("OMNILINT_UV_PROJECT").map(PathBuf::from);
        Self {
            versions,
            uv_project,
        }
    }

    pub fn with_uv_project(mut self, project: impl Into<PathBuf>) -> Self {
        self.uv_project = Some(project.into());
        self
    }

    fn requirement(ctx: &RuntimeContext) -> String {
        let base = ctx
            .tool
            .package
            .clone()
            .unwrap_or_else(|| ctx.tool.name.clone());
        match &ctx.tool.min_version {
            Some(minimum) => format!("{base}=={minimum}"),
            None => base,
        }
    }
}

#[async_trait]
impl RuntimeStrategy for PythonStrategy {
    fn versions(&self) -> &VersionResolver {
        &self.versions
    }

    /// The active environment (virtualenv or project interpreter) is
    /// the project candidate: the executable must already resolve and
    /// satisfy the target version.
    async fn try_project(&self, ctx: &RuntimeContext) -> Result<Option<PreparedCommand>> {
        let mut version = None;
        if let Some(command) = &ctx.tool.version_command {
            version = self.versions.capture(command, None).await;
        }
        if version.is_none() && ctx.target_version.is_some() {
            return Ok(None);
        }
        if !self
            .versions
            .is_compatible(version.as_deref(), ctx.target_version.as_deref())
        {
            return Ok(None);
        }
        Ok(Some(PreparedCommand {
            cmd: ctx.command_list(),
            env: BTreeMap::new(),
            version,
            source: CommandSource::Project,
        }))
    }

    async fn prepare_local(&self, ctx: &RuntimeContext) -> Result<PreparedCommand> {
        let requirement = Self::requirement(ctx);
        let mut cmd = vec!["uv".to_string()];
        if let Some(project) = &self.uv_project {
            cmd.push("--project".to_string());
            cmd.push(project.to_string_lossy().into_owned());
        }
        cmd.push("run".to_string());
        cmd.push("--with".to_string());
        cmd.push(requirement);
        cmd.extend(ctx.command_list());

        let mut env = BTreeMap::new();
        let _ = env.insert(
            "UV_CACHE_DIR".to_string(),
            ctx.layout.uv_dir().to_string_lossy().into_owned(),
        );
        if let Some(project) = &self.uv_project {
            let _ = env.insert(
                "UV_PROJECT".to_string(),
                project.to_string_lossy().into_owned(),
            );
        }

        let mut version = None;
        if let Some(command) = &ctx.tool.version_command {
            version = self.versions.capture(command, None).await;
        }
        Ok(PreparedCommand {
            cmd,
            env,
            version,
            source: CommandSource::Local,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RuntimeKind, ToolDefinition};
    use crate::runtime::layout::ToolCacheLayout;

    fn context(tool: ToolDefinition, root: &std::path::Path) -> RuntimeContext {
        RuntimeContext::new(
            Arc::new(tool),
            vec!["ruff".to_string(), "check".to_string()],
            root.to_path_buf(),
            ToolCacheLayout::new(root.join(".cache")),
        )
    }

    #[tokio::test]
    async fn local_command_wraps_the_tool_in_uv_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let strategy = PythonStrategy::new(Arc::new(VersionResolver::new()));
        let tool = ToolDefinition::new("ruff", RuntimeKind::Python)
            .with_package("ruff")
            .with_min_version("0.6.0");
        let prepared = strategy
            .prepare_local(&context(tool, dir.path()))
            .await
            .expect("prepare");
        assert_eq!(
            prepared.cmd[..4],
            [
                "uv".to_string(),
                "run".to_string(),
                "--with".to_string(),
                "ruff==0.6.0".to_string()
            ]
        );
        assert_eq!(prepared.cmd[4..], ["ruff".to_string(), "check".to_string()]);
        assert!(prepared.env.contains_key("UV_CACHE_DIR"));
        assert_eq!(prepared.source, CommandSource::Local);
    }

    #[tokio::test]
    async fn uv_project_pins_resolution_to_the_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let strategy = PythonStrategy::new(Arc::new(VersionResolver::new()))
            .with_uv_project(dir.path().join("workspace"));
        let tool = ToolDefinition::new("ruff", RuntimeKind::Python);
        let prepared = strategy
            .prepare_local(&context(tool, dir.path()))
            .await
            .expect("prepare");
        assert_eq!(prepared.cmd[1], "--project");
        assert!(prepared.env.contains_key("UV_PROJECT"));
    }

    #[tokio::test]
    async fn project_candidate_requires_a_version_when_pinned() {
        let dir = tempfile::tempdir().expect("tempdir");
        let strategy = PythonStrategy::new(Arc::new(VersionResolver::new()));
        let tool = ToolDefinition::new("ruff", RuntimeKind::Python).with_min_version("0.6.0");
        let candidate = strategy
            .try_project(&context(tool, dir.path()))
            .await
            .expect("try_project");
        assert!(candidate.is_none());
    }
}
