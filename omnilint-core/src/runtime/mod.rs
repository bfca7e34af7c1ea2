//! Runtime preparation: turning a catalog command into something
//! executable on this machine.
//!
//! Each tool runtime (python, npm, go, rust, lua, perl, binary) has a
//! strategy that can source the tool from the system PATH, from the
//! project checkout, or from a vendored install in the shared cache.
//! All strategies share one decision algorithm, implemented by
//! [`CommandPreparer`].

pub mod binary;
pub mod go;
pub mod layout;
pub mod lua;
pub mod npm;
pub mod perl;
pub mod python;
pub mod rust;
pub mod spec;
pub mod strategy;
pub mod versioning;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::catalog::{RuntimeKind, ToolDefinition};
use crate::execute::process::{CommandRunner, SystemProcessRunner};

pub use layout::{ToolCacheLayout, PROJECT_MARKER_FILENAME};
pub use strategy::{RuntimeContext, RuntimeStrategy};
pub use versioning::VersionResolver;

/// Where a prepared command's executable comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandSource {
    System,
    Local,
    Project,
}

/// A command ready to execute: argv, environment overrides, and the
/// detected tool version.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreparedCommand {
    pub cmd: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub version: Option<String>,
    pub source: CommandSource,
}

/// Inputs required to prepare one tool command.
#[derive(Clone)]
pub struct PreparationRequest {
    pub tool: Arc<ToolDefinition>,
    pub command: Vec<String>,
    pub root: PathBuf,
    pub cache_dir: PathBuf,
    pub system_preferred: bool,
    pub use_local_override: bool,
}

impl std::fmt::Debug for PreparationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparationRequest")
            .field("tool", &self.tool.name)
            .field("command", &self.command)
            .field("system_preferred", &self.system_preferred)
            .field("use_local_override", &self.use_local_override)
            .finish()
    }
}

/// Seam between the orchestrator and runtime provisioning; tests inject
/// scripted preparers.
#[async_trait]
pub trait ToolPreparer: Send + Sync {
    async fn prepare(&self, request: PreparationRequest) -> Result<PreparedCommand>;
}

/// Decide whether to use system, project, or vendored tooling.
pub struct CommandPreparer {
    strategies: HashMap<RuntimeKind, Arc<dyn RuntimeStrategy>>,
    fallback: Arc<dyn RuntimeStrategy>,
    /// Cache dirs whose layout has been created this process.
    ensured: Mutex<HashSet<PathBuf>>,
}

impl std::fmt::Debug for CommandPreparer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandPreparer").finish()
    }
}

impl Default for CommandPreparer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandPreparer {
    pub fn new() -> Self {
        Self::with_runner(Arc::new(SystemProcessRunner))
    }

    /// Build the preparer around an injected process runner; installs
    /// and version captures all flow through it.
    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        let versions = Arc::new(VersionResolver::with_runner(runner.clone()));
        let fallback: Arc<dyn RuntimeStrategy> =
            Arc::new(binary::BinaryStrategy::new(versions.clone()));
        let mut strategies: HashMap<RuntimeKind, Arc<dyn RuntimeStrategy>> = HashMap::new();
        let _ = strategies.insert(
            RuntimeKind::Python,
            Arc::new(python::PythonStrategy::new(versions.clone())) as Arc<dyn RuntimeStrategy>,
        );
        let _ = strategies.insert(
            RuntimeKind::Npm,
            Arc::new(npm::NpmStrategy::new(versions.clone(), runner.clone())),
        );
        let _ = strategies.insert(
            RuntimeKind::Go,
            Arc::new(go::GoStrategy::new(versions.clone(), runner.clone())),
        );
        let _ = strategies.insert(
            RuntimeKind::Rust,
            Arc::new(rust::RustStrategy::new(versions.clone(), runner.clone())),
        );
        let _ = strategies.insert(
            RuntimeKind::Lua,
            Arc::new(lua::LuaStrategy::new(versions.clone(), runner.clone())),
        );
        let _ = strategies.insert(
            RuntimeKind::Perl,
            Arc::new(perl::PerlStrategy::new(versions.clone(), runner)),
        );
        let _ = strategies.insert(RuntimeKind::Binary, fallback.clone());
        Self {
            strategies,
            fallback,
            ensured: Mutex::new(HashSet::new()),
        }
    }

    /// Runtime kinds this preparer can provision.
    pub fn available_runtimes(&self) -> Vec<RuntimeKind> {
        let mut kinds: Vec<RuntimeKind> = self.strategies.keys().copied().collect();
        kinds.sort_by_key(|kind| format!("{kind:?}"));
        kinds
    }

    fn ensure_layout(&self, layout: &ToolCacheLayout) -> std::io::Result<()> {
        let key = layout.cache_dir().to_path_buf();
        {
            let ensured = self.ensured.lock();
            if ensured.contains(&key) {
                return Ok(());
            }
        }
        layout.ensure_directories()?;
        let _ = self.ensured.lock().insert(key);
        Ok(())
    }

    fn strategy_for(&self, runtime: RuntimeKind) -> Arc<dyn RuntimeStrategy> {
        self.strategies
            .get(&runtime)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl ToolPreparer for CommandPreparer {
    async fn prepare(&self, request: PreparationRequest) -> Result<PreparedCommand> {
        let layout = ToolCacheLayout::new(request.cache_dir.clone());
        self.ensure_layout(&layout)?;
        let project_mode = layout.project_mode();
        let strategy = self.strategy_for(request.tool.runtime);
        let ctx = RuntimeContext::new(
            request.tool.clone(),
            request.command.clone(),
            request.root.clone(),
            layout,
        );

        if request.use_local_override || request.tool.prefer_local {
            return strategy.prepare_local(&ctx).await;
        }

        if project_mode {
            if let Some(prepared) = strategy.try_project(&ctx).await? {
                return Ok(prepared);
            }
        }

        if request.system_preferred {
            if let Some(prepared) = strategy.try_system(&ctx).await? {
                return Ok(prepared);
            }
        }

        if let Some(prepared) = strategy.try_project(&ctx).await? {
            return Ok(prepared);
        }

        strategy.prepare_local(&ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{StaticCommand, ToolAction};

    fn request(tool: ToolDefinition, dir: &std::path::Path) -> PreparationRequest {
        PreparationRequest {
            tool: Arc::new(tool),
            command: vec!["true".to_string()],
            root: dir.to_path_buf(),
            cache_dir: dir.join(".cache"),
            system_preferred: true,
            use_local_override: false,
        }
    }

    #[tokio::test]
    async fn binary_tools_prefer_the_system_executable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let preparer = CommandPreparer::new();
        let tool = ToolDefinition::new("true", RuntimeKind::Binary)
            .with_action(ToolAction::new("run", StaticCommand::new(["true"])));
        let prepared = preparer.prepare(request(tool, dir.path())).await.expect("prepare");
        assert_eq!(prepared.source, CommandSource::System);
        assert_eq!(prepared.cmd, vec!["true".to_string()]);
    }

    #[tokio::test]
    async fn project_mode_prefers_the_project_binary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = dir.path().join(".cache");
        let layout = ToolCacheLayout::new(&cache);
        layout.ensure_directories().expect("dirs");
        std::fs::write(layout.project_marker(), "{}").expect("marker");

        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).expect("mkdir");
        std::fs::write(bin.join("true"), "#!/bin/sh\nexit 0\n").expect("write");

        let preparer = CommandPreparer::new();
        let tool = ToolDefinition::new("true", RuntimeKind::Binary)
            .with_action(ToolAction::new("run", StaticCommand::new(["true"])));
        let prepared = preparer.prepare(request(tool, dir.path())).await.expect("prepare");
        assert_eq!(prepared.source, CommandSource::Project);
        assert!(prepared.cmd[0].ends_with("bin/true"));
    }

    #[tokio::test]
    async fn layout_is_created_once_per_cache_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let preparer = CommandPreparer::new();
        let tool = ToolDefinition::new("true", RuntimeKind::Binary)
            .with_action(ToolAction::new("run", StaticCommand::new(["true"])));
        let _ = preparer
            .prepare(request(tool.clone(), dir.path()))
            .await
            .expect("prepare");
        assert!(dir.path().join(".cache/tools/go/bin").is_dir());
        let _ = preparer.prepare(request(tool, dir.path())).await.expect("prepare again");
    }
}
