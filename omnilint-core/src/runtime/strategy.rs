//! Shared plumbing for per-ecosystem preparation strategies.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::layout::ToolCacheLayout;
use super::spec::desired_version;
use super::versioning::VersionResolver;
use super::{CommandSource, PreparedCommand};
use crate::catalog::ToolDefinition;

/// Immutable inputs a strategy works from.
#[derive(Clone)]
pub struct RuntimeContext {
    pub tool: Arc<ToolDefinition>,
    pub command: Vec<String>,
    pub root: PathBuf,
    pub layout: ToolCacheLayout,
    pub target_version: Option<String>,
}

impl RuntimeContext {
    pub fn new(
        tool: Arc<ToolDefinition>,
        command: Vec<String>,
        root: PathBuf,
        layout: ToolCacheLayout,
    ) -> Self {
        let target_version = desired_version(&tool);
        Self {
            tool,
            command,
            root,
            layout,
            target_version,
        }
    }

    /// First entry of the command sequence.
    pub fn executable(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }

    /// Bare binary name of the executable.
    pub fn binary_name(&self) -> String {
        Path::new(self.executable())
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.executable().to_string())
    }

    pub fn command_list(&self) -> Vec<String> {
        self.command.clone()
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("tool", &self.tool.name)
            .field("command", &self.command)
            .field("target_version", &self.target_version)
            .finish()
    }
}

/// Strategy object preparing commands for one runtime kind.
#[async_trait]
pub trait RuntimeStrategy: Send + Sync {
    fn versions(&self) -> &VersionResolver;

    /// System-level candidate: the executable must be on PATH and, when
    /// a version command is declared, satisfy the target version.
    async fn try_system(&self, ctx: &RuntimeContext) -> Result<Option<PreparedCommand>> {
        system_candidate(self.versions(), ctx, None).await
    }

    /// Project-local candidate, or `None` when the project has none.
    async fn try_project(&self, ctx: &RuntimeContext) -> Result<Option<PreparedCommand>>;

    /// Provision (or reuse) a vendored install and return its command.
    async fn prepare_local(&self, ctx: &RuntimeContext) -> Result<PreparedCommand>;
}

/// Shared system-candidate check used by most strategies.
pub(crate) async fn system_candidate(
    versions: &VersionResolver,
    ctx: &RuntimeContext,
    env: Option<BTreeMap<String, String>>,
) -> Result<Option<PreparedCommand>> {
    if which::which(ctx.executable()).is_err() {
        return Ok(None);
    }
    let mut version = None;
    if let Some(command) = &ctx.tool.version_command {
        version = versions.capture(command, env.as_ref()).await;
    }
    if !versions.is_compatible(version.as_deref(), ctx.target_version.as_deref()) {
        return Ok(None);
    }
    Ok(Some(PreparedCommand {
        cmd: ctx.command_list(),
        env: env.unwrap_or_default(),
        version,
        source: CommandSource::System,
    }))
}

/// Candidate from `<root>/<subdir>/<binary>`, the convention projects
/// use for checked-in tool wrappers.
pub(crate) fn project_binary(ctx: &RuntimeContext, subdir: &str) -> Option<PreparedCommand> {
    let candidate = ctx.root.join(subdir).join(ctx.binary_name());
    if !candidate.exists() {
        return None;
    }
    let mut cmd = ctx.command_list();
    if cmd.is_empty() {
        return None;
    }
    cmd[0] = candidate.to_string_lossy().into_owned();
    Some(PreparedCommand {
        cmd,
        env: BTreeMap::new(),
        version: None,
        source: CommandSource::Project,
    })
}

/// Environment with `bin_dir` prefixed onto PATH and PWD pinned to the
/// run root.
pub(crate) fn prepend_path_environment(
    bin_dir: &Path,
    root: &Path,
    extra: &[(&str, String)],
) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    let path_value = std::env::var("PATH").unwrap_or_default();
    let combined = if path_value.is_empty() {
        bin_dir.to_string_lossy().into_owned()
    } else {
        format!(
            "{}{}{}",
            bin_dir.to_string_lossy(),
            path_separator(),
            path_value
        )
    };
    let _ = env.insert("PATH".to_string(), combined);
    let _ = env.insert("PWD".to_string(), root.to_string_lossy().into_owned());
    for (key, value) in extra {
        let _ = env.insert((*key).to_string(), value.clone());
    }
    env
}

fn path_separator() -> char {
    if cfg!(windows) {
        ';'
    } else {
        ':'
    }
}

/// JSON metadata from `path`, or `None` when missing or unparseable.
pub(crate) fn load_json(path: &Path) -> Option<Value> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

pub(crate) fn write_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, serde_json::to_string(value)?)
        .with_context(|| format!("writing {}", path.display()))
}

/// Set the executable bits on a freshly installed binary.
#[cfg(unix)]
pub(crate) fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let metadata =
        std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    std::fs::set_permissions(path, permissions)
        .with_context(|| format!("chmod {}", path.display()))
}

#[cfg(not(unix))]
pub(crate) fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RuntimeKind;

    fn context(command: &[&str], root: &Path) -> RuntimeContext {
        RuntimeContext::new(
            Arc::new(ToolDefinition::new("demo", RuntimeKind::Binary)),
            command.iter().map(|s| s.to_string()).collect(),
            root.to_path_buf(),
            ToolCacheLayout::new(root.join(".cache")),
        )
    }

    #[test]
    fn project_binary_rewrites_the_executable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).expect("mkdir");
        std::fs::write(bin.join("demo"), "#!/bin/sh\n").expect("write");

        let ctx = context(&["demo", "--check"], dir.path());
        let prepared = project_binary(&ctx, "bin").expect("project candidate");
        assert!(prepared.cmd[0].ends_with("bin/demo"));
        assert_eq!(prepared.cmd[1], "--check");
        assert_eq!(prepared.source, CommandSource::Project);
    }

    #[test]
    fn project_binary_requires_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&["demo"], dir.path());
        assert!(project_binary(&ctx, "bin").is_none());
    }

    #[test]
    fn prepend_path_puts_the_bin_dir_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let env = prepend_path_environment(&dir.path().join("bin"), dir.path(), &[]);
        let path = env.get("PATH").expect("PATH");
        assert!(path.starts_with(&*dir.path().join("bin").to_string_lossy()));
        assert_eq!(
            env.get("PWD").map(String::as_str),
            Some(&*dir.path().to_string_lossy())
        );
    }
}
