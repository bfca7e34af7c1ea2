//! Immutable tool catalog model.
//!
//! Tool definitions are constructed once at startup, shared as
//! `Arc<ToolDefinition>`, and never mutated. Behavior lives behind small
//! trait seams (`CommandBuilder`, `OutputParser`, `Installer`) so the
//! catalog can describe external binaries and bundled linters with the
//! same vocabulary.

pub mod registry;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagnostics::RawDiagnostic;

pub use registry::ToolRegistry;

/// Execution stage a tool belongs to. The declared variants run in this
/// order; unknown phases run afterwards, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Phase {
    Format,
    Lint,
    Analysis,
    Utility,
    Other(String),
}

impl Phase {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Format => "format",
            Self::Lint => "lint",
            Self::Analysis => "analysis",
            Self::Utility => "utility",
            Self::Other(name) => name,
        }
    }

    /// Rank within the declared total order; `None` for unknown phases.
    pub fn known_rank(&self) -> Option<usize> {
        match self {
            Self::Format => Some(0),
            Self::Lint => Some(1),
            Self::Analysis => Some(2),
            Self::Utility => Some(3),
            Self::Other(_) => None,
        }
    }

    /// Total-order key: declared phases first, then unknown phases
    /// sorted by name.
    pub fn sort_key(&self) -> (usize, String) {
        match self.known_rank() {
            Some(rank) => (rank, String::new()),
            None => (usize::MAX, self.as_str().to_string()),
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Self::Lint
    }
}

impl From<String> for Phase {
    fn from(name: String) -> Self {
        match name.as_str() {
            "format" => Self::Format,
            "lint" => Self::Lint,
            "analysis" => Self::Analysis,
            "utility" => Self::Utility,
            _ => Self::Other(name),
        }
    }
}

impl From<Phase> for String {
    fn from(phase: Phase) -> Self {
        phase.as_str().to_string()
    }
}

/// Ecosystem a tool is installed and executed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    Python,
    Npm,
    Go,
    Rust,
    Lua,
    Perl,
    Binary,
}

/// Everything a command builder or parser may need about the run.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    /// The tool's entry from `Config::tool_settings`, `Null` when absent.
    pub settings: Value,
    pub config: Arc<omnilint_config::Config>,
}

impl ToolContext {
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }
}

/// Builds the base argv for one action from the run context.
pub trait CommandBuilder: Send + Sync {
    fn build(&self, ctx: &ToolContext) -> Result<Vec<String>>;
}

/// Fixed argv, the common case for catalog entries.
#[derive(Debug, Clone)]
pub struct StaticCommand {
    argv: Vec<String>,
}

impl StaticCommand {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }
}

impl CommandBuilder for StaticCommand {
    fn build(&self, _ctx: &ToolContext) -> Result<Vec<String>> {
        Ok(self.argv.clone())
    }
}

/// Converts one action's captured output into raw diagnostics.
pub trait OutputParser: Send + Sync {
    fn parse(&self, stdout: &str, stderr: &str, ctx: &ToolContext) -> Result<Vec<RawDiagnostic>>;
}

/// One-shot setup hook run once per orchestrator root before the tool's
/// first action.
#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(&self, ctx: &ToolContext) -> Result<()>;
}

/// Result of an in-process action that bypasses the subprocess layer.
#[derive(Debug, Clone, Default)]
pub struct InternalOutcome {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
    pub diagnostics: Vec<RawDiagnostic>,
}

/// Bundled linters implement this to run inside the engine process.
#[async_trait]
pub trait InternalRunner: Send + Sync {
    async fn run(&self, ctx: &ToolContext) -> Result<InternalOutcome>;
}

/// One invocation unit of a tool (`check`, `fix`, ...).
#[derive(Clone)]
pub struct ToolAction {
    pub name: String,
    pub command: Arc<dyn CommandBuilder>,
    /// Append the discovered file list to the built argv.
    pub append_files: bool,
    pub parser: Option<Arc<dyn OutputParser>>,
    /// Action-level suppression patterns, merged with config filters.
    pub filter_patterns: Vec<String>,
    /// Treat any exit code as success (formatters that report changes
    /// through the exit code).
    pub ignore_exit: bool,
    pub internal_runner: Option<Arc<dyn InternalRunner>>,
}

impl ToolAction {
    pub fn new(name: impl Into<String>, command: impl CommandBuilder + 'static) -> Self {
        Self {
            name: name.into(),
            command: Arc::new(command),
            append_files: true,
            parser: None,
            filter_patterns: Vec::new(),
            ignore_exit: false,
            internal_runner: None,
        }
    }

    pub fn with_parser(mut self, parser: impl OutputParser + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    pub fn with_filter_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn without_files(mut self) -> Self {
        self.append_files = false;
        self
    }

    pub fn ignoring_exit(mut self) -> Self {
        self.ignore_exit = true;
        self
    }

    pub fn with_internal_runner(mut self, runner: impl InternalRunner + 'static) -> Self {
        self.internal_runner = Some(Arc::new(runner));
        self
    }
}

impl std::fmt::Debug for ToolAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolAction")
            .field("name", &self.name)
            .field("append_files", &self.append_files)
            .field("has_parser", &self.parser.is_some())
            .field("filter_patterns", &self.filter_patterns)
            .field("ignore_exit", &self.ignore_exit)
            .field("internal", &self.internal_runner.is_some())
            .finish()
    }
}

/// Immutable description of one tool.
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub phase: Phase,
    pub runtime: RuntimeKind,
    pub actions: Vec<ToolAction>,
    /// Sibling tools that must run after this one.
    pub before: Vec<String>,
    /// Sibling tools that must run before this one.
    pub after: Vec<String>,
    pub languages: Vec<String>,
    pub file_extensions: Vec<String>,
    pub config_files: Vec<String>,
    /// Package requirement for provisioning (`name`, `name@version`,
    /// `@scope/name@version`, `rustup:component`, module paths).
    pub package: Option<String>,
    pub min_version: Option<String>,
    pub version_command: Option<Vec<String>>,
    pub tags: Vec<String>,
    pub default_enabled: bool,
    pub prefer_local: bool,
    pub auto_install: bool,
    pub installers: Vec<Arc<dyn Installer>>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, runtime: RuntimeKind) -> Self {
        Self {
            name: name.into(),
            phase: Phase::default(),
            runtime,
            actions: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            languages: Vec::new(),
            file_extensions: Vec::new(),
            config_files: Vec::new(),
            package: None,
            min_version: None,
            version_command: None,
            tags: Vec::new(),
            default_enabled: false,
            prefer_local: false,
            auto_install: true,
            installers: Vec::new(),
        }
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_action(mut self, action: ToolAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_before<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.before = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_after<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_file_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_config_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_min_version(mut self, version: impl Into<String>) -> Self {
        self.min_version = Some(version.into());
        self
    }

    pub fn with_version_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.version_command = Some(command.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn default_enabled(mut self) -> Self {
        self.default_enabled = true;
        self
    }

    pub fn preferring_local(mut self) -> Self {
        self.prefer_local = true;
        self
    }

    pub fn with_installer(mut self, installer: impl Installer + 'static) -> Self {
        self.installers.push(Arc::new(installer));
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }

    /// True when `path`'s extension matches this tool's declared set.
    /// Tools without declared extensions accept every file.
    pub fn accepts_file(&self, path: &std::path::Path) -> bool {
        if self.file_extensions.is_empty() {
            return true;
        }
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let dotted = format!(".{}", extension.to_ascii_lowercase());
        self.file_extensions
            .iter()
            .any(|candidate| candidate.to_ascii_lowercase() == dotted)
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("runtime", &self.runtime)
            .field("actions", &self.actions)
            .field("tags", &self.tags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn phase_round_trips_through_names() {
        assert_eq!(Phase::from("format".to_string()), Phase::Format);
        assert_eq!(
            Phase::from("docs".to_string()),
            Phase::Other("docs".to_string())
        );
        assert_eq!(Phase::Format.as_str(), "format");
    }

    #[test]
    fn unknown_phases_sort_after_declared_ones() {
        let docs = Phase::Other("docs".to_string());
        assert!(Phase::Utility.sort_key() < docs.sort_key());
        let aaa = Phase::Other("aaa".to_string());
        assert!(aaa.sort_key() < docs.sort_key());
    }

    #[test]
    fn extension_matching_is_case_insensitive() {
        let tool = ToolDefinition::new("ruff", RuntimeKind::Python)
            .with_file_extensions([".py", ".pyi"]);
        assert!(tool.accepts_file(Path::new("src/app.PY")));
        assert!(!tool.accepts_file(Path::new("src/app.rs")));
        assert!(!tool.accepts_file(Path::new("Makefile")));
    }

    #[test]
    fn tools_without_extensions_accept_everything() {
        let tool = ToolDefinition::new("generic", RuntimeKind::Binary);
        assert!(tool.accepts_file(Path::new("anything.xyz")));
    }
}
