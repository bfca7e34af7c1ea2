//! Tool selection: eligibility evaluation and run ordering.

pub mod languages;
pub mod selector;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use omnilint_config::{Config, SensitivityLevel};
use serde::Serialize;

use crate::catalog::Phase;

pub use languages::detect_languages;
pub use selector::ToolSelector;

/// Tag marking a bundled linter that runs everywhere.
pub const INTERNAL_TAG: &str = "internal-linter";
/// Tag marking a bundled linter scoped to omnilint's own workspace.
pub const WORKSPACE_INTERNAL_TAG: &str = "internal-omnilint";

/// Classification driving a tool's eligibility rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolFamily {
    External,
    Internal,
    /// Bundled linters that only run inside omnilint's own workspace or
    /// when forced on.
    InternalWorkspace,
    /// Placeholder for `--only` names that resolve to nothing.
    Unknown,
}

impl ToolFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Internal => "internal",
            Self::InternalWorkspace => "internal-omnilint",
            Self::Unknown => "unknown",
        }
    }
}

/// Inputs the selector evaluates; derived once per plan.
#[derive(Debug, Clone)]
pub struct SelectionContext {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    pub requested_only: Vec<String>,
    pub requested_enable: Vec<String>,
    pub requested_languages: Vec<String>,
    pub detected_languages: Vec<String>,
    /// Lowercased, dot-prefixed extensions of the discovered files.
    pub file_extensions: BTreeSet<String>,
    pub sensitivity: SensitivityLevel,
    /// Running inside omnilint's own workspace.
    pub omnilint_workspace: bool,
    /// Workspace-scoped internal linters forced on by config.
    pub omnilint_rules: bool,
}

impl SelectionContext {
    /// Languages in scope: the requested set when given, otherwise the
    /// detected set.
    pub fn language_scope(&self) -> BTreeSet<&str> {
        let source = if self.requested_languages.is_empty() {
            &self.detected_languages
        } else {
            &self.requested_languages
        };
        source.iter().map(String::as_str).collect()
    }
}

/// Derive the selection context from configuration and discovery output.
pub fn build_selection_context(
    config: &Config,
    files: &[PathBuf],
    detected_languages: Vec<String>,
    root: &Path,
) -> SelectionContext {
    let file_extensions = files
        .iter()
        .filter_map(|path| path.extension().and_then(|e| e.to_str()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .collect();
    SelectionContext {
        root: root.to_path_buf(),
        files: files.to_vec(),
        requested_only: config.execution.only.clone(),
        requested_enable: config.execution.enable.clone(),
        requested_languages: config.execution.languages.clone(),
        detected_languages,
        file_extensions,
        sensitivity: config.severity.sensitivity,
        omnilint_workspace: is_omnilint_workspace(root),
        omnilint_rules: config.execution.omnilint_rules,
    }
}

/// True when `root` is omnilint's own source tree, which unlocks the
/// workspace-scoped internal linters.
pub fn is_omnilint_workspace(root: &Path) -> bool {
    if root.join(".omnilint-workspace").is_file() {
        return true;
    }
    std::fs::read_to_string(root.join("Cargo.toml"))
        .map(|manifest| manifest.contains("omnilint-core"))
        .unwrap_or(false)
}

/// Per-tool eligibility indicators; `None` means the signal was not
/// evaluated for this tool family.
#[derive(Debug, Clone, Serialize)]
pub struct ToolEligibility {
    pub name: String,
    pub family: ToolFamily,
    pub phase: Phase,
    pub available: bool,
    pub requested_via_only: bool,
    pub language_match: Option<bool>,
    pub extension_match: Option<bool>,
    pub config_match: Option<bool>,
    pub sensitivity_ok: Option<bool>,
    pub workspace_scope: Option<bool>,
    pub default_enabled: Option<bool>,
}

impl ToolEligibility {
    pub fn new(name: &str, family: ToolFamily, phase: Phase) -> Self {
        Self {
            name: name.to_string(),
            family,
            phase,
            available: true,
            requested_via_only: false,
            language_match: None,
            extension_match: None,
            config_match: None,
            sensitivity_ok: None,
            workspace_scope: None,
            default_enabled: None,
        }
    }
}

/// Whether the selector decided to run or skip a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Run,
    Skip,
}

/// One tool's evaluated decision, retained even when skipped so the
/// explain-tools surface can render the reasoning.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDecision {
    pub name: String,
    pub family: ToolFamily,
    pub phase: Phase,
    pub action: DecisionAction,
    pub reasons: Vec<String>,
    pub eligibility: ToolEligibility,
}

/// The plan: ordered run list plus every decision that produced it.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub ordered: Vec<String>,
    pub decisions: Vec<ToolDecision>,
    pub context: SelectionContext,
}

impl SelectionResult {
    pub fn decision_for(&self, tool: &str) -> Option<&ToolDecision> {
        self.decisions.iter().find(|decision| decision.name == tool)
    }
}
