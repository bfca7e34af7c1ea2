//! File discovery configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Controls which files a run considers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileDiscoveryConfig {
    /// Directories to walk when git-driven discovery is not requested.
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,

    /// Glob patterns excluded from the filesystem walk.
    #[serde(default)]
    pub excludes: Vec<String>,

    /// Files named explicitly by the caller; always included as-is.
    #[serde(default)]
    pub explicit_files: Vec<PathBuf>,

    /// Include dotfiles and dot-directories in the walk.
    #[serde(default)]
    pub include_hidden: bool,

    /// Only consider files git reports as changed.
    #[serde(default)]
    pub changed_only: bool,

    /// Restrict to the staged set (`git diff --cached`).
    #[serde(default)]
    pub pre_commit: bool,

    /// Diff against the merge base with this branch.
    #[serde(default)]
    pub base_branch: Option<String>,

    /// Diff against an explicit ref instead of a branch merge base.
    #[serde(default)]
    pub diff_ref: Option<String>,

    /// Union untracked files into git-driven discovery.
    #[serde(default)]
    pub include_untracked: bool,

    /// Bound results to these path prefixes (relative to root or absolute).
    #[serde(default)]
    pub limit_to: Vec<PathBuf>,
}

impl Default for FileDiscoveryConfig {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            excludes: Vec::new(),
            explicit_files: Vec::new(),
            include_hidden: false,
            changed_only: false,
            pre_commit: false,
            base_branch: None,
            diff_ref: None,
            include_untracked: false,
            limit_to: Vec::new(),
        }
    }
}

impl FileDiscoveryConfig {
    /// True when any git-driven discovery mode was requested.
    pub fn wants_git(&self) -> bool {
        self.changed_only || self.pre_commit || self.base_branch.is_some()
    }
}

fn default_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}
