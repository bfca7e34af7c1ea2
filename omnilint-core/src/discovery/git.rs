//! Git-driven discovery: changed, staged, and branch-relative file sets.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use omnilint_config::FileDiscoveryConfig;
use tracing::debug;

use super::{resolve_against, DiscoveryStrategy};

/// Runs a git subcommand and returns its stdout lines. A nonzero exit
/// or spawn failure returns no lines; discovery treats both as "no
/// changes".
pub trait GitRunner: Send + Sync {
    fn run(&self, args: &[&str], cwd: &Path) -> Vec<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemGitRunner;

impl GitRunner for SystemGitRunner {
    fn run(&self, args: &[&str], cwd: &Path) -> Vec<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output();
        match output {
            Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::to_string)
                .collect(),
            Ok(output) => {
                debug!(
                    "git {:?} exited with {:?}; treating as no changes",
                    args,
                    output.status.code()
                );
                Vec::new()
            }
            Err(err) => {
                debug!("git {:?} failed to spawn: {err}; treating as no changes", args);
                Vec::new()
            }
        }
    }
}

/// Collect files git reports as changed for the configured mode.
pub struct GitDiscovery {
    runner: Arc<dyn GitRunner>,
}

impl Default for GitDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GitDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitDiscovery").finish()
    }
}

impl GitDiscovery {
    pub fn new() -> Self {
        Self {
            runner: Arc::new(SystemGitRunner),
        }
    }

    pub fn with_runner(runner: Arc<dyn GitRunner>) -> Self {
        Self { runner }
    }

    fn diff_names(&self, config: &FileDiscoveryConfig, root: &Path) -> Vec<PathBuf> {
        if config.pre_commit {
            return self.lines_as_paths(&["diff", "--name-only", "--cached"], root);
        }
        match self.resolve_diff_ref(config, root) {
            Some(reference) => {
                self.lines_as_paths(&["diff", "--name-only", reference.as_str(), "--"], root)
            }
            None => {
                // Porcelain short format: status column, space, path.
                self.runner
                    .run(&["status", "--short"], root)
                    .iter()
                    .filter_map(|line| {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            return None;
                        }
                        trimmed
                            .split_once(char::is_whitespace)
                            .map(|(_, path)| resolve_against(root, Path::new(path.trim())))
                    })
                    .collect()
            }
        }
    }

    fn untracked(&self, root: &Path) -> Vec<PathBuf> {
        self.lines_as_paths(&["ls-files", "--others", "--exclude-standard"], root)
    }

    fn resolve_diff_ref(&self, config: &FileDiscoveryConfig, root: &Path) -> Option<String> {
        if let Some(branch) = &config.base_branch {
            let output = self.runner.run(&["merge-base", "HEAD", branch], root);
            return match output.first().map(|line| line.trim()) {
                Some(base) if !base.is_empty() => Some(base.to_string()),
                _ => Some(branch.clone()),
            };
        }
        config.diff_ref.clone()
    }

    fn lines_as_paths(&self, args: &[&str], root: &Path) -> Vec<PathBuf> {
        self.runner
            .run(args, root)
            .iter()
            .filter_map(|line| {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(resolve_against(root, Path::new(trimmed)))
                }
            })
            .collect()
    }

    fn normalize_limits(config: &FileDiscoveryConfig, root: &Path) -> Vec<PathBuf> {
        let mut limits = Vec::new();
        for entry in &config.limit_to {
            let resolved = resolve_against(root, entry);
            if !limits.contains(&resolved) {
                limits.push(resolved);
            }
        }
        limits
    }

    fn within_limits(candidate: &Path, limits: &[PathBuf]) -> bool {
        limits.is_empty() || limits.iter().any(|limit| candidate.starts_with(limit))
    }
}

impl DiscoveryStrategy for GitDiscovery {
    fn discover(&self, config: &FileDiscoveryConfig, root: &Path) -> Vec<PathBuf> {
        if !config.wants_git() {
            return Vec::new();
        }
        let limits = Self::normalize_limits(config, root);
        let mut candidates: BTreeSet<PathBuf> = self.diff_names(config, root).into_iter().collect();
        if config.include_untracked {
            candidates.extend(self.untracked(root));
        }
        candidates
            .into_iter()
            .filter(|path| path.exists() && Self::within_limits(path, &limits))
            .collect()
    }
}

/// All tracked files for the repository rooted at `root`.
pub fn list_tracked_files(runner: &dyn GitRunner, root: &Path) -> Vec<PathBuf> {
    runner
        .run(&["ls-files"], root)
        .iter()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(resolve_against(root, Path::new(trimmed)))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Scripted runner: maps full git argv lines to canned output and
    /// records every invocation.
    struct ScriptedGit {
        responses: HashMap<Vec<String>, Vec<String>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedGit {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn respond(mut self, args: &[&str], lines: &[&str]) -> Self {
            let _ = self.responses.insert(
                args.iter().map(|s| s.to_string()).collect(),
                lines.iter().map(|s| s.to_string()).collect(),
            );
            self
        }
    }

    impl GitRunner for ScriptedGit {
        fn run(&self, args: &[&str], _cwd: &Path) -> Vec<String> {
            let key: Vec<String> = args.iter().map(|s| s.to_string()).collect();
            self.calls.lock().push(key.clone());
            self.responses.get(&key).cloned().unwrap_or_default()
        }
    }

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(&path, "x").expect("write");
        path
    }

    #[test]
    fn pre_commit_uses_the_staged_diff() {
        let dir = tempfile::tempdir().expect("tempdir");
        let _ = touch(dir.path(), "a.py");
        let runner = Arc::new(
            ScriptedGit::new().respond(
                &["diff", "--name-only", "--cached"],
                &["a.py", "missing.py"],
            ),
        );
        let discovery = GitDiscovery::with_runner(runner);
        let config = FileDiscoveryConfig {
            pre_commit: true,
            ..FileDiscoveryConfig::default()
        };
        let found = discovery.discover(&config, dir.path());
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("a.py"));
    }

    #[test]
    fn base_branch_falls_back_to_literal_name_when_merge_base_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let _ = touch(dir.path(), "b.py");
        let runner = Arc::new(
            ScriptedGit::new()
                .respond(&["merge-base", "HEAD", "main"], &[])
                .respond(&["diff", "--name-only", "main", "--"], &["b.py"]),
        );
        let discovery = GitDiscovery::with_runner(runner);
        let config = FileDiscoveryConfig {
            base_branch: Some("main".to_string()),
            ..FileDiscoveryConfig::default()
        };
        let found = discovery.discover(&config, dir.path());
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("b.py"));
    }

    #[test]
    fn untracked_files_union_into_the_changed_set() {
        let dir = tempfile::tempdir().expect("tempdir");
        let _ = touch(dir.path(), "changed.py");
        let _ = touch(dir.path(), "new.py");
        let runner = Arc::new(
            ScriptedGit::new()
                .respond(&["status", "--short"], &[" M changed.py"])
                .respond(&["ls-files", "--others", "--exclude-standard"], &["new.py"]),
        );
        let discovery = GitDiscovery::with_runner(runner);
        let config = FileDiscoveryConfig {
            changed_only: true,
            include_untracked: true,
            ..FileDiscoveryConfig::default()
        };
        let found = discovery.discover(&config, dir.path());
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn limit_prefixes_bound_the_results() {
        let dir = tempfile::tempdir().expect("tempdir");
        let _ = touch(dir.path(), "src/a.py");
        let _ = touch(dir.path(), "docs/b.md");
        let runner = Arc::new(
            ScriptedGit::new()
                .respond(&["status", "--short"], &[" M src/a.py", " M docs/b.md"]),
        );
        let discovery = GitDiscovery::with_runner(runner);
        let config = FileDiscoveryConfig {
            changed_only: true,
            limit_to: vec![PathBuf::from("src")],
            ..FileDiscoveryConfig::default()
        };
        let found = discovery.discover(&config, dir.path());
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("src/a.py"));
    }

    #[test]
    fn git_failure_yields_an_empty_result() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(ScriptedGit::new());
        let discovery = GitDiscovery::with_runner(runner);
        let config = FileDiscoveryConfig {
            changed_only: true,
            ..FileDiscoveryConfig::default()
        };
        assert!(discovery.discover(&config, dir.path()).is_empty());
    }

    #[test]
    fn no_git_mode_requested_means_no_work() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(ScriptedGit::new());
        let discovery = GitDiscovery::with_runner(runner.clone());
        let config = FileDiscoveryConfig::default();
        assert!(discovery.discover(&config, dir.path()).is_empty());
        assert!(runner.calls.lock().is_empty());
    }
}
