//! Execution configuration: parallelism, caching, runtime preferences.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Knobs governing how selected tools are executed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Restrict the run to exactly these tools.
    #[serde(default)]
    pub only: Vec<String>,

    /// Languages requested explicitly by the caller.
    #[serde(default)]
    pub languages: Vec<String>,

    /// Additional tools enabled on top of the default selection.
    #[serde(default)]
    pub enable: Vec<String>,

    /// Worker count; `None` resolves to 75% of available cores.
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Abort the run after the first non-success outcome.
    #[serde(default)]
    pub bail: bool,

    /// Enable the content-addressed result cache.
    #[serde(default)]
    pub cache_enabled: bool,

    /// Base directory for result and tool caches.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Hash file contents instead of size/mtime for cache keys.
    #[serde(default)]
    pub strict_cache: bool,

    /// Per-action timeout in seconds; `None` disables the timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: Option<u64>,

    /// Prefer vendored installs over system binaries.
    #[serde(default)]
    pub use_local_linters: bool,

    /// Force the orchestrator's own workspace-scoped linters on.
    #[serde(default)]
    pub omnilint_rules: bool,

    /// Line length forwarded to formatting-aware tools.
    #[serde(default = "default_line_length")]
    pub line_length: u32,

    /// SQL dialect forwarded to SQL tooling.
    #[serde(default = "default_sql_dialect")]
    pub sql_dialect: String,

    /// Target Python version forwarded to Python tooling.
    #[serde(default)]
    pub python_version: Option<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            only: Vec::new(),
            languages: Vec::new(),
            enable: Vec::new(),
            jobs: None,
            bail: false,
            cache_enabled: false,
            cache_dir: default_cache_dir(),
            strict_cache: false,
            timeout_secs: default_timeout(),
            use_local_linters: false,
            omnilint_rules: false,
            line_length: default_line_length(),
            sql_dialect: default_sql_dialect(),
            python_version: None,
        }
    }
}

impl ExecutionConfig {
    /// Resolve the effective worker count. Bail mode forces serial
    /// execution so the first failure is also the last action started.
    pub fn effective_jobs(&self, available_cores: usize) -> usize {
        if self.bail {
            return 1;
        }
        match self.jobs {
            Some(jobs) => jobs.max(1),
            None => (available_cores * 3 / 4).max(1),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".omnilint-cache")
}

fn default_timeout() -> Option<u64> {
    Some(600)
}

fn default_line_length() -> u32 {
    120
}

fn default_sql_dialect() -> String {
    "ansi".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bail_forces_single_job() {
        let cfg = ExecutionConfig {
            bail: true,
            jobs: Some(8),
            ..ExecutionConfig::default()
        };
        assert_eq!(cfg.effective_jobs(16), 1);
    }

    #[test]
    fn jobs_default_to_three_quarters_of_cores() {
        let cfg = ExecutionConfig::default();
        assert_eq!(cfg.effective_jobs(8), 6);
        assert_eq!(cfg.effective_jobs(1), 1);
    }
}
