//! Capturing and comparing tool versions.
//!
//! Tool `--version` output is messy; everything funnels through
//! `normalize` before comparison, and anything unparseable counts as
//! incompatible rather than failing the run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::execute::process::{CommandOptions, CommandRunner, SystemProcessRunner};

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)+)").expect("version pattern"));

const CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct VersionResolver {
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for VersionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionResolver").finish()
    }
}

impl Default for VersionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionResolver {
    pub fn new() -> Self {
        Self {
            runner: Arc::new(SystemProcessRunner),
        }
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Run a version command and return the normalized version from its
    /// first output line, or `None` on any failure.
    pub async fn capture(
        &self,
        command: &[String],
        env: Option<&BTreeMap<String, String>>,
    ) -> Option<String> {
        let options = CommandOptions {
            env: env.cloned().unwrap_or_default(),
            timeout: Some(CAPTURE_TIMEOUT),
            ..CommandOptions::default()
        };
        let output = self.runner.run(command, &options).await.ok()?;
        if output.returncode != 0 {
            return None;
        }
        let text = if output.stdout.trim().is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        let first_line = text.lines().next()?.trim();
        self.normalize(first_line)
    }

    /// Extract the dotted version embedded in `raw`, or `None` when no
    /// comparable version can be recovered.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let candidate = VERSION_PATTERN
            .captures(trimmed)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
            .unwrap_or(trimmed);
        loose_version(candidate).map(|_| candidate.to_string())
    }

    /// `actual >= expected` under loose parsing. A missing expectation
    /// always passes; a missing or malformed actual never does.
    pub fn is_compatible(&self, actual: Option<&str>, expected: Option<&str>) -> bool {
        let Some(expected) = expected else {
            return true;
        };
        let Some(actual) = actual else {
            return false;
        };
        match (loose_version(actual), loose_version(expected)) {
            (Some(actual), Some(expected)) => actual >= expected,
            _ => false,
        }
    }
}

/// Parse a possibly short version ("1.2", "v0.4") into a semver value by
/// padding missing components with zero. Components beyond the patch
/// level are ignored.
fn loose_version(text: &str) -> Option<semver::Version> {
    let trimmed = text.trim().trim_start_matches('v');
    if let Ok(version) = semver::Version::parse(trimmed) {
        return Some(version);
    }
    let mut components = trimmed.split('.');
    let major: u64 = components.next()?.parse().ok()?;
    let minor: u64 = match components.next() {
        Some(part) => part.parse().ok()?,
        None => 0,
    };
    let patch: u64 = match components.next() {
        Some(part) => part.parse().ok()?,
        None => 0,
    };
    Some(semver::Version::new(major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use crate::execute::process::CommandOutput;

    struct CannedRunner {
        stdout: String,
        returncode: i32,
    }

    #[async_trait]
    impl CommandRunner for CannedRunner {
        async fn run(&self, _argv: &[String], _options: &CommandOptions) -> Result<CommandOutput> {
            Ok(CommandOutput {
                returncode: self.returncode,
                stdout: self.stdout.clone(),
                stderr: String::new(),
                timed_out: false,
            })
        }
    }

    #[test]
    fn normalize_extracts_dotted_versions() {
        let resolver = VersionResolver::new();
        assert_eq!(
            resolver.normalize("ruff 0.6.4 (linux)"),
            Some("0.6.4".to_string())
        );
        assert_eq!(resolver.normalize("v1.2"), Some("1.2".to_string()));
        assert_eq!(resolver.normalize("no digits here"), None);
        assert_eq!(resolver.normalize(""), None);
    }

    #[test]
    fn compatibility_is_at_least_semantics() {
        let resolver = VersionResolver::new();
        assert!(resolver.is_compatible(Some("1.2.3"), Some("1.2.0")));
        assert!(resolver.is_compatible(Some("1.2"), Some("1.2")));
        assert!(!resolver.is_compatible(Some("1.1"), Some("1.2")));
        assert!(resolver.is_compatible(Some("2.0"), None));
        assert!(!resolver.is_compatible(None, Some("1.0")));
    }

    #[test]
    fn malformed_versions_are_incompatible_not_errors() {
        let resolver = VersionResolver::new();
        assert!(!resolver.is_compatible(Some("nightly"), Some("1.0")));
        assert!(!resolver.is_compatible(Some("1.0"), Some("garbage")));
    }

    #[tokio::test]
    async fn capture_reads_the_first_line() {
        let resolver = VersionResolver::with_runner(Arc::new(CannedRunner {
            stdout: "tool 3.11.2\nextra noise\n".to_string(),
            returncode: 0,
        }));
        let version = resolver
            .capture(&["tool".to_string(), "--version".to_string()], None)
            .await;
        assert_eq!(version, Some("3.11.2".to_string()));
    }

    #[tokio::test]
    async fn capture_treats_nonzero_exit_as_unknown() {
        let resolver = VersionResolver::with_runner(Arc::new(CannedRunner {
            stdout: "1.0.0".to_string(),
            returncode: 2,
        }));
        let version = resolver.capture(&["tool".to_string()], None).await;
        assert_eq!(version, None);
    }
}
