//! Conversion of raw tool findings into the canonical diagnostic model.
//!
//! The pipeline is: path normalization, severity resolution (explicit
//! label, code prefix, per-tool override rules), suppression filtering,
//! then order-preserving deduplication.

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use tracing::warn;

use super::rules::{
    add_custom_rule, apply_severity_rules, default_severity_rules, severity_from_code,
    SeverityRuleMap,
};
use super::{Diagnostic, RawDiagnostic, Severity};

#[derive(Debug, Clone)]
pub struct DiagnosticNormalizer {
    rules: SeverityRuleMap,
}

impl Default for DiagnosticNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticNormalizer {
    pub fn new() -> Self {
        Self {
            rules: default_severity_rules(),
        }
    }

    /// Extend the built-in rules with `tool:regex=level` specs. Bad
    /// specs are logged and skipped; they never fail the run.
    pub fn with_custom_rules(specs: &[String]) -> Self {
        let mut rules = default_severity_rules();
        for spec in specs {
            if let Err(message) = add_custom_rule(&mut rules, spec) {
                warn!("ignoring severity rule: {message}");
            }
        }
        Self { rules }
    }

    /// Normalize, filter, and deduplicate one action's findings.
    pub fn normalize(
        &self,
        raw: Vec<RawDiagnostic>,
        tool: &str,
        root: &Path,
        filters: &[Regex],
    ) -> Vec<Diagnostic> {
        let mut seen = HashSet::new();
        let mut result = Vec::with_capacity(raw.len());
        for item in raw {
            let diagnostic = self.canonicalize(item, tool, root);
            if is_suppressed(&diagnostic, filters) {
                continue;
            }
            let identity = (
                diagnostic.tool.clone(),
                diagnostic.file.clone(),
                diagnostic.line,
                diagnostic.column,
                diagnostic.code.clone(),
                diagnostic.message.clone(),
            );
            if seen.insert(identity) {
                result.push(diagnostic);
            }
        }
        result
    }

    fn canonicalize(&self, raw: RawDiagnostic, tool: &str, root: &Path) -> Diagnostic {
        let tool_name = raw.tool.unwrap_or_else(|| tool.to_string());
        let severity = raw
            .severity
            .as_deref()
            .and_then(Severity::from_label)
            .unwrap_or_else(|| severity_from_code(raw.code.as_deref(), Severity::Error));
        let subject = raw.code.as_deref().unwrap_or(raw.message.as_str());
        let severity = apply_severity_rules(&self.rules, &tool_name, subject, severity);
        Diagnostic {
            file: raw.file.as_deref().map(|file| normalize_file(root, file)),
            line: raw.line,
            column: raw.column,
            severity,
            message: raw.message,
            tool: tool_name,
            code: raw.code,
            group: raw.group,
            hints: raw.hints,
            tags: raw.tags,
            meta: raw.meta,
        }
    }
}

/// Compile suppression patterns, dropping (and logging) invalid ones.
pub fn compile_filters(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(err) => {
                warn!("ignoring filter pattern '{pattern}': {err}");
                None
            }
        })
        .collect()
}

/// Drop output lines matching any suppression pattern.
pub fn filter_lines(lines: Vec<String>, filters: &[Regex]) -> Vec<String> {
    if filters.is_empty() {
        return lines;
    }
    lines
        .into_iter()
        .filter(|line| !filters.iter().any(|regex| regex.is_match(line)))
        .collect()
}

/// Normalize a tool-reported file path into the repo-relative,
/// forward-slash form reporters compare literally.
pub fn normalize_file(root: &Path, file: &str) -> String {
    let forward = file.replace('\\', "/");
    let path = Path::new(&forward);
    let relative = match path.strip_prefix(root) {
        Ok(stripped) => stripped,
        Err(_) => path,
    };
    let text = relative.to_string_lossy().replace('\\', "/");
    text.strip_prefix("./").unwrap_or(&text).to_string()
}

fn is_suppressed(diagnostic: &Diagnostic, filters: &[Regex]) -> bool {
    if filters.is_empty() {
        return false;
    }
    let probe = format!(
        "{} {} {} {} {}",
        diagnostic.tool,
        diagnostic.file.as_deref().unwrap_or("-"),
        diagnostic.line.map(|l| l.to_string()).unwrap_or_default(),
        diagnostic.code.as_deref().unwrap_or(""),
        diagnostic.message,
    );
    filters.iter().any(|regex| regex.is_match(&probe))
}
