//! Canonical diagnostic model and the raw form tool parsers emit.

pub mod normalize;
pub mod rules;
pub mod suppressions;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use normalize::DiagnosticNormalizer;
pub use rules::{
    add_custom_rule, apply_severity_rules, default_severity_rules, severity_from_code,
    severity_to_sarif, SeverityRule, SeverityRuleMap,
};

/// The four-value severity lattice every tool vocabulary is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Notice,
    Note,
}

impl Severity {
    /// Parse a tool-native severity word when it happens to match ours.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "error" | "fatal" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            "notice" | "convention" | "refactor" | "info" => Some(Self::Notice),
            "note" | "hint" => Some(Self::Note),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Note => "note",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finding exactly as a tool parser produced it, before normalization.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDiagnostic {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Tool-native severity word; mapped during normalization.
    pub severity: Option<String>,
    pub message: String,
    pub code: Option<String>,
    pub tool: Option<String>,
    pub group: Option<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub meta: Option<Value>,
}

/// A normalized finding ready for reporters.
///
/// `file` is repo-relative with forward slashes, or `None` for findings
/// without a location. Line and column numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Diagnostic {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub severity: Severity,
    pub message: String,
    pub tool: String,
    pub code: Option<String>,
    pub group: Option<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub meta: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_labels_cover_common_tool_vocabularies() {
        assert_eq!(Severity::from_label("ERROR"), Some(Severity::Error));
        assert_eq!(Severity::from_label("warn"), Some(Severity::Warning));
        assert_eq!(Severity::from_label("refactor"), Some(Severity::Notice));
        assert_eq!(Severity::from_label("hint"), Some(Severity::Note));
        assert_eq!(Severity::from_label("bogus"), None);
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Warning).expect("serialize"),
            "\"warning\""
        );
    }
}
