//! Severity inference: code prefixes, per-tool override rules, SARIF
//! levels.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::Severity;

/// One override: a pattern matched against a diagnostic's code (or
/// message when no code is present) and the severity it forces.
#[derive(Debug, Clone)]
pub struct SeverityRule {
    pub pattern: Regex,
    pub severity: Severity,
}

/// Ordered override rules keyed by tool name.
pub type SeverityRuleMap = BTreeMap<String, Vec<SeverityRule>>;

static DEFAULT_RULES: Lazy<Vec<(&str, &str, Severity)>> = Lazy::new(|| {
    vec![
        ("ruff", r"^(D|N)\d{3,4}", Severity::Notice),
        ("pylint", r"^C\d{4}", Severity::Notice),
        ("pylint", r"^R\d{4}", Severity::Notice),
    ]
});

/// Built-in overrides: documentation/naming codes downgrade to notices.
pub fn default_severity_rules() -> SeverityRuleMap {
    let mut rules = SeverityRuleMap::new();
    for (tool, pattern, severity) in DEFAULT_RULES.iter() {
        let compiled = Regex::new(pattern).expect("built-in severity rule pattern");
        rules
            .entry((*tool).to_string())
            .or_default()
            .push(SeverityRule {
                pattern: compiled,
                severity: *severity,
            });
    }
    rules
}

/// Apply per-tool overrides; the first matching rule wins.
pub fn apply_severity_rules(
    rules: &SeverityRuleMap,
    tool: &str,
    code_or_message: &str,
    severity: Severity,
) -> Severity {
    if let Some(candidates) = rules.get(tool) {
        for rule in candidates {
            if rule.pattern.is_match(code_or_message) {
                return rule.severity;
            }
        }
    }
    severity
}

/// Register a custom override written as `tool:regex=level`.
///
/// Returns a human-readable message on parse failure instead of an
/// error type; a malformed rule must never abort a run.
pub fn add_custom_rule(rules: &mut SeverityRuleMap, spec: &str) -> Result<(), String> {
    let Some((tool, rest)) = spec.split_once(':') else {
        return Err(format!("invalid rule '{spec}': missing ':' separator"));
    };
    let Some((pattern, level)) = rest.rsplit_once('=') else {
        return Err(format!("invalid rule '{spec}': missing '=' separator"));
    };
    let severity = match level.trim().to_ascii_lowercase().as_str() {
        "error" => Severity::Error,
        "warning" => Severity::Warning,
        "notice" => Severity::Notice,
        "note" => Severity::Note,
        other => return Err(format!("invalid severity level '{other}'")),
    };
    let compiled =
        Regex::new(pattern).map_err(|err| format!("invalid pattern '{pattern}': {err}"))?;
    rules.entry(tool.to_string()).or_default().push(SeverityRule {
        pattern: compiled,
        severity,
    });
    Ok(())
}

/// Infer severity from conventional code prefixes (`E`/`F` error, `W`
/// warning).
pub fn severity_from_code(code: Option<&str>, default: Severity) -> Severity {
    let Some(code) = code else { return default };
    match code.chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('E') | Some('F') => Severity::Error,
        Some('W') => Severity::Warning,
        _ => default,
    }
}

/// Map a severity onto the SARIF reporting level vocabulary.
pub fn severity_to_sarif(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Notice | Severity::Note => "note",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ruff_documentation_codes_downgrade_to_notice() {
        let rules = default_severity_rules();
        assert_eq!(
            apply_severity_rules(&rules, "ruff", "D401", Severity::Error),
            Severity::Notice
        );
        assert_eq!(
            apply_severity_rules(&rules, "ruff", "N8012", Severity::Warning),
            Severity::Notice
        );
        assert_eq!(
            apply_severity_rules(&rules, "ruff", "E501", Severity::Error),
            Severity::Error
        );
    }

    #[test]
    fn pylint_convention_and_refactor_codes_downgrade() {
        let rules = default_severity_rules();
        assert_eq!(
            apply_severity_rules(&rules, "pylint", "C0114", Severity::Warning),
            Severity::Notice
        );
        assert_eq!(
            apply_severity_rules(&rules, "pylint", "R0801", Severity::Warning),
            Severity::Notice
        );
        assert_eq!(
            apply_severity_rules(&rules, "pylint", "W0613", Severity::Warning),
            Severity::Warning
        );
    }

    #[test]
    fn custom_rules_parse_and_apply() {
        let mut rules = default_severity_rules();
        add_custom_rule(&mut rules, "mypy:^assignment$=note").expect("valid rule");
        assert_eq!(
            apply_severity_rules(&rules, "mypy", "assignment", Severity::Error),
            Severity::Note
        );
    }

    #[test]
    fn malformed_custom_rules_report_instead_of_failing() {
        let mut rules = SeverityRuleMap::new();
        assert!(add_custom_rule(&mut rules, "no-separators").is_err());
        assert!(add_custom_rule(&mut rules, "tool:re=speculative").is_err());
        assert!(add_custom_rule(&mut rules, "tool:[unclosed=error").is_err());
        assert!(rules.is_empty());
    }

    #[test]
    fn code_prefix_inference() {
        assert_eq!(
            severity_from_code(Some("E101"), Severity::Note),
            Severity::Error
        );
        assert_eq!(
            severity_from_code(Some("F841"), Severity::Note),
            Severity::Error
        );
        assert_eq!(
            severity_from_code(Some("W291"), Severity::Note),
            Severity::Warning
        );
        assert_eq!(
            severity_from_code(Some("D100"), Severity::Note),
            Severity::Note
        );
        assert_eq!(severity_from_code(None, Severity::Warning), Severity::Warning);
    }

    #[test]
    fn sarif_levels_are_fixed() {
        assert_eq!(severity_to_sarif(Severity::Error), "error");
        assert_eq!(severity_to_sarif(Severity::Warning), "warning");
        assert_eq!(severity_to_sarif(Severity::Notice), "note");
        assert_eq!(severity_to_sarif(Severity::Note), "note");
    }
}
