//! Canned suppression patterns for test code.
//!
//! Lint findings that are routine in test suites (unused fixture
//! arguments, duplicated scaffolding, loose asserts) drown real signal.
//! These per-tool pattern lists plug straight into
//! `OutputConfig::tool_filters`.

use std::collections::BTreeMap;

/// Suppression patterns keyed by tool for the requested languages.
pub fn test_suppressions(languages: &[&str]) -> BTreeMap<String, Vec<String>> {
    let mut filters: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for language in languages {
        match *language {
            "python" => {
                extend(
                    &mut filters,
                    "pylint",
                    &[
                        // Unused arguments in test files are usually fixtures.
                        r"\btests?/\S*\.py\b.*\bW06\d{2}\b",
                        // Duplicate-code blocks that only span test modules.
                        r"\bR0801\b[\s\S]*==\s*tests?/",
                        r"\btests?/\S*\.py\b.*\bprotected-access\b",
                    ],
                );
                extend(
                    &mut filters,
                    "ruff",
                    &[
                        r"\btests?/\S*\.py\b.*\bS101\b",
                        r"\btests?/\S*\.py\b.*\bPLR2004\b",
                    ],
                );
                extend(&mut filters, "bandit", &[r"\btests?/\S*\.py\b.*\bB101\b"]);
            }
            "javascript" | "typescript" => {
                extend(
                    &mut filters,
                    "eslint",
                    &[r"\b__tests__/.*\bno-unused-vars\b", r"\.test\.[jt]sx?\b.*\bno-magic-numbers\b"],
                );
            }
            "go" => {
                extend(&mut filters, "golangci-lint", &[r"_test\.go\b.*\bunparam\b"]);
            }
            "rust" => {
                extend(&mut filters, "clippy", &[r"\btests?/\S*\.rs\b.*\bunwrap_used\b"]);
            }
            _ => {}
        }
    }
    filters
}

fn extend(filters: &mut BTreeMap<String, Vec<String>>, tool: &str, patterns: &[&str]) {
    filters
        .entry(tool.to_string())
        .or_default()
        .extend(patterns.iter().map(|p| (*p).to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::normalize::compile_filters;

    #[test]
    fn python_suppressions_cover_unused_test_arguments() {
        let filters = test_suppressions(&["python"]);
        let patterns = filters.get("pylint").expect("pylint patterns");
        let compiled = compile_filters(patterns);
        let probe = "pylint tests/test_runner.py 94 W0613 W0613 Unused argument 'command'";
        assert!(compiled.iter().any(|regex| regex.is_match(probe)));
    }

    #[test]
    fn python_suppressions_cover_duplicate_test_blocks() {
        let filters = test_suppressions(&["python"]);
        let compiled = compile_filters(filters.get("pylint").expect("pylint patterns"));
        let probe = "pylint tests/test_runner.py 1 R0801 Similar lines in 2 files\n\
                     ==tests/test_runner.py:[1:3]\n==tests/other.py:[5:7]";
        assert!(compiled.iter().any(|regex| regex.is_match(probe)));
    }

    #[test]
    fn unknown_languages_produce_no_filters() {
        assert!(test_suppressions(&["cobol"]).is_empty());
    }
}
