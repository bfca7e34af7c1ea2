//! Package specifier parsing shared across runtimes.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::ToolDefinition;

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").expect("slug pattern"));
static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)+)").expect("version pattern"));

/// Filesystem-friendly slug for a requirement string.
pub fn slugify(value: &str) -> String {
    SLUG_PATTERN.replace_all(value, "-").into_owned()
}

/// Split a specifier into name and version. Scoped npm packages
/// (`@org/pkg@1.0`) keep their scope; URL-ish specs are opaque.
pub fn split_package_spec(spec: &str) -> (String, Option<String>) {
    if spec.starts_with("git+") || spec.starts_with("file:") || spec.starts_with("http") {
        return (spec.to_string(), None);
    }
    if let Some(stripped) = spec.strip_prefix('@') {
        return match stripped.rsplit_once('@') {
            Some((name, version)) => (format!("@{name}"), Some(version.to_string())),
            None => (spec.to_string(), None),
        };
    }
    match spec.rsplit_once('@') {
        Some((name, version)) => (name.to_string(), Some(version.to_string())),
        None => (spec.to_string(), None),
    }
}

/// Dotted version embedded in `text`, if any.
pub fn extract_version(text: &str) -> Option<String> {
    VERSION_PATTERN
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// The version a prepared command must satisfy: a pin embedded in the
/// package spec wins over the declared minimum.
pub fn desired_version(tool: &ToolDefinition) -> Option<String> {
    if let Some(package) = &tool.package {
        let (_, specified) = split_package_spec(package);
        if let Some(version) = specified.as_deref().and_then(extract_version) {
            return Some(version);
        }
    }
    tool.min_version.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RuntimeKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn slugs_replace_everything_unfriendly() {
        assert_eq!(slugify("@scope/pkg@1.2.3"), "-scope-pkg-1.2.3");
        assert_eq!(slugify("golang.org/x/tools/cmd/stringer"), "golang.org-x-tools-cmd-stringer");
    }

    #[test]
    fn package_specs_split_on_the_last_at() {
        assert_eq!(
            split_package_spec("eslint@9.1.0"),
            ("eslint".to_string(), Some("9.1.0".to_string()))
        );
        assert_eq!(
            split_package_spec("@typescript-eslint/parser@7.0.0"),
            (
                "@typescript-eslint/parser".to_string(),
                Some("7.0.0".to_string())
            )
        );
        assert_eq!(
            split_package_spec("@scope/bare"),
            ("@scope/bare".to_string(), None)
        );
        assert_eq!(
            split_package_spec("git+https://example.com/repo.git"),
            ("git+https://example.com/repo.git".to_string(), None)
        );
    }

    #[test]
    fn desired_version_prefers_the_pinned_spec() {
        let pinned = ToolDefinition::new("eslint", RuntimeKind::Npm)
            .with_package("eslint@9.1.0")
            .with_min_version("8.0.0");
        assert_eq!(desired_version(&pinned), Some("9.1.0".to_string()));

        let minimum = ToolDefinition::new("eslint", RuntimeKind::Npm)
            .with_package("eslint")
            .with_min_version("8.0.0");
        assert_eq!(desired_version(&minimum), Some("8.0.0".to_string()));

        let unconstrained = ToolDefinition::new("eslint", RuntimeKind::Npm);
        assert_eq!(desired_version(&unconstrained), None);
    }
}
