//! Severity configuration shared between selection and normalization.

use serde::{Deserialize, Serialize};

/// How aggressively internal linters are enabled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityLevel {
    Low,
    #[default]
    Medium,
    High,
    Maximum,
}

impl SensitivityLevel {
    /// Internal linters switch on at `high` and above.
    pub fn enables_internal(self) -> bool {
        matches!(self, Self::High | Self::Maximum)
    }
}

/// Severity knobs forwarded to tools and the normalizer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeverityConfig {
    #[serde(default)]
    pub sensitivity: SensitivityLevel,

    /// Custom severity overrides in `tool:regex=level` form.
    #[serde(default)]
    pub rules: Vec<String>,

    /// Minimum severity forwarded to security scanners.
    #[serde(default = "default_security_level")]
    pub security_level: String,

    /// Minimum confidence forwarded to security scanners.
    #[serde(default = "default_security_level")]
    pub security_confidence: String,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            sensitivity: SensitivityLevel::default(),
            rules: Vec::new(),
            security_level: default_security_level(),
            security_confidence: default_security_level(),
        }
    }
}

fn default_security_level() -> String {
    "medium".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitivity_gates_internal_linters() {
        assert!(!SensitivityLevel::Low.enables_internal());
        assert!(!SensitivityLevel::Medium.enables_internal());
        assert!(SensitivityLevel::High.enables_internal());
        assert!(SensitivityLevel::Maximum.enables_internal());
    }

    #[test]
    fn sensitivity_parses_lowercase() {
        let level: SensitivityLevel = serde_json::from_str("\"maximum\"").expect("parse");
        assert_eq!(level, SensitivityLevel::Maximum);
    }
}
