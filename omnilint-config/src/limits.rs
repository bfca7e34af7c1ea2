//! Strictness, complexity, and quality thresholds forwarded to tools.

use serde::{Deserialize, Serialize};

/// Overall strictness profile applied to compatible tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrictnessLevel {
    Lenient,
    #[default]
    Standard,
    Strict,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StrictnessConfig {
    #[serde(default)]
    pub level: StrictnessLevel,

    /// Fail when a tool's own configuration cannot be validated.
    #[serde(default)]
    pub strict_config: bool,
}

/// Complexity ceilings forwarded to tools that accept them.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComplexityConfig {
    #[serde(default = "default_max_complexity")]
    pub max_complexity: Option<u32>,

    #[serde(default = "default_max_arguments")]
    pub max_arguments: Option<u32>,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            max_complexity: default_max_complexity(),
            max_arguments: default_max_arguments(),
        }
    }
}

/// Auxiliary quality-check toggles carried for fingerprinting.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QualityConfig {
    #[serde(default)]
    pub checks: Vec<String>,

    #[serde(default)]
    pub skip_globs: Vec<String>,
}

fn default_max_complexity() -> Option<u32> {
    Some(10)
}

fn default_max_arguments() -> Option<u32> {
    Some(7)
}
