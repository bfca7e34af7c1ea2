//! Output configuration consumed by reporters and the diagnostic filter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Presentation knobs plus the per-tool suppression patterns.
///
/// The engine only interprets `tool_filters`; the remaining toggles are
/// forwarded to the reporting layer untouched.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Per-tool regex patterns that drop matching diagnostics and
    /// output lines.
    #[serde(default)]
    pub tool_filters: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub quiet: bool,

    #[serde(default)]
    pub verbose: bool,

    /// Emit advisory hints alongside diagnostics.
    #[serde(default)]
    pub advice: bool,
}
