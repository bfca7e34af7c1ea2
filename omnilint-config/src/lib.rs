//! Resolved configuration model for the omnilint execution engine.
//!
//! This crate holds the value types the engine consumes once a
//! configuration file has been loaded and merged by the CLI layer. It
//! performs no I/O of its own: loaders live upstream, the engine treats
//! [`Config`] as read-only input.

pub mod discovery;
pub mod execution;
pub mod limits;
pub mod output;
pub mod severity;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use discovery::FileDiscoveryConfig;
pub use execution::ExecutionConfig;
pub use limits::{ComplexityConfig, QualityConfig, StrictnessConfig, StrictnessLevel};
pub use output::OutputConfig;
pub use severity::{SensitivityLevel, SeverityConfig};

/// Effective configuration for a single orchestrator run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub file_discovery: FileDiscoveryConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub severity: SeverityConfig,

    #[serde(default)]
    pub strictness: StrictnessConfig,

    #[serde(default)]
    pub complexity: ComplexityConfig,

    #[serde(default)]
    pub quality: QualityConfig,

    /// Per-tool settings bags forwarded to command builders verbatim.
    #[serde(default)]
    pub tool_settings: BTreeMap<String, Value>,
}

impl Config {
    /// Return the configuration subset that can change a tool's outcome.
    ///
    /// The result cache hashes this value, so it must be deterministic:
    /// map keys are sorted and only knobs that actually reach tools are
    /// included.
    pub fn tool_fingerprint_inputs(&self, tool: &str) -> Value {
        let mut inputs = BTreeMap::new();
        let _ = inputs.insert(
            "settings".to_string(),
            self.tool_settings.get(tool).cloned().unwrap_or(Value::Null),
        );
        let _ = inputs.insert(
            "filters".to_string(),
            serde_json::to_value(self.output.tool_filters.get(tool)).unwrap_or(Value::Null),
        );
        let _ = inputs.insert(
            "severity".to_string(),
            serde_json::to_value(&self.severity).unwrap_or(Value::Null),
        );
        let _ = inputs.insert(
            "strictness".to_string(),
            serde_json::to_value(&self.strictness).unwrap_or(Value::Null),
        );
        let _ = inputs.insert(
            "complexity".to_string(),
            serde_json::to_value(&self.complexity).unwrap_or(Value::Null),
        );
        let _ = inputs.insert(
            "quality".to_string(),
            serde_json::to_value(&self.quality).unwrap_or(Value::Null),
        );
        let _ = inputs.insert(
            "line_length".to_string(),
            Value::from(self.execution.line_length),
        );
        let _ = inputs.insert(
            "sql_dialect".to_string(),
            Value::from(self.execution.sql_dialect.clone()),
        );
        let _ = inputs.insert(
            "python_version".to_string(),
            serde_json::to_value(&self.execution.python_version).unwrap_or(Value::Null),
        );
        serde_json::to_value(inputs).unwrap_or(Value::Null)
    }
}
