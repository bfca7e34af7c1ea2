//! Execution outcomes: per-action results and the aggregated run result.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;

/// Return code synthesized for actions that exceed their timeout.
pub const TIMEOUT_RETURNCODE: i32 = 124;

/// Classification of how an action concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCategory {
    /// Clean zero exit.
    Success,
    /// Nonzero exit backed by parsed diagnostics.
    Diagnostic,
    /// Nonzero exit with nothing parseable, or a contained engine failure.
    ToolFailure,
    /// The subprocess exceeded its configured timeout.
    Timeout,
    /// Never started: the run bailed before this action's turn.
    Skipped,
}

impl ExitCategory {
    /// Map a completed execution to its category.
    pub fn from_execution(returncode: i32, has_diagnostics: bool, timed_out: bool) -> Self {
        if timed_out {
            Self::Timeout
        } else if returncode == 0 {
            Self::Success
        } else if has_diagnostics {
            Self::Diagnostic
        } else {
            Self::ToolFailure
        }
    }
}

/// The complete result of one tool action.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolOutcome {
    pub tool: String,
    pub action: String,
    pub returncode: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub cached: bool,
    pub exit_category: ExitCategory,
}

impl ToolOutcome {
    /// Outcome for an action the bail drain never started.
    pub fn skipped(tool: &str, action: &str) -> Self {
        Self {
            tool: tool.to_string(),
            action: action.to_string(),
            returncode: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
            diagnostics: Vec::new(),
            cached: false,
            exit_category: ExitCategory::Skipped,
        }
    }

    /// Outcome for a failure contained to this action (preparation or
    /// parser errors, spawn failures, installer errors).
    pub fn failure(tool: &str, action: &str, message: &str) -> Self {
        Self {
            tool: tool.to_string(),
            action: action.to_string(),
            returncode: 1,
            stdout: Vec::new(),
            stderr: vec![message.to_string()],
            diagnostics: Vec::new(),
            cached: false,
            exit_category: ExitCategory::ToolFailure,
        }
    }

    /// True when this outcome should stop a bail-mode run.
    pub fn is_success(&self) -> bool {
        matches!(
            self.exit_category,
            ExitCategory::Success | ExitCategory::Skipped
        )
    }
}

/// Aggregated result of a full orchestrator run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunResult {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    pub outcomes: Vec<ToolOutcome>,
}

impl RunResult {
    /// Any tool exited non-success.
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|outcome| {
            !matches!(
                outcome.exit_category,
                ExitCategory::Success | ExitCategory::Skipped
            )
        })
    }

    /// Any outcome carries diagnostics.
    pub fn has_diagnostics(&self) -> bool {
        self.outcomes
            .iter()
            .any(|outcome| !outcome.diagnostics.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_category_mapping() {
        assert_eq!(
            ExitCategory::from_execution(0, false, false),
            ExitCategory::Success
        );
        assert_eq!(
            ExitCategory::from_execution(1, true, false),
            ExitCategory::Diagnostic
        );
        assert_eq!(
            ExitCategory::from_execution(1, false, false),
            ExitCategory::ToolFailure
        );
        assert_eq!(
            ExitCategory::from_execution(TIMEOUT_RETURNCODE, false, true),
            ExitCategory::Timeout
        );
    }

    #[test]
    fn skipped_outcomes_do_not_count_as_failures() {
        let result = RunResult {
            root: PathBuf::from("/repo"),
            files: Vec::new(),
            outcomes: vec![ToolOutcome::skipped("ruff", "lint")],
        };
        assert!(!result.has_failures());
        assert!(!result.has_diagnostics());
    }
}
