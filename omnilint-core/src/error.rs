//! Fatal engine errors.
//!
//! Only failures that invalidate a whole run surface here; anything
//! containable to a single tool is folded into that tool's outcome.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// `--only` named tools that no registry entry resolves.
    #[error("Unknown tool(s) requested via --only: {}", .names.join(", "))]
    UnknownToolsRequested { names: Vec<String> },

    /// A tool name was registered twice.
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
