//! omnilint execution engine.
//!
//! The engine turns a resolved [`omnilint_config::Config`] plus a
//! [`catalog::ToolRegistry`] into a [`outcome::RunResult`]: it discovers
//! candidate files, plans a phase-ordered tool selection, materializes
//! runnable commands per ecosystem, executes them with bounded
//! parallelism, normalizes tool output into canonical diagnostics, and
//! caches outcomes by input fingerprint.

pub mod catalog;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod execute;
pub mod logging;
pub mod outcome;
pub mod runtime;
pub mod selection;

pub use catalog::{
    CommandBuilder, Installer, InternalOutcome, InternalRunner, OutputParser, Phase, RuntimeKind,
    StaticCommand, ToolAction, ToolContext, ToolDefinition, ToolRegistry,
};
pub use diagnostics::{Diagnostic, DiagnosticNormalizer, RawDiagnostic, Severity};
pub use error::EngineError;
pub use execute::orchestrator::{FetchedTool, Orchestrator, OrchestratorHooks};
pub use execute::process::{CommandOptions, CommandOutput, CommandRunner, SystemProcessRunner};
pub use execute::ResultCache;
pub use logging::{Logger, TracingLogger};
pub use outcome::{ExitCategory, RunResult, ToolOutcome, TIMEOUT_RETURNCODE};
pub use runtime::{
    CommandPreparer, CommandSource, PreparationRequest, PreparedCommand, ToolCacheLayout,
    ToolPreparer, VersionResolver,
};
pub use selection::{
    SelectionContext, SelectionResult, ToolDecision, ToolFamily, ToolSelector,
};
