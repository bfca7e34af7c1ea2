//! Action execution: subprocess discipline, result caching, and the
//! orchestrator that drives the whole pipeline.

pub mod cache;
pub mod orchestrator;
pub mod process;

pub use cache::ResultCache;
pub use orchestrator::{FetchedTool, Orchestrator, OrchestratorHooks};
pub use process::{CommandOptions, CommandOutput, CommandRunner, SystemProcessRunner};
