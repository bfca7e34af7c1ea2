//! Message sink abstraction.
//!
//! The CLI layer injects its own presentation-aware logger; the default
//! routes everything through `tracing` so headless consumers still get
//! structured output.

pub trait Logger: Send + Sync {
    fn ok(&self, message: &str);
    fn warn(&self, message: &str);
    fn fail(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Default sink backed by `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn ok(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn fail(&self, message: &str) {
        tracing::error!("{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }
}
