//! Fallback runtime for tools executed directly as system binaries.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::strategy::{project_binary, RuntimeContext, RuntimeStrategy};
use super::versioning::VersionResolver;
use super::{CommandSource, PreparedCommand};

pub struct BinaryStrategy {
    versions: Arc<VersionResolver>,
}

impl BinaryStrategy {
    pub fn new(versions: Arc<VersionResolver>) -> Self {
        Self { versions }
    }

    fn system_command(ctx: &RuntimeContext) -> PreparedCommand {
        PreparedCommand {
            cmd: ctx.command_list(),
            env: BTreeMap::new(),
            version: None,
            source: CommandSource::System,
        }
    }
}

#[async_trait]
impl RuntimeStrategy for BinaryStrategy {
    fn versions(&self) -> &VersionResolver {
        &self.versions
    }

    /// Plain binaries trust the system argv as-is; execution surfaces a
    /// missing executable as a tool failure, not preparation.
    async fn try_system(&self, ctx: &RuntimeContext) -> Result<Option<PreparedCommand>> {
        Ok(Some(Self::system_command(ctx)))
    }

    async fn try_project(&self, ctx: &RuntimeContext) -> Result<Option<PreparedCommand>> {
        Ok(project_binary(ctx, "bin"))
    }

    /// There is nothing to provision; local means the system command.
    async fn prepare_local(&self, ctx: &RuntimeContext) -> Result<PreparedCommand> {
        Ok(Self::system_command(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RuntimeKind, ToolDefinition};
    use crate::runtime::layout::ToolCacheLayout;

    fn context(root: &std::path::Path) -> RuntimeContext {
        RuntimeContext::new(
            Arc::new(ToolDefinition::new("shellcheck", RuntimeKind::Binary)),
            vec!["shellcheck".to_string(), "-f".to_string(), "json".to_string()],
            root.to_path_buf(),
            ToolCacheLayout::new(root.join(".cache")),
        )
    }

    #[tokio::test]
    async fn system_candidate_passes_the_argv_through() {
        let dir = tempfile::tempdir().expect("tempdir");
        let strategy = BinaryStrategy::new(Arc::new(VersionResolver::new()));
        let prepared = strategy
            .try_system(&context(dir.path()))
            .await
            .expect("try_system")
            .expect("candidate");
        assert_eq!(prepared.cmd[0], "shellcheck");
        assert_eq!(prepared.source, CommandSource::System);
        assert!(prepared.env.is_empty());
    }

    #[tokio::test]
    async fn local_preparation_is_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        let strategy = BinaryStrategy::new(Arc::new(VersionResolver::new()));
        let prepared = strategy
            .prepare_local(&context(dir.path()))
            .await
            .expect("prepare");
        assert_eq!(prepared.source, CommandSource::System);
    }
}
