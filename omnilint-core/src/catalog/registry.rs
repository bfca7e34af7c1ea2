//! Insertion-ordered index of tool definitions.

use std::sync::Arc;

use indexmap::IndexMap;

use super::ToolDefinition;
use crate::error::EngineError;

/// Registry of every tool the orchestrator can plan. Insertion order is
/// the selection tie-break, so registration order matters.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<ToolDefinition>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: ToolDefinition) -> Result<(), EngineError> {
        if self.tools.contains_key(&tool.name) {
            return Err(EngineError::DuplicateTool(tool.name));
        }
        let name = tool.name.clone();
        let _ = self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    pub fn try_get(&self, name: &str) -> Option<Arc<ToolDefinition>> {
        self.tools.get(name).cloned()
    }

    pub fn tools(&self) -> impl Iterator<Item = &Arc<ToolDefinition>> {
        self.tools.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RuntimeKind, StaticCommand, ToolAction};

    fn tool(name: &str) -> ToolDefinition {
        ToolDefinition::new(name, RuntimeKind::Binary)
            .with_action(ToolAction::new("lint", StaticCommand::new([name])))
    }

    #[test]
    fn registration_preserves_insertion_order() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("zeta")).expect("register");
        registry.register(tool("alpha")).expect("register");
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("ruff")).expect("register");
        assert!(matches!(
            registry.register(tool("ruff")),
            Err(EngineError::DuplicateTool(name)) if name == "ruff"
        ));
    }
}
