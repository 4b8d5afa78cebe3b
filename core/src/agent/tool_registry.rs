//! Tool registry
//!
//! Maps a declared tool name to its implementation. The agent loop only
//! talks to the registry, so adding a tool never touches the loop.

use crate::agent::tool::{Tool, ToolDeclaration};
use crate::agent::tools::ShellTool;
use crate::error::{AgentError, Result};
use crate::executor::CommandExecutor;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new, empty tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding just the shell tool, backed by `executor`.
    pub fn with_defaults(executor: Arc<CommandExecutor>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ShellTool::new(executor)));
        registry
    }

    /// Register a tool under its declared name, replacing any previous
    /// tool with that name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.declaration().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            crate::warn_log!("Tool '{}' registered twice; keeping the newer one", name);
        }
    }

    /// Look up a tool by name
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| AgentError::UnknownTool {
                tool_name: name.to_string(),
            })
    }

    /// Declarations to advertise to the model
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools.values().map(|t| t.declaration()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
