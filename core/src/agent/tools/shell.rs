use crate::agent::tool::{ParameterSpec, ParameterType, Tool, ToolDeclaration};
use crate::executor::CommandExecutor;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Name the shell tool is declared and registered under
pub const EXECUTE_COMMAND: &str = "ExecuteCommand";

#[derive(Deserialize)]
struct ShellArgs {
    command: String,
}

/// Unrestricted shell access for the model.
pub struct ShellTool {
    executor: Arc<CommandExecutor>,
}

impl ShellTool {
    pub fn new(executor: Arc<CommandExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration::new(
            EXECUTE_COMMAND,
            "Execute a single terminal/shell command. A command can create a folder, \
             create a file, write to a file, edit a file or delete a file or folder.",
        )
        .with_parameter(ParameterSpec::required(
            "command",
            ParameterType::String,
            "A single terminal command to run verbatim. Example: \"mkdir Calculator\"",
        ))
    }

    async fn call(&self, args: &Value) -> Result<String> {
        let args: ShellArgs = serde_json::from_value(args.clone())
            .context("ExecuteCommand expects a JSON object with a string 'command' field")?;

        let result = self.executor.execute(&args.command).await;
        Ok(result.render())
    }
}
