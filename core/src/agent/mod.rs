//! Agent module
//!
//! ```text
//! goal ──► AgentLoop ──► ModelClient ──► ToolCall ──► ToolRegistry ──► Tool
//!              ▲                              │
//!              └──── ConversationHistory ◄────┘ (result turn)
//! ```
//!
//! The loop ends when the model replies with text instead of a tool call.

pub mod core;
pub mod history;
pub mod logger;
pub mod prompt;
pub mod tool;
pub mod tool_registry;
pub mod tools;

pub use self::core::{AgentEvent, AgentLoop, AgentRun, EventCallback, DEFAULT_MAX_TURNS};
pub use history::{ConversationHistory, KeepAll, KeepRecent, RetentionPolicy};
pub use prompt::{system_instruction, Platform};
pub use tool::{ParameterSpec, ParameterType, Tool, ToolDeclaration};
pub use tool_registry::ToolRegistry;
pub use tools::{ShellTool, EXECUTE_COMMAND};

#[cfg(test)]
mod tests;
