//! Built-in tool implementations for the agent.
//!
//! Only the shell tool ships today; anything else that implements
//! [`crate::agent::tool::Tool`] can be registered alongside it.

pub mod shell;

pub use shell::{ShellTool, EXECUTE_COMMAND};
