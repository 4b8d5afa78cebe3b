pub mod agent;
pub mod config;
pub mod error;
pub mod executor;
pub mod llm;

// Re-exports for convenience
pub use agent::{AgentEvent, AgentLoop, AgentRun, ConversationHistory, ToolRegistry};
pub use config::Config;
pub use error::{AgentError, Result};
pub use executor::{CommandExecutor, ExecutionResult};
pub use llm::{GeminiClient, ModelClient, RetryPolicy, RetryingClient};
