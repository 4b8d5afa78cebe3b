//! LLM client module
//!
//! The agent loop only sees the [`ModelClient`] trait. [`GeminiClient`]
//! implements it against Google's Generative Language API and
//! [`RetryingClient`] wraps any implementation with the rate-limit retry
//! policy.

pub mod chat;
pub mod client;
pub mod retry;

pub use chat::{ModelReply, Part, Role, ToolInvocation, ToolOutput, Turn};
pub use client::GeminiClient;
pub use retry::{RetryPolicy, RetryingClient};

use crate::agent::tool::ToolDeclaration;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Callback for human-facing status updates (e.g. retry waits)
pub type StatusCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Default endpoint for the Generative Language API
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Anything that can pick the agent's next step from a conversation.
///
/// Calls are stateless: the whole history goes out every time.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(
        &self,
        history: &[Turn],
        tools: &[ToolDeclaration],
        system_instruction: &str,
    ) -> Result<ModelReply>;
}

/// LLM Configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API endpoint base URL
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// API key
    pub api_key: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum tokens in response
    pub max_output_tokens: Option<u32>,
    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        LlmConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            timeout_secs: 300,
            max_output_tokens: None,
            temperature: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp.clamp(0.0, 2.0));
        self
    }
}
