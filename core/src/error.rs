//! Structured error types for sitesmith
//!
//! Separates errors that end a single agent run (unknown tool, exhausted
//! retries, provider failures) from the ones the loop recovers from locally.
//! Command failures never show up here: they are rendered to text and fed
//! back to the model.

use thiserror::Error;

/// Primary error type for sitesmith operations
#[derive(Error, Debug)]
pub enum AgentError {
    // =========================================================================
    // Provider / API Errors
    // =========================================================================
    /// The model service throttled the request (HTTP 429)
    #[error("rate limit exceeded: {message}")]
    RateLimited { message: String },

    /// Every attempt allowed by the retry policy was throttled
    #[error("max retries exceeded due to rate limits ({attempts} attempts)")]
    RetriesExhausted { attempts: u32 },

    /// Authentication/authorization errors
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Provider returned a non-success status
    #[error("provider error: {status} - {message}")]
    ProviderError { status: u16, message: String },

    /// Network/connection error
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    /// The reply carried neither a tool call nor any text
    #[error("model returned an empty reply (finish reason: {})", finish_reason.as_deref().unwrap_or("none"))]
    EmptyReply { finish_reason: Option<String> },

    // =========================================================================
    // Loop / Protocol Errors
    // =========================================================================
    /// The model asked for a tool that was never declared
    #[error("unknown tool requested by model: {tool_name}")]
    UnknownTool { tool_name: String },

    /// The run hit its configured model-call cap
    #[error("turn limit reached (max {max_turns} model calls)")]
    TurnLimitReached { max_turns: usize },

    /// A turn would break the one-call-at-a-time request/response protocol
    #[error("conversation protocol violation: {reason}")]
    ProtocolViolation { reason: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Missing required config
    #[error("missing required configuration: {key}")]
    MissingConfig { key: String },

    // =========================================================================
    // External Error Wrappers
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl AgentError {
    /// Only throttling is worth retrying; everything else fails fast.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Whether this error ends the current goal's run.
    ///
    /// Rate limiting only ends the run once the retry wrapper has given up
    /// and turned it into `RetriesExhausted`.
    pub fn is_fatal_for_run(&self) -> bool {
        !self.is_rate_limit()
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized { .. } => {
                "Authentication failed. Please check your API key.".to_string()
            }
            Self::RetriesExhausted { .. } => {
                "The model service kept rate limiting us. Please wait a minute and try again."
                    .to_string()
            }
            Self::UnknownTool { tool_name } => {
                format!("The model asked for a tool that does not exist: '{}'.", tool_name)
            }
            Self::TurnLimitReached { max_turns } => format!(
                "Stopped after {} model calls without a final answer. Try a more specific request.",
                max_turns
            ),
            Self::MissingConfig { key } => {
                format!("Missing configuration '{}'. Set it in the config file or environment.", key)
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias using AgentError
pub type Result<T> = std::result::Result<T, AgentError>;

/// Extension trait for converting Option to Result with AgentError
pub trait OptionExt<T> {
    fn ok_or_missing(self, key: impl Into<String>) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_missing(self, key: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| AgentError::MissingConfig { key: key.into() })
    }
}
