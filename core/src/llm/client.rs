//! Google Generative AI (Gemini) client
//!
//! Speaks the `generateContent` protocol with native function calling: the
//! conversation goes out as `contents`, the tool schema as
//! `functionDeclarations`, and the reply is either a `functionCall` part or
//! text.

use super::{chat::ToolInvocation, LlmConfig, ModelClient, ModelReply, Turn};
use crate::agent::tool::ToolDeclaration;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Stateless client for one Gemini model
pub struct GeminiClient {
    config: LlmConfig,
    http_client: HttpClient,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AgentError::MissingConfig {
                key: "provider.api_key".to_string(),
            });
        }

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("sitesmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AgentError::InvalidConfig {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { config, http_client })
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_request<'a>(
        &self,
        history: &'a [Turn],
        tools: &[ToolDeclaration],
        system_instruction: &str,
    ) -> GeminiRequest<'a> {
        let system_instruction = if system_instruction.trim().is_empty() {
            None
        } else {
            Some(GeminiSystemInstruction {
                parts: vec![GeminiTextPart {
                    text: system_instruction.to_string(),
                }],
            })
        };

        let tools = if tools.is_empty() {
            Vec::new()
        } else {
            vec![GeminiTool {
                function_declarations: tools.iter().map(|t| t.to_function_declaration()).collect(),
            }]
        };

        let generation_config =
            if self.config.max_output_tokens.is_some() || self.config.temperature.is_some() {
                Some(GeminiGenerationConfig {
                    max_output_tokens: self.config.max_output_tokens,
                    temperature: self.config.temperature,
                })
            } else {
                None
            };

        GeminiRequest {
            contents: history,
            system_instruction,
            tools,
            generation_config,
        }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(
        &self,
        history: &[Turn],
        tools: &[ToolDeclaration],
        system_instruction: &str,
    ) -> Result<ModelReply> {
        let body = self.build_request(history, tools, system_instruction);

        crate::info_log!(
            "Generate request: model={}, turns={}, tools={}",
            self.config.model,
            history.len(),
            tools.len()
        );

        let started = Instant::now();
        let response = self
            .http_client
            .post(self.endpoint())
            .header(CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::ConnectionFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::ConnectionFailed {
                message: format!("failed to read response body: {}", e),
            })?;

        if !status.is_success() {
            crate::error_log!(
                "Generate failed after {:?}: status={} body={}",
                started.elapsed(),
                status,
                text
            );
            return Err(status_error(status, &text));
        }

        let response_body: GeminiResponse = serde_json::from_str(&text).map_err(|e| {
            crate::error_log!("Failed to parse Gemini response: {}. Raw body: {}", e, text);
            AgentError::Json(format!("failed to parse Gemini response: {}", e))
        })?;

        if let Some(usage) = &response_body.usage_metadata {
            crate::info_log!(
                "Generate completed in {:?}: prompt={} completion={} total={}",
                started.elapsed(),
                usage.prompt_token_count,
                usage.candidates_token_count,
                usage.total_token_count
            );
        }

        parse_reply(response_body)
    }
}

/// Map a non-success HTTP status to the error taxonomy.
fn status_error(status: StatusCode, body: &str) -> AgentError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "Unknown error".to_string());

    match status {
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited { message },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Unauthorized { message },
        status => AgentError::ProviderError {
            status: status.as_u16(),
            message,
        },
    }
}

/// Turn a decoded response into the loop's next step.
///
/// Only the first function call is honoured. With no call, the text parts
/// (minus thought summaries) form the final answer.
fn parse_reply(response: GeminiResponse) -> Result<ModelReply> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(AgentError::EmptyReply {
            finish_reason: response.prompt_feedback.and_then(|f| f.block_reason),
        });
    };

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

    let mut calls = parts.iter().filter_map(|p| p.function_call.as_ref());
    if let Some(first) = calls.next() {
        let discarded = calls.count();
        if discarded > 0 {
            crate::warn_log!(
                "Model returned {} extra function call(s); only '{}' will run",
                discarded,
                first.name
            );
        }
        return Ok(ModelReply::ToolCall {
            name: first.name.clone(),
            arguments: first.args.clone(),
        });
    }

    let text: String = parts
        .iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        return Err(AgentError::EmptyReply {
            finish_reason: candidate.finish_reason,
        });
    }

    Ok(ModelReply::FinalText(text))
}

// Gemini API types
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: &'a [Turn],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiTextPart>,
}

#[derive(Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<ToolInvocation>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}
