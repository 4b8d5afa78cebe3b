//! Agent loop implementation
//!
//! Drives one goal to completion: ask the model, run the tool it picks,
//! report the result, repeat until it answers in plain text.

use crate::agent::history::{ConversationHistory, KeepAll, RetentionPolicy};
use crate::agent::tool::Tool;
use crate::agent::tool_registry::ToolRegistry;
use crate::error::{AgentError, Result};
use crate::llm::chat::{ModelReply, ToolInvocation, ToolOutput, Turn};
use crate::llm::ModelClient;
use serde_json::Value;
use std::sync::Arc;

/// Model calls allowed per run unless configured otherwise
pub const DEFAULT_MAX_TURNS: usize = 50;

/// Progress notifications for whoever is watching the run
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// The model asked for a tool; emitted before it runs
    ToolRequested { name: String, arguments: Value },
    /// The tool finished; `result` is exactly what the model will see
    ToolCompleted { name: String, result: String },
    /// The model answered and the run is over
    FinalAnswer(String),
}

pub type EventCallback = Arc<dyn Fn(&AgentEvent) + Send + Sync>;

/// Outcome of a completed run
#[derive(Debug)]
pub struct AgentRun {
    pub final_text: String,
    pub history: ConversationHistory,
    pub model_calls: usize,
    pub tool_calls: usize,
}

enum LoopState {
    AwaitingModel,
    DispatchingTool {
        name: String,
        arguments: Value,
        tool: Arc<dyn Tool>,
    },
    Terminated(String),
}

/// Orchestrates model calls and tool dispatch for one goal at a time.
///
/// Holds no per-run state, so one instance can serve any number of goals;
/// every run gets a fresh history.
pub struct AgentLoop {
    client: Arc<dyn ModelClient>,
    registry: ToolRegistry,
    system_instruction: String,
    max_turns: Option<usize>,
    retention: Arc<dyn RetentionPolicy>,
    event_callback: Option<EventCallback>,
}

impl AgentLoop {
    pub fn new(
        client: Arc<dyn ModelClient>,
        registry: ToolRegistry,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            client,
            registry,
            system_instruction: system_instruction.into(),
            max_turns: Some(DEFAULT_MAX_TURNS),
            retention: Arc::new(KeepAll),
            event_callback: None,
        }
    }

    /// Cap the number of model calls per run. `0` removes the cap.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = if max_turns == 0 { None } else { Some(max_turns) };
        self
    }

    /// Choose which part of the history is sent on each call.
    pub fn with_retention(mut self, retention: Arc<dyn RetentionPolicy>) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.event_callback = Some(callback);
        self
    }

    pub fn max_turns(&self) -> Option<usize> {
        self.max_turns
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(callback) = &self.event_callback {
            callback(&event);
        }
    }

    /// Run `goal` against a fresh history.
    pub async fn run(&self, goal: &str) -> Result<AgentRun> {
        let mut history = ConversationHistory::new();
        let (final_text, model_calls, tool_calls) = self.drive(goal, &mut history).await?;
        Ok(AgentRun {
            final_text,
            history,
            model_calls,
            tool_calls,
        })
    }

    /// Run `goal`, appending to a caller-owned history.
    ///
    /// On error the history is left as it was when the run stopped, which
    /// is what callers inspect to see how far it got.
    pub async fn run_with_history(&self, goal: &str, history: &mut ConversationHistory) -> Result<String> {
        self.drive(goal, history).await.map(|(text, _, _)| text)
    }

    async fn drive(&self, goal: &str, history: &mut ConversationHistory) -> Result<(String, usize, usize)> {
        crate::info_log!("Starting run: {}", goal);
        history.append(Turn::user_text(goal))?;

        let declarations = self.registry.declarations();
        let mut model_calls = 0usize;
        let mut tool_calls = 0usize;
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    if let Some(max) = self.max_turns {
                        if model_calls >= max {
                            crate::warn_log!("Turn limit of {} reached without a final answer", max);
                            return Err(AgentError::TurnLimitReached { max_turns: max });
                        }
                    }
                    model_calls += 1;

                    let view = history.view(self.retention.as_ref());
                    let reply = self
                        .client
                        .generate(&view, &declarations, &self.system_instruction)
                        .await?;

                    match reply {
                        ModelReply::ToolCall { name, arguments } => {
                            crate::info_log!("Model call {}: tool '{}' args={}", model_calls, name, arguments);
                            history.append(Turn::tool_call(ToolInvocation {
                                name: name.clone(),
                                args: arguments.clone(),
                            }))?;

                            let tool = self.registry.resolve(&name).map_err(|e| {
                                crate::error_log!("Model requested undeclared tool '{}'", name);
                                e
                            })?;

                            self.emit(AgentEvent::ToolRequested {
                                name: name.clone(),
                                arguments: arguments.clone(),
                            });
                            LoopState::DispatchingTool { name, arguments, tool }
                        }
                        ModelReply::FinalText(text) => {
                            crate::info_log!("Model call {}: final answer ({} chars)", model_calls, text.len());
                            history.append(Turn::model_text(text.clone()))?;
                            self.emit(AgentEvent::FinalAnswer(text.clone()));
                            LoopState::Terminated(text)
                        }
                    }
                }
                LoopState::DispatchingTool { name, arguments, tool } => {
                    tool_calls += 1;
                    let result = match tool.call(&arguments).await {
                        Ok(output) => output,
                        Err(e) => format!("Error {:#}", e),
                    };

                    history.append(Turn::tool_result(ToolOutput::from_result(&name, result.clone())))?;
                    self.emit(AgentEvent::ToolCompleted { name, result });
                    LoopState::AwaitingModel
                }
                LoopState::Terminated(text) => {
                    crate::info_log!(
                        "Run finished after {} model call(s) and {} tool call(s)",
                        model_calls,
                        tool_calls
                    );
                    return Ok((text, model_calls, tool_calls));
                }
            };
        }
    }
}
