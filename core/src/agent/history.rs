//! Conversation history
//!
//! Append-only log of turns for a single run. Nothing is ever removed; a
//! [`RetentionPolicy`] only decides which slice of it goes out with each
//! model call.

use crate::error::{AgentError, Result};
use crate::llm::chat::{Part, Role, ToolInvocation, Turn};

/// Decides which turns are sent to the model on each call.
pub trait RetentionPolicy: Send + Sync {
    fn select(&self, turns: &[Turn]) -> Vec<Turn>;
}

/// Send everything, every time.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl RetentionPolicy for KeepAll {
    fn select(&self, turns: &[Turn]) -> Vec<Turn> {
        turns.to_vec()
    }
}

/// Send only the most recent turns.
///
/// The window is widened or shrunk so it starts on a user text turn: the
/// model service rejects conversations that open with a model turn or with
/// a tool result whose call was cut off.
#[derive(Debug, Clone, Copy)]
pub struct KeepRecent {
    pub max_turns: usize,
}

impl RetentionPolicy for KeepRecent {
    fn select(&self, turns: &[Turn]) -> Vec<Turn> {
        if turns.len() <= self.max_turns {
            return turns.to_vec();
        }

        let mut start = turns.len() - self.max_turns;
        while start < turns.len() && !is_user_text(&turns[start]) {
            start += 1;
        }
        if start == turns.len() {
            // No user text inside the window; fall back to the latest one.
            start = turns.iter().rposition(is_user_text).unwrap_or(0);
        }
        turns[start..].to_vec()
    }
}

fn is_user_text(turn: &Turn) -> bool {
    turn.role == Role::User && turn.parts.iter().all(|p| matches!(p, Part::Text(_)))
}

/// Ordered, append-only sequence of turns
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn, enforcing the request/response protocol.
    ///
    /// A tool result must answer the outstanding call with the same tool
    /// name, and a new call may not be issued while one is still open.
    pub fn append(&mut self, turn: Turn) -> Result<()> {
        if turn.parts.is_empty() {
            return Err(AgentError::ProtocolViolation {
                reason: format!("{} turn has no parts", turn.role),
            });
        }

        let mut outstanding = self.outstanding_call().map(|c| c.name.clone());
        for part in &turn.parts {
            match part {
                Part::FunctionCall(call) => {
                    if let Some(open) = &outstanding {
                        return Err(AgentError::ProtocolViolation {
                            reason: format!(
                                "tool call '{}' issued while '{}' is still awaiting its result",
                                call.name, open
                            ),
                        });
                    }
                    outstanding = Some(call.name.clone());
                }
                Part::FunctionResponse(output) => match outstanding.take() {
                    Some(open) if open == output.name => {}
                    Some(open) => {
                        return Err(AgentError::ProtocolViolation {
                            reason: format!(
                                "result for '{}' does not answer outstanding call '{}'",
                                output.name, open
                            ),
                        })
                    }
                    None => {
                        return Err(AgentError::ProtocolViolation {
                            reason: format!("result for '{}' has no matching call", output.name),
                        })
                    }
                },
                Part::Text(_) => {}
            }
        }

        self.turns.push(turn);
        Ok(())
    }

    /// The tool call still waiting for its result, if any.
    pub fn outstanding_call(&self) -> Option<&ToolInvocation> {
        let mut open = None;
        for turn in &self.turns {
            for part in &turn.parts {
                match part {
                    Part::FunctionCall(call) => open = Some(call),
                    Part::FunctionResponse(_) => open = None,
                    Part::Text(_) => {}
                }
            }
        }
        open
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns to send to the model under `policy`.
    pub fn view(&self, policy: &dyn RetentionPolicy) -> Vec<Turn> {
        policy.select(&self.turns)
    }
}
