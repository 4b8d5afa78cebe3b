//! Conversation types exchanged with the model
//!
//! A conversation is a list of [`Turn`]s. Each turn belongs to the user or
//! the model and carries one or more [`Part`]s: plain text, a tool
//! invocation or the result of one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human, and tool results reported back on their behalf
    User,
    /// The language model
    Model,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
        }
    }
}

/// A request from the model to run a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// What a tool returned, keyed by the tool name it answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub name: String,
    pub response: Value,
}

impl ToolOutput {
    /// Wrap a rendered tool result as `{ "result": ... }`.
    pub fn from_result(name: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response: serde_json::json!({ "result": result.into() }),
        }
    }

    /// The rendered text, if the payload has the usual shape.
    pub fn result_text(&self) -> Option<&str> {
        self.response.get("result").and_then(|v| v.as_str())
    }
}

/// One piece of a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    FunctionCall(ToolInvocation),
    FunctionResponse(ToolOutput),
}

/// One entry in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    /// A user turn holding plain text
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// A model turn holding plain text
    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// A model turn recording a tool invocation
    pub fn tool_call(invocation: ToolInvocation) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::FunctionCall(invocation)],
        }
    }

    /// A user turn reporting a tool's result back to the model
    pub fn tool_result(output: ToolOutput) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::FunctionResponse(output)],
        }
    }

    /// Concatenated text parts, if any
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join(""))
        }
    }

    pub fn invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.parts.iter().filter_map(|p| match p {
            Part::FunctionCall(call) => Some(call),
            _ => None,
        })
    }

    pub fn outputs(&self) -> impl Iterator<Item = &ToolOutput> {
        self.parts.iter().filter_map(|p| match p {
            Part::FunctionResponse(out) => Some(out),
            _ => None,
        })
    }

    pub fn is_tool_call(&self) -> bool {
        self.invocations().next().is_some()
    }

    pub fn is_tool_result(&self) -> bool {
        self.outputs().next().is_some()
    }
}

/// What the model decided to do next
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Run this tool and report back
    ToolCall { name: String, arguments: Value },
    /// The task is finished; this is the answer for the human
    FinalText(String),
}
