//! Agent loop scenarios against scripted models

use super::*;
use crate::error::{AgentError, Result};
use crate::executor::CommandExecutor;
use crate::llm::chat::{ModelReply, Role, Turn};
use crate::llm::ModelClient;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Replays scripted replies and records every history it was sent.
struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelReply>>>,
    repeat_last: Option<ModelReply>,
    seen: Mutex<Vec<Vec<Turn>>>,
    seen_tools: Mutex<Vec<Vec<String>>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<ModelReply>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            repeat_last: None,
            seen: Mutex::new(Vec::new()),
            seen_tools: Mutex::new(Vec::new()),
        })
    }

    /// A model that answers `reply` forever.
    fn always(reply: ModelReply) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            repeat_last: Some(reply),
            seen: Mutex::new(Vec::new()),
            seen_tools: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().len()
    }

    fn history_at(&self, call: usize) -> Vec<Turn> {
        self.seen.lock()[call].clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn generate(
        &self,
        history: &[Turn],
        tools: &[ToolDeclaration],
        _system_instruction: &str,
    ) -> Result<ModelReply> {
        self.seen.lock().push(history.to_vec());
        self.seen_tools
            .lock()
            .push(tools.iter().map(|t| t.name.clone()).collect());

        if let Some(next) = self.replies.lock().pop_front() {
            return next;
        }
        match &self.repeat_last {
            Some(reply) => Ok(reply.clone()),
            None => Err(AgentError::Internal {
                message: "script exhausted".to_string(),
            }),
        }
    }
}

/// Stand-in for the shell tool that counts invocations.
struct CountingTool {
    calls: AtomicUsize,
    reply: String,
}

impl CountingTool {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reply: reply.to_string(),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration::new(EXECUTE_COMMAND, "counts calls")
    }

    async fn call(&self, _args: &Value) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

fn tool_call(command: &str) -> ModelReply {
    ModelReply::ToolCall {
        name: EXECUTE_COMMAND.to_string(),
        arguments: json!({ "command": command }),
    }
}

fn counting_loop(model: Arc<ScriptedModel>, tool: Arc<CountingTool>) -> AgentLoop {
    let mut registry = ToolRegistry::new();
    registry.register(tool);
    AgentLoop::new(model, registry, "test instruction")
}

fn result_text(turn: &Turn) -> Option<String> {
    turn.outputs().next().and_then(|o| o.result_text()).map(str::to_string)
}

#[cfg(unix)]
#[tokio::test]
async fn test_landing_page_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Arc::new(CommandExecutor::new().with_working_dir(dir.path()));
    let model = ScriptedModel::new(vec![
        Ok(tool_call("mkdir Foo")),
        Ok(ModelReply::FinalText("Your site is ready.".to_string())),
    ]);
    let agent = AgentLoop::new(
        model.clone(),
        ToolRegistry::with_defaults(executor),
        system_instruction(Platform::detect()),
    );

    let run = agent.run("create a landing page named Foo").await.unwrap();

    assert!(dir.path().join("Foo").is_dir());
    assert_eq!(run.final_text, "Your site is ready.");
    assert_eq!(run.model_calls, 2);
    assert_eq!(run.tool_calls, 1);

    // Second model call saw goal, tool call and tool result
    let second = model.history_at(1);
    assert_eq!(second.len(), 3);
    assert_eq!(second[0].text().as_deref(), Some("create a landing page named Foo"));
    assert!(second[1].is_tool_call());
    let result = result_text(&second[2]).unwrap();
    assert!(result.starts_with("Success"));
    assert!(result.contains("Task Executed Successfully"));

    // History ends with exactly four turns
    let turns = run.history.turns();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[3].role, Role::Model);
    assert_eq!(turns[3].text().as_deref(), Some("Your site is ready."));

    assert_eq!(model.seen_tools.lock()[0], vec![EXECUTE_COMMAND.to_string()]);
}

#[tokio::test]
async fn test_final_text_terminates_without_dispatch() {
    let model = ScriptedModel::new(vec![Ok(ModelReply::FinalText("Nothing to do.".to_string()))]);
    let tool = CountingTool::new("unused");
    let agent = counting_loop(model.clone(), tool.clone());

    let run = agent.run("say hi").await.unwrap();

    assert_eq!(run.final_text, "Nothing to do.");
    assert_eq!(tool.calls(), 0);
    assert_eq!(model.calls(), 1);
    assert_eq!(run.history.len(), 2);
}

#[tokio::test]
async fn test_each_tool_call_gets_exactly_one_round() {
    let model = ScriptedModel::new(vec![
        Ok(tool_call("mkdir MySite")),
        Ok(tool_call("cd MySite && echo hi >> index.html")),
        Ok(ModelReply::FinalText("done".to_string())),
    ]);
    let tool = CountingTool::new("Success  || Task Executed Successfully");
    let agent = counting_loop(model.clone(), tool.clone());

    let run = agent.run("build it").await.unwrap();

    assert_eq!(tool.calls(), 2);
    assert_eq!(model.calls(), 3);
    // Every model call after the first sees one more call/result pair
    assert_eq!(model.history_at(0).len(), 1);
    assert_eq!(model.history_at(1).len(), 3);
    assert_eq!(model.history_at(2).len(), 5);

    let turns = run.history.turns();
    assert_eq!(turns.len(), 6);
    for pair in turns[1..5].chunks(2) {
        assert_eq!(pair[0].role, Role::Model);
        assert!(pair[0].is_tool_call());
        assert_eq!(pair[1].role, Role::User);
        assert!(pair[1].is_tool_result());
    }
}

#[tokio::test]
async fn test_unknown_tool_is_fatal() {
    let model = ScriptedModel::new(vec![Ok(ModelReply::ToolCall {
        name: "DeleteEverything".to_string(),
        arguments: json!({}),
    })]);
    let tool = CountingTool::new("unused");
    let agent = counting_loop(model.clone(), tool.clone());

    let mut history = ConversationHistory::new();
    let err = agent
        .run_with_history("create a landing page named Foo", &mut history)
        .await
        .unwrap_err();

    match err {
        AgentError::UnknownTool { tool_name } => assert_eq!(tool_name, "DeleteEverything"),
        other => panic!("expected unknown tool, got {:?}", other),
    }
    assert_eq!(tool.calls(), 0);
    assert_eq!(model.calls(), 1);
    // Goal and the invocation, but no result turn
    assert_eq!(history.len(), 2);
    assert!(history.turns().iter().all(|t| !t.is_tool_result()));
}

#[tokio::test]
async fn test_tool_errors_are_fed_back_as_text() {
    let model = ScriptedModel::new(vec![
        Ok(ModelReply::ToolCall {
            name: EXECUTE_COMMAND.to_string(),
            arguments: json!({ "cmd": "ls" }),
        }),
        Ok(ModelReply::FinalText("gave up".to_string())),
    ]);
    let agent = AgentLoop::new(
        model.clone(),
        ToolRegistry::with_defaults(Arc::new(CommandExecutor::new())),
        "",
    );

    let run = agent.run("list files").await.unwrap();

    assert_eq!(run.final_text, "gave up");
    let result = result_text(&model.history_at(1)[2]).unwrap();
    assert!(result.starts_with("Error"));
    assert!(result.contains("command"));
}

#[tokio::test]
async fn test_turn_limit_stops_endless_tool_calls() {
    let model = ScriptedModel::always(tool_call("echo again"));
    let tool = CountingTool::new("Success again");
    let agent = counting_loop(model.clone(), tool.clone()).with_max_turns(3);

    let mut history = ConversationHistory::new();
    let err = agent.run_with_history("loop forever", &mut history).await.unwrap_err();

    assert!(matches!(err, AgentError::TurnLimitReached { max_turns: 3 }));
    assert_eq!(model.calls(), 3);
    assert_eq!(tool.calls(), 3);
    assert_eq!(history.len(), 7);
}

#[tokio::test]
async fn test_zero_max_turns_means_unbounded() {
    let mut replies: Vec<Result<ModelReply>> = (0..60).map(|i| Ok(tool_call(&format!("step {}", i)))).collect();
    replies.push(Ok(ModelReply::FinalText("finally".to_string())));
    let model = ScriptedModel::new(replies);
    let tool = CountingTool::new("ok");
    let agent = counting_loop(model.clone(), tool.clone()).with_max_turns(0);

    assert_eq!(agent.max_turns(), None);
    let run = agent.run("long task").await.unwrap();

    assert_eq!(run.final_text, "finally");
    assert_eq!(tool.calls(), 60);
    assert_eq!(run.model_calls, 61);
}

#[tokio::test]
async fn test_model_errors_end_the_run() {
    let model = ScriptedModel::new(vec![Err(AgentError::RetriesExhausted { attempts: 3 })]);
    let tool = CountingTool::new("unused");
    let agent = counting_loop(model.clone(), tool.clone());

    let mut history = ConversationHistory::new();
    let err = agent.run_with_history("anything", &mut history).await.unwrap_err();

    assert!(matches!(err, AgentError::RetriesExhausted { attempts: 3 }));
    assert_eq!(history.len(), 1);
    assert_eq!(tool.calls(), 0);
}

#[tokio::test]
async fn test_each_tool_call_resolves_once_before_dispatch() {
    let model = ScriptedModel::new(vec![
        Ok(tool_call("mkdir A")),
        Ok(tool_call("mkdir B")),
        Ok(tool_call("mkdir C")),
        Ok(ModelReply::FinalText("done".to_string())),
    ]);
    let tool = CountingTool::new("ok");
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let agent = counting_loop(model, tool.clone())
        .with_event_callback(Arc::new(move |e: &AgentEvent| sink.lock().push(e.clone())));

    agent.run("three folders").await.unwrap();

    // ToolRequested fires once per successful registry resolution and
    // strictly alternates with the dispatch it leads to.
    let events = events.lock();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            AgentEvent::ToolRequested { .. } => "resolved",
            AgentEvent::ToolCompleted { .. } => "dispatched",
            AgentEvent::FinalAnswer(_) => "final",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["resolved", "dispatched", "resolved", "dispatched", "resolved", "dispatched", "final"]
    );
    assert_eq!(tool.calls(), 3);
}

#[tokio::test]
async fn test_events_follow_the_loop() {
    let model = ScriptedModel::new(vec![
        Ok(tool_call("mkdir Foo")),
        Ok(ModelReply::FinalText("ready".to_string())),
    ]);
    let tool = CountingTool::new("Success  || Task Executed Successfully");
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let agent = counting_loop(model, tool)
        .with_event_callback(Arc::new(move |e: &AgentEvent| sink.lock().push(e.clone())));

    agent.run("make Foo").await.unwrap();

    let events = events.lock();
    assert_eq!(
        *events,
        vec![
            AgentEvent::ToolRequested {
                name: EXECUTE_COMMAND.to_string(),
                arguments: json!({ "command": "mkdir Foo" }),
            },
            AgentEvent::ToolCompleted {
                name: EXECUTE_COMMAND.to_string(),
                result: "Success  || Task Executed Successfully".to_string(),
            },
            AgentEvent::FinalAnswer("ready".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_retention_shapes_only_the_outgoing_view() {
    let model = ScriptedModel::new(vec![
        Ok(tool_call("one")),
        Ok(tool_call("two")),
        Ok(ModelReply::FinalText("done".to_string())),
    ]);
    let tool = CountingTool::new("ok");
    let agent = counting_loop(model.clone(), tool).with_retention(Arc::new(KeepRecent { max_turns: 2 }));

    let run = agent.run("goal").await.unwrap();

    // The window never starts mid-exchange, so the goal is kept
    assert_eq!(model.history_at(2)[0].text().as_deref(), Some("goal"));
    assert_eq!(run.history.len(), 6);
}

#[tokio::test]
async fn test_each_run_starts_fresh() {
    let model = ScriptedModel::new(vec![
        Ok(ModelReply::FinalText("first".to_string())),
        Ok(ModelReply::FinalText("second".to_string())),
    ]);
    let agent = counting_loop(model.clone(), CountingTool::new("unused"));

    agent.run("goal one").await.unwrap();
    let run = agent.run("goal two").await.unwrap();

    assert_eq!(run.final_text, "second");
    assert_eq!(model.history_at(1).len(), 1);
    assert_eq!(model.history_at(1)[0].text().as_deref(), Some("goal two"));
}
