//! Test doubles shared by the research stage tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{DeepResearchError, ToolError};
use crate::llm::{LLMConfig, LLMProvider, LLMResponse};
use crate::state::{Message, ToolCall};
use crate::tools::{Tool, ToolContext, ToolDefinition, ToolKind};

/// A model call as the provider saw it
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
    pub model: Option<String>,
}

/// Replays a fixed script of responses in order, recording every call
#[derive(Default)]
pub(crate) struct ScriptedLLM {
    script: Mutex<VecDeque<Result<LLMResponse, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedLLM {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, content: &str) -> Self {
        self.respond(LLMResponse::new(Message::assistant(content)))
    }

    pub fn call_tools(self, calls: Vec<ToolCall>) -> Self {
        self.respond(LLMResponse::new(Message::assistant_with_tool_calls("", calls)))
    }

    pub fn respond(self, response: LLMResponse) -> Self {
        self.script.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Fail the next call with a provider error carrying `text`
    pub fn fail(self, text: &str) -> Self {
        self.script.lock().unwrap().push_back(Err(text.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedLLM {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, DeepResearchError> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
            model: config.map(|c| c.model.clone()),
        });

        match self.script.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(text)) => Err(DeepResearchError::LlmError(text)),
            None => Err(DeepResearchError::LlmError("script exhausted".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }
}

type Responder = dyn Fn(&[Message]) -> Result<LLMResponse, DeepResearchError> + Send + Sync;

/// Answers from a closure over the thread; deterministic under concurrency
pub(crate) struct FnLLM {
    respond: Box<Responder>,
    calls: AtomicUsize,
}

impl FnLLM {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&[Message]) -> Result<LLMResponse, DeepResearchError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for FnLLM {
    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
        _config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, DeepResearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(messages)
    }

    fn name(&self) -> &str {
        "fn"
    }

    fn default_model(&self) -> &str {
        "fn-model"
    }
}

/// Search-kind tool echoing its queries
#[derive(Default)]
pub(crate) struct EchoSearch {
    pub invocations: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for EchoSearch {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "web_search".to_string(),
            description: "test search".to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {"queries": {"type": "array"}}}),
        }
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Search
    }

    async fn execute(&self, args: serde_json::Value, _ctx: &ToolContext) -> Result<String, ToolError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(format!("results for {}", args["queries"]))
    }
}

/// Tool that always fails
pub(crate) struct BrokenTool;

#[async_trait]
impl Tool for BrokenTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "broken".to_string(),
            description: "always fails".to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    async fn execute(&self, _args: serde_json::Value, _ctx: &ToolContext) -> Result<String, ToolError> {
        Err(ToolError::Execution("upstream unavailable".to_string()))
    }
}

pub(crate) fn call(id: &str, name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall::new(id, name, args)
}

/// Topic of a research unit thread: its first user message
pub(crate) fn topic_of(messages: &[Message]) -> String {
    crate::state::user_contents(messages)
        .first()
        .map(|s| s.to_string())
        .unwrap_or_default()
}
