//! `LLMProvider` over a rig agent
//!
//! The research loops own tool execution, so the adapter only asks rig for a
//! single completion: tool definitions are forwarded so the model can request
//! calls, and the calls come back as [`ToolCall`]s on the assistant message.
//!
//! System messages are folded into the agent preamble. Provider errors are
//! passed through as [`DeepResearchError::LlmError`] with their original text
//! so that token-limit errors can still be recognised downstream.

use std::sync::Arc;

use async_trait::async_trait;
use rig::agent::Agent;
use rig::completion::{Completion, CompletionModel, Message as RigMessage, ToolDefinition as RigToolDefinition};
use rig::message::{AssistantContent, ToolCall as RigToolCall};
use rig::OneOrMany;
use tracing::debug;
use uuid::Uuid;

use crate::error::DeepResearchError;
use crate::llm::{LLMConfig, LLMProvider, LLMResponse, TokenUsage};
use crate::state::{Message, Role, ToolCall};
use crate::tools::ToolDefinition;

/// Wraps a rig `Agent<M>` bound to one model
pub struct RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    agent: Arc<Agent<M>>,
    model_id: String,
}

impl<M> RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    /// `model_id` is the id this agent serves, as used in [`LLMConfig::model`]
    pub fn new(agent: Agent<M>, model_id: impl Into<String>) -> Self {
        Self {
            agent: Arc::new(agent),
            model_id: model_id.into(),
        }
    }

    pub fn agent(&self) -> &Agent<M> {
        &self.agent
    }

    fn preamble(&self, system: Option<String>) -> Option<String> {
        match (self.agent.preamble.as_deref(), system) {
            (Some(base), Some(extra)) => Some(format!("{base}\n\n{extra}")),
            (None, Some(extra)) => Some(extra),
            _ => None,
        }
    }
}

fn llm_error(e: impl std::fmt::Display) -> DeepResearchError {
    DeepResearchError::LlmError(e.to_string())
}

#[async_trait]
impl<M> LLMProvider for RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, DeepResearchError> {
        let request = RigRequest::from_thread(messages)?;
        let mut builder = self
            .agent
            .completion(request.prompt, request.history)
            .await
            .map_err(llm_error)?;

        if let Some(preamble) = self.preamble(request.system) {
            builder = builder.preamble(preamble);
        }
        if let Some(cfg) = config {
            if let Some(temperature) = cfg.temperature {
                builder = builder.temperature(temperature);
            }
            if let Some(max_tokens) = cfg.max_tokens {
                builder = builder.max_tokens(max_tokens);
            }
        }
        if !tools.is_empty() {
            builder = builder.tools(tools.iter().map(rig_tool_definition).collect());
        }

        let response = builder.send().await.map_err(llm_error)?;
        let message = assistant_message(&response.choice);
        let usage = TokenUsage::from_rig_usage(&response.usage);
        debug!(
            model = %self.model_id,
            tool_calls = message.calls().len(),
            tokens = usage.total_tokens,
            "Rig completion"
        );

        let mut result = LLMResponse::new(message);
        if usage.total_tokens > 0 {
            result = result.with_usage(usage);
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "rig"
    }

    fn default_model(&self) -> &str {
        &self.model_id
    }
}

impl<M> std::fmt::Debug for RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigAgentAdapter").field("model_id", &self.model_id).finish()
    }
}

/// A thread split the way rig wants it: preamble, history and final prompt
struct RigRequest {
    system: Option<String>,
    history: Vec<RigMessage>,
    prompt: RigMessage,
}

impl RigRequest {
    fn from_thread(messages: &[Message]) -> Result<Self, DeepResearchError> {
        let mut system = Vec::new();
        let mut history = Vec::with_capacity(messages.len());

        for message in messages {
            match message.role {
                Role::System if !message.content.trim().is_empty() => system.push(message.content.as_str()),
                Role::System => {}
                Role::User => history.push(RigMessage::user(message.content.clone())),
                Role::Assistant => history.push(rig_assistant(message)),
                Role::Tool => history.push(RigMessage::tool_result(
                    message.tool_call_id.clone().unwrap_or_default(),
                    message.content.clone(),
                )),
            }
        }

        let prompt = history
            .pop()
            .ok_or_else(|| DeepResearchError::Conversion("thread has no user, assistant or tool message".into()))?;

        Ok(Self {
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            history,
            prompt,
        })
    }
}

fn rig_assistant(message: &Message) -> RigMessage {
    let mut parts = Vec::new();
    if !message.content.is_empty() {
        parts.push(AssistantContent::text(message.content.clone()));
    }
    for call in message.calls() {
        parts.push(AssistantContent::tool_call(
            call.id.clone(),
            call.name.clone(),
            call.arguments.clone(),
        ));
    }

    let content = OneOrMany::many(parts).unwrap_or_else(|_| OneOrMany::one(AssistantContent::text("")));
    RigMessage::Assistant { id: None, content }
}

fn rig_tool_definition(tool: &ToolDefinition) -> RigToolDefinition {
    RigToolDefinition {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: tool.parameters.clone(),
    }
}

fn assistant_message(choice: &OneOrMany<AssistantContent>) -> Message {
    let mut text = String::new();
    let mut calls = Vec::new();

    for item in choice.iter() {
        match item {
            AssistantContent::Text(t) => text.push_str(&t.text),
            AssistantContent::ToolCall(call) => calls.push(tool_call(call)),
            _ => {}
        }
    }

    if calls.is_empty() {
        Message::assistant(&text)
    } else {
        Message::assistant_with_tool_calls(&text, calls)
    }
}

/// Tool results are paired with calls by id, so every call needs one
fn tool_call(call: &RigToolCall) -> ToolCall {
    let id = if call.id.is_empty() {
        format!("call_{}", Uuid::new_v4().simple())
    } else {
        call.id.clone()
    };
    ToolCall::new(id, call.function.name.clone(), call.function.arguments.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig::message::UserContent;

    fn text_of(message: &RigMessage) -> Option<String> {
        match message {
            RigMessage::User { content } => content.iter().find_map(|c| match c {
                UserContent::Text(t) => Some(t.text.clone()),
                _ => None,
            }),
            RigMessage::Assistant { content, .. } => content.iter().find_map(|c| match c {
                AssistantContent::Text(t) => Some(t.text.clone()),
                _ => None,
            }),
        }
    }

    #[test]
    fn test_request_splits_system_history_and_prompt() {
        let thread = vec![
            Message::system("You are a researcher."),
            Message::user("topic"),
            Message::assistant("thinking"),
            Message::user("go on"),
        ];

        let request = RigRequest::from_thread(&thread).unwrap();

        assert_eq!(request.system.as_deref(), Some("You are a researcher."));
        assert_eq!(request.history.len(), 2);
        assert_eq!(text_of(&request.history[0]).as_deref(), Some("topic"));
        assert_eq!(text_of(&request.prompt).as_deref(), Some("go on"));
    }

    #[test]
    fn test_request_ends_with_tool_result() {
        let call = ToolCall::new("c1", "think_tool", serde_json::json!({"reflection": "x"}));
        let thread = vec![
            Message::user("topic"),
            Message::assistant_with_tool_calls("", vec![call.clone()]),
            Message::tool_result(&call, "Reflection recorded: x"),
        ];

        let request = RigRequest::from_thread(&thread).unwrap();

        assert!(request.system.is_none());
        assert_eq!(request.history.len(), 2);
        assert!(matches!(request.prompt, RigMessage::User { .. }));
    }

    #[test]
    fn test_system_only_thread_is_rejected() {
        let err = RigRequest::from_thread(&[Message::system("rules")]).err().unwrap();
        assert!(matches!(err, DeepResearchError::Conversion(_)));
    }

    #[test]
    fn test_assistant_message_collects_calls() {
        let choice = OneOrMany::many(vec![
            AssistantContent::text("Let me search. "),
            AssistantContent::tool_call("call_1", "tavily_search", serde_json::json!({"queries": ["rust"]})),
            AssistantContent::tool_call("", "think_tool", serde_json::json!({"reflection": "hm"})),
        ])
        .unwrap();

        let message = assistant_message(&choice);

        assert_eq!(message.content, "Let me search. ");
        let calls = message.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "tavily_search");
        assert!(calls[1].id.starts_with("call_"));
        assert!(calls[1].id.len() > "call_".len());
    }

    #[test]
    fn test_text_only_choice_has_no_calls() {
        let message = assistant_message(&OneOrMany::one(AssistantContent::text("done")));
        assert_eq!(message.role, Role::Assistant);
        assert!(!message.has_tool_calls());
    }
}
