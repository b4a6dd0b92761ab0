//! Research unit worker
//!
//! ```text
//! Active ──step──▶ tool calls? ──no──▶ Compressing ──▶ Done
//!   ▲                 │yes
//!   │                 ▼
//!   └── under cap ◀─ ToolExecuting ── cap reached / ResearchComplete ──▶ Compressing
//! ```
//!
//! A unit owns its thread outright; nothing is shared with sibling units
//! except the read-only tool registry, provider and configuration.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use super::compression::Compressor;
use super::prompts::ResearchPrompts;
use super::state::{CompressedNote, ResearchUnit};
use crate::config::ResearchConfig;
use crate::error::DeepResearchError;
use crate::llm::LLMProvider;
use crate::state::{Message, ToolCall};
use crate::tools::{ToolContext, ToolRegistry, RESEARCH_COMPLETE};

/// What a unit does after a model turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Keep researching
    Continue,
    /// Go to compression
    Compress,
}

/// Runs research units: the bounded tool loop followed by compression
#[derive(Clone)]
pub struct Researcher {
    llm: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    config: Arc<ResearchConfig>,
    compressor: Compressor,
}

impl Researcher {
    pub fn new(llm: Arc<dyn LLMProvider>, tools: Arc<ToolRegistry>, config: Arc<ResearchConfig>) -> Self {
        let compressor = Compressor::new(llm.clone(), config.compression_model.clone());
        Self {
            llm,
            tools,
            config,
            compressor,
        }
    }

    /// Fresh unit for `topic`: researcher system prompt plus the topic
    pub fn start_unit(&self, topic: &str) -> ResearchUnit {
        ResearchUnit::new(
            topic,
            vec![Message::system(&ResearchPrompts::researcher()), Message::user(topic)],
        )
    }

    /// Research `topic` to completion.
    ///
    /// Only a failed model call in the tool loop is an error; compression
    /// always yields a note.
    #[instrument(skip(self), fields(topic_len = topic.len()))]
    pub async fn research(&self, topic: &str) -> Result<CompressedNote, DeepResearchError> {
        let mut unit = self.start_unit(topic);
        info!("Research unit started");

        while self.step(&mut unit).await? == StepOutcome::Continue {}

        let note = self.compressor.compress(&unit.thread, unit.search_count).await;
        info!(
            iterations = unit.tool_call_iterations,
            searches = unit.search_count,
            degraded = note.degraded,
            "Research unit finished"
        );
        Ok(note)
    }

    /// One model turn plus the tool calls it requested
    pub async fn step(&self, unit: &mut ResearchUnit) -> Result<StepOutcome, DeepResearchError> {
        let response = self
            .llm
            .complete(&unit.thread, &self.tools.definitions(), Some(&self.config.research_model))
            .await?;
        unit.tool_call_iterations += 1;
        unit.search_count += response.native_search_calls;

        let message = response.message;
        unit.thread.push(message.clone());

        if !message.has_tool_calls() && response.native_search_calls == 0 {
            debug!(iteration = unit.tool_call_iterations, "No tool calls, compressing");
            return Ok(StepOutcome::Compress);
        }

        let calls = message.calls();
        let results = self.execute_calls(calls, &unit.topic).await;
        unit.search_count += calls.iter().filter(|c| self.tools.is_search_tool(&c.name)).count();
        unit.thread.extend(results);

        if unit.tool_call_iterations >= self.config.max_react_tool_calls {
            debug!(iteration = unit.tool_call_iterations, "Tool call cap reached");
            return Ok(StepOutcome::Compress);
        }
        if message.calls_tool(RESEARCH_COMPLETE) {
            return Ok(StepOutcome::Compress);
        }
        Ok(StepOutcome::Continue)
    }

    /// Run every call concurrently; one result per call, in call order.
    async fn execute_calls(&self, calls: &[ToolCall], topic: &str) -> Vec<Message> {
        join_all(calls.iter().map(|call| async move {
            let ctx = ToolContext::new().with_tool_call_id(&call.id).with_topic(topic);
            let content = match self.tools.resolve(&call.name) {
                Ok(tool) => match tool.execute(call.arguments.clone(), &ctx).await {
                    Ok(output) => output,
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "Tool failed");
                        format!("Error executing tool '{}': {}", call.name, e)
                    }
                },
                Err(e) => {
                    warn!(tool = %call.name, "Unknown tool requested");
                    format!("Error: {e}")
                }
            };
            Message::tool_result(call, &content)
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMResponse, ModelRouter};
    use crate::research::testing::{call, BrokenTool, EchoSearch, ScriptedLLM};
    use crate::state::Role;
    use crate::tools::{ResearchCompleteTool, ThinkTool};
    use std::sync::atomic::Ordering;

    fn registry(search: EchoSearch) -> Arc<ToolRegistry> {
        Arc::new(
            ToolRegistry::new()
                .with_tool(Arc::new(search))
                .with_tool(Arc::new(ThinkTool))
                .with_tool(Arc::new(ResearchCompleteTool))
                .with_tool(Arc::new(BrokenTool)),
        )
    }

    /// Research and compression scripts served by separate providers
    fn researcher(research: Arc<ScriptedLLM>, compression: Arc<ScriptedLLM>, config: ResearchConfig) -> Researcher {
        let config = config.with_compression_model(crate::llm::LLMConfig::new("compress-model"));
        let router = ModelRouter::new()
            .route(config.research_model.model.clone(), research)
            .route("compress-model", compression);
        Researcher::new(Arc::new(router), registry(EchoSearch::default()), Arc::new(config))
    }

    #[tokio::test]
    async fn test_no_tool_calls_compresses_unmodified_thread() {
        let research = Arc::new(ScriptedLLM::new().reply("I already know this."));
        let compression = Arc::new(ScriptedLLM::new().reply("note"));
        let worker = researcher(research.clone(), compression.clone(), ResearchConfig::default());

        let note = worker.research("Rust editions").await.unwrap();

        assert_eq!(note.text, "note");
        assert_eq!(note.search_count, 0);
        assert_eq!(research.call_count(), 1);
        assert_eq!(compression.call_count(), 1);

        // system + topic + answer, wrapped by compression prompt and instruction
        let sent = &compression.calls()[0].messages;
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[1].content, "Rust editions");
        assert_eq!(sent[2].content, "I already know this.");
    }

    #[tokio::test]
    async fn test_tool_results_pair_with_calls_in_order() {
        let research = Arc::new(
            ScriptedLLM::new()
                .call_tools(vec![
                    call("a", "web_search", serde_json::json!({"queries": ["x"]})),
                    call("b", "nonexistent", serde_json::json!({})),
                    call("c", "broken", serde_json::json!({})),
                    call("d", "think_tool", serde_json::json!({"reflection": "ok"})),
                ])
                .reply("done"),
        );
        let compression = Arc::new(ScriptedLLM::new().reply("note"));
        let worker = researcher(research.clone(), compression, ResearchConfig::default());

        let mut unit = worker.start_unit("topic");
        assert_eq!(worker.step(&mut unit).await.unwrap(), StepOutcome::Continue);

        let results: Vec<&Message> = unit.thread.iter().filter(|m| m.role == Role::Tool).collect();
        let ids: Vec<&str> = results.iter().map(|m| m.tool_call_id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert!(results[0].content.contains("results for"));
        assert_eq!(results[1].content, "Error: Tool 'nonexistent' not found");
        assert!(results[2].content.contains("upstream unavailable"));
        assert_eq!(results[3].content, "Reflection recorded: ok");
        assert_eq!(unit.search_count, 1);
    }

    #[tokio::test]
    async fn test_cap_on_model_turns() {
        let mut research = ScriptedLLM::new();
        for i in 0..5 {
            research = research.call_tools(vec![call(&format!("s{i}"), "web_search", serde_json::json!({"queries": ["q"]}))]);
        }
        let research = Arc::new(research);
        let compression = Arc::new(ScriptedLLM::new().reply("note"));
        let config = ResearchConfig::default().with_max_react_tool_calls(3);
        let worker = researcher(research.clone(), compression, config);

        let note = worker.research("topic").await.unwrap();

        assert_eq!(research.call_count(), 3);
        assert_eq!(note.search_count, 3);
    }

    #[tokio::test]
    async fn test_research_complete_ends_loop() {
        let research = Arc::new(
            ScriptedLLM::new()
                .call_tools(vec![
                    call("s", "web_search", serde_json::json!({"queries": ["q"]})),
                    call("r", "ResearchComplete", serde_json::json!({})),
                ])
                .reply("unreachable"),
        );
        let compression = Arc::new(ScriptedLLM::new().reply("note"));
        let worker = researcher(research.clone(), compression, ResearchConfig::default());

        let note = worker.research("topic").await.unwrap();

        assert_eq!(research.call_count(), 1);
        assert_eq!(note.search_count, 1);
    }

    #[tokio::test]
    async fn test_native_search_counts_and_keeps_loop_alive() {
        let research = Arc::new(
            ScriptedLLM::new()
                .respond(LLMResponse::new(Message::assistant("searched natively")).with_native_search_calls(2))
                .reply("done"),
        );
        let compression = Arc::new(ScriptedLLM::new().reply("note"));
        let worker = researcher(research.clone(), compression, ResearchConfig::default());

        let note = worker.research("topic").await.unwrap();

        assert_eq!(research.call_count(), 2);
        assert_eq!(note.search_count, 2);
    }

    #[tokio::test]
    async fn test_model_failure_is_unit_error() {
        let research = Arc::new(ScriptedLLM::new().fail("service unavailable"));
        let compression = Arc::new(ScriptedLLM::new());
        let worker = researcher(research, compression.clone(), ResearchConfig::default());

        let err = worker.research("topic").await.unwrap_err();
        assert!(err.to_string().contains("service unavailable"));
        assert_eq!(compression.call_count(), 0);
    }

    #[tokio::test]
    async fn test_search_invocations_counted_per_call() {
        let search = EchoSearch::default();
        let invocations = search.invocations.clone();
        let research = Arc::new(
            ScriptedLLM::new()
                .call_tools(vec![
                    call("a", "web_search", serde_json::json!({"queries": ["1"]})),
                    call("b", "web_search", serde_json::json!({"queries": ["2"]})),
                ])
                .reply("done"),
        );
        let compression = Arc::new(ScriptedLLM::new().reply("note"));
        let config = ResearchConfig::default().with_compression_model(crate::llm::LLMConfig::new("compress-model"));
        let router = ModelRouter::new()
            .route(config.research_model.model.clone(), research)
            .route("compress-model", compression);
        let tools = Arc::new(ToolRegistry::new().with_tool(Arc::new(search)));
        let worker = Researcher::new(Arc::new(router), tools, Arc::new(config));

        let note = worker.research("topic").await.unwrap();

        assert_eq!(invocations.load(Ordering::SeqCst), 2);
        assert_eq!(note.search_count, 2);
    }
}
