//! Tool registry and research tools
//!
//! ## Tools
//! - `tavily_search`: web search with optional page summarization (search kind)
//! - `think_tool`: explicit reflection, no side effects
//! - `ResearchComplete`: completion signal for researchers and the supervisor
//! - `ConductResearch`: supervisor-only delegation signal (definition only,
//!   the supervisor dispatches it itself)

mod signals;
mod tavily;
mod think;

pub use signals::{conduct_research_definition, ConductResearchArgs, ResearchCompleteTool, CONDUCT_RESEARCH, RESEARCH_COMPLETE};
pub use tavily::{SearchTopic, TavilyError, TavilySearchTool, WebpageSummarizer};
pub use think::{ThinkTool, THINK_TOOL};
pub(crate) use tavily::parse_json_object;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::ResearchConfig;
use crate::error::{DeepResearchError, ToolError};
use crate::llm::LLMProvider;

/// Tool schema handed to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// What a tool is, as far as the research loop cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Web search; every invocation counts toward the unit's search count
    Search,
    /// Reflection with no side effects
    Reflection,
    /// Signals that research is finished
    CompletionSignal,
    /// Any other callable tool; runs normally but never counts as a search
    Function,
}

/// Context of a single tool invocation
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub tool_call_id: Option<String>,
    /// Research topic of the unit issuing the call, if any
    pub topic: Option<String>,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool_call_id(mut self, id: &str) -> Self {
        self.tool_call_id = Some(id.to_string());
        self
    }

    pub fn with_topic(mut self, topic: &str) -> Self {
        self.topic = Some(topic.to_string());
        self
    }
}

/// Tool interface: `invoke(args) -> text`
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    fn kind(&self) -> ToolKind {
        ToolKind::Function
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError>;
}

pub type DynTool = Arc<dyn Tool>;

/// Name → tool map, built once per run and shared read-only by every unit.
///
/// Definitions are returned in registration order so prompts stay stable.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<DynTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a later tool with the same name replaces the earlier one
    pub fn register(&mut self, tool: DynTool) {
        let name = tool.definition().name;
        match self.index.get(&name) {
            Some(&slot) => self.tools[slot] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn register_all(&mut self, tools: Vec<DynTool>) {
        for tool in tools {
            self.register(tool);
        }
    }

    pub fn with_tool(mut self, tool: DynTool) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&DynTool> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }

    /// Resolve a tool by name; unknown names are a typed error, not a panic.
    pub fn resolve(&self, name: &str) -> Result<&DynTool, ToolError> {
        self.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Kind of the named tool, `None` when unknown
    pub fn kind_of(&self, name: &str) -> Option<ToolKind> {
        self.get(name).map(|t| t.kind())
    }

    pub fn is_search_tool(&self, name: &str) -> bool {
        self.kind_of(name) == Some(ToolKind::Search)
    }

    pub fn has_search_tool(&self) -> bool {
        self.tools.iter().any(|t| t.kind() == ToolKind::Search)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.definition().name).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tools bound to every research unit: Tavily search, `think_tool` and
    /// `ResearchComplete`.
    ///
    /// Fails when no Tavily key is configured: a research unit without a
    /// search tool cannot do its job.
    pub fn research_toolset(
        config: &ResearchConfig,
        summarizer: Option<Arc<dyn LLMProvider>>,
    ) -> Result<Self, DeepResearchError> {
        let api_key = config.tavily_api_key.clone().ok_or_else(|| {
            DeepResearchError::Config("TAVILY_API_KEY is required for the research toolset".to_string())
        })?;

        let mut search = TavilySearchTool::new(api_key).with_max_results(config.search_max_results);
        if let Some(provider) = summarizer {
            search = search.with_summarizer(WebpageSummarizer::new(
                provider,
                config.summarization_model.clone(),
                config.max_content_length,
                config.summarization_timeout,
            ));
        }

        let registry = Self::new()
            .with_tool(Arc::new(search))
            .with_tool(Arc::new(ThinkTool))
            .with_tool(Arc::new(ResearchCompleteTool));

        debug!(tools = ?registry.names(), "Built research toolset");
        Ok(registry)
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTool {
        name: &'static str,
        kind: ToolKind,
    }

    #[async_trait]
    impl Tool for FixedTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.name.to_string(),
                description: "fixed".to_string(),
                parameters: serde_json::json!({"type": "object", "properties": {}}),
            }
        }

        fn kind(&self) -> ToolKind {
            self.kind
        }

        async fn execute(&self, _args: serde_json::Value, _ctx: &ToolContext) -> Result<String, ToolError> {
            Ok(self.name.to_string())
        }
    }

    #[test]
    fn test_registry_keeps_registration_order() {
        let registry = ToolRegistry::new()
            .with_tool(Arc::new(FixedTool { name: "b_search", kind: ToolKind::Search }))
            .with_tool(Arc::new(FixedTool { name: "a_think", kind: ToolKind::Reflection }));

        assert_eq!(registry.names(), vec!["b_search", "a_think"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_replaces_same_name() {
        let registry = ToolRegistry::new()
            .with_tool(Arc::new(FixedTool { name: "x", kind: ToolKind::Function }))
            .with_tool(Arc::new(FixedTool { name: "x", kind: ToolKind::Search }));

        assert_eq!(registry.len(), 1);
        assert!(registry.is_search_tool("x"));
    }

    #[test]
    fn test_function_tools_are_not_searches() {
        let registry = ToolRegistry::new().with_tool(Arc::new(FixedTool { name: "lookup", kind: ToolKind::Function }));

        assert_eq!(registry.kind_of("lookup"), Some(ToolKind::Function));
        assert!(!registry.is_search_tool("lookup"));
        assert!(!registry.has_search_tool());
    }

    #[test]
    fn test_resolve_unknown_tool_is_typed_error() {
        let registry = ToolRegistry::new();
        let err = registry.resolve("missing").err().unwrap();
        assert!(matches!(err, ToolError::NotFound(ref name) if name == "missing"));
        assert_eq!(registry.kind_of("missing"), None);
    }

    #[test]
    fn test_research_toolset_requires_tavily_key() {
        let config = ResearchConfig::default();
        let err = ToolRegistry::research_toolset(&config, None).unwrap_err();
        assert!(matches!(err, DeepResearchError::Config(_)));
    }

    #[test]
    fn test_research_toolset_contents() {
        let config = ResearchConfig::default().with_tavily_api_key("tvly-test");
        let registry = ToolRegistry::research_toolset(&config, None).unwrap();

        assert!(registry.has_search_tool());
        assert!(registry.is_search_tool("tavily_search"));
        assert_eq!(registry.kind_of(THINK_TOOL), Some(ToolKind::Reflection));
        assert_eq!(registry.kind_of(RESEARCH_COMPLETE), Some(ToolKind::CompletionSignal));
        assert!(!registry.contains(CONDUCT_RESEARCH));
    }
}
