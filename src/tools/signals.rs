//! Control-flow tools: `ConductResearch` and `ResearchComplete`
//!
//! Neither does work of its own. `ConductResearch` is intercepted by the
//! supervisor and turned into a research unit; `ResearchComplete` ends the
//! loop that calls it.

use async_trait::async_trait;
use serde::Deserialize;

use super::{Tool, ToolContext, ToolDefinition, ToolKind};
use crate::error::ToolError;

pub const CONDUCT_RESEARCH: &str = "ConductResearch";
pub const RESEARCH_COMPLETE: &str = "ResearchComplete";

/// Arguments of a `ConductResearch` call
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConductResearchArgs {
    pub research_topic: String,
}

impl ConductResearchArgs {
    pub fn parse(args: &serde_json::Value) -> Result<Self, ToolError> {
        let parsed: Self = serde_json::from_value(args.clone())
            .map_err(|e| ToolError::InvalidArguments(format!("{CONDUCT_RESEARCH}: {e}")))?;
        if parsed.research_topic.trim().is_empty() {
            return Err(ToolError::InvalidArguments(format!(
                "{CONDUCT_RESEARCH}: research_topic must not be empty"
            )));
        }
        Ok(parsed)
    }
}

/// Schema of the supervisor's delegation tool
pub fn conduct_research_definition() -> ToolDefinition {
    ToolDefinition {
        name: CONDUCT_RESEARCH.to_string(),
        description: "Call this tool to conduct research on a specific topic. \
            A dedicated researcher works on the topic and returns its findings."
            .to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "research_topic": {
                    "type": "string",
                    "description": "The topic to research. Should be a single topic, described in high detail (at least a paragraph)."
                }
            },
            "required": ["research_topic"],
            "additionalProperties": false
        }),
    }
}

/// Completion signal shared by researchers and the supervisor
pub struct ResearchCompleteTool;

#[async_trait]
impl Tool for ResearchCompleteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: RESEARCH_COMPLETE.to_string(),
            description: "Call this tool to indicate that the research is complete.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }

    fn kind(&self) -> ToolKind {
        ToolKind::CompletionSignal
    }

    async fn execute(&self, _args: serde_json::Value, _ctx: &ToolContext) -> Result<String, ToolError> {
        Ok("Research marked as complete.".to_string())
    }
}
