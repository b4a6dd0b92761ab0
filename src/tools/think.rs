//! `think_tool`: strategic reflection between searches
//!
//! No side effects. The reflection is echoed back so it stays in the
//! researcher's thread and in the raw notes handed to compression.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{Tool, ToolContext, ToolDefinition, ToolKind};
use crate::error::ToolError;

pub const THINK_TOOL: &str = "think_tool";

pub struct ThinkTool;

#[derive(Debug, Deserialize)]
struct ThinkArgs {
    reflection: String,
}

#[async_trait]
impl Tool for ThinkTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: THINK_TOOL.to_string(),
            description: "Tool for strategic reflection on research progress and decision-making. \
                Use after each search to analyze results and plan next steps: what key information \
                was found, what is still missing, whether there is enough to answer the question, \
                and whether to keep searching or provide an answer."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "reflection": {
                        "type": "string",
                        "description": "Your detailed reflection on research progress, findings, gaps, and next steps"
                    }
                },
                "required": ["reflection"],
                "additionalProperties": false
            }),
        }
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Reflection
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let args: ThinkArgs =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        debug!(
            tool_call_id = ctx.tool_call_id.as_deref().unwrap_or("-"),
            reflection_len = args.reflection.len(),
            "Reflection recorded"
        );

        Ok(format!("Reflection recorded: {}", args.reflection))
    }
}
