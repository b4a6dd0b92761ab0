//! Error types
//!
//! Errors stay values inside the research pipeline: each stage boundary turns
//! them into degraded notes or reports, so `DeepResearchError` never reaches
//! the caller of [`crate::DeepResearcher::run`].

use std::time::Duration;
use thiserror::Error;

/// Tool layer errors
#[derive(Error, Debug, Clone)]
pub enum ToolError {
    #[error("Tool '{0}' not found")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution error: {0}")]
    Execution(String),
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum DeepResearchError {
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Structured output error: {0}")]
    StructuredOutput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Research unit timed out after {0:?}")]
    UnitTimeout(Duration),

    #[error("Research unit failed: {0}")]
    UnitFailure(String),

    #[error("Orchestration error: {0}")]
    Orchestration(String),

    #[error("Model provider panicked: {0}")]
    ProviderPanic(String),
}
