//! deep-research: supervisor/researcher orchestration for deep research on Rig
//!
//! A supervisor model plans research on a brief and delegates topics to
//! parallel research units. Each unit runs a bounded search/reflect loop and
//! hands back a compressed note; the notes feed a single final report.
//!
//! - [`DeepResearcher`]: the whole pipeline, brief to report
//! - [`research::Supervisor`] / [`research::Researcher`]: the two agent loops
//! - [`LLMProvider`]: the model seam, with [`compat::RigAgentAdapter`] for rig-core agents
//! - [`ToolRegistry`]: tools available to research units (Tavily search, think, ResearchComplete)
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rig::client::{CompletionClient, ProviderClient};
//! use rig::providers::openai::Client;
//! use deep_research::{compat::RigAgentAdapter, DeepResearcher, ResearchConfig};
//!
//! let config = ResearchConfig::from_env()?;
//! let agent = Client::from_env().agent("gpt-4.1").build();
//! let llm = Arc::new(RigAgentAdapter::new(agent, "openai:gpt-4.1"));
//!
//! let outcome = DeepResearcher::builder().llm(llm).config(config).build()?.run("...").await;
//! ```

pub mod compat;
pub mod config;
pub mod error;
pub mod llm;
pub mod research;
pub mod state;
pub mod tools;

pub use config::ResearchConfig;
pub use error::{DeepResearchError, ToolError};
pub use llm::{LLMConfig, LLMProvider, LLMResponse, ModelRouter, TokenUsage};
pub use research::{DeepResearcher, DeepResearcherBuilder, ExitReason, ResearchOutcome, ResearchStatus};
pub use state::{Message, Role, ToolCall};
pub use tools::{DynTool, Tool, ToolContext, ToolDefinition, ToolKind, ToolRegistry};
