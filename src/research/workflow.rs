//! End-to-end research pipeline
//!
//! ```text
//! user messages
//!      │
//!      ▼
//! ┌──────────────┐   ┌───────────────────────────────┐   ┌──────────────┐
//! │ BriefWriter  │──▶│ Supervisor                    │──▶│ ReportWriter │──▶ ResearchOutcome
//! └──────────────┘   │  ├─ Researcher ─▶ Compressor  │   └──────────────┘
//!                    │  ├─ Researcher ─▶ Compressor  │
//!                    │  └─ ... (≤ K per turn)        │
//!                    └───────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use deep_research::{DeepResearcher, ResearchConfig};
//!
//! let config = ResearchConfig::from_env()?;
//! let researcher = DeepResearcher::builder()
//!     .llm(provider)
//!     .config(config)
//!     .build()?;
//!
//! let outcome = researcher.run("How do solid-state batteries compare to Li-ion?").await;
//! println!("{}", outcome.final_report);
//! ```

use std::sync::Arc;

use tracing::{info, instrument};

use super::brief::BriefWriter;
use super::report::ReportWriter;
use super::researcher::Researcher;
use super::state::ResearchOutcome;
use super::supervisor::Supervisor;
use crate::config::ResearchConfig;
use crate::error::DeepResearchError;
use crate::llm::LLMProvider;
use crate::state::Message;
use crate::tools::ToolRegistry;

/// Builder for [`DeepResearcher`]
#[derive(Default)]
pub struct DeepResearcherBuilder {
    llm: Option<Arc<dyn LLMProvider>>,
    summarizer: Option<Arc<dyn LLMProvider>>,
    tools: Option<ToolRegistry>,
    config: ResearchConfig,
}

impl DeepResearcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider serving every stage; use a [`crate::llm::ModelRouter`] to
    /// serve stages from different models
    pub fn llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Provider for page summarization in the default search tool
    pub fn summarizer(mut self, summarizer: Arc<dyn LLMProvider>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Tools for research units. Defaults to
    /// [`ToolRegistry::research_toolset`].
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn config(mut self, config: ResearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<DeepResearcher, DeepResearchError> {
        self.config.validate()?;

        let llm = self
            .llm
            .ok_or_else(|| DeepResearchError::Config("an LLM provider is required".to_string()))?;

        let tools = match self.tools {
            Some(tools) => tools,
            None => ToolRegistry::research_toolset(&self.config, self.summarizer)?,
        };

        let config = Arc::new(self.config);
        let researcher = Arc::new(Researcher::new(llm.clone(), Arc::new(tools), config.clone()));

        Ok(DeepResearcher {
            brief_writer: BriefWriter::new(
                llm.clone(),
                config.research_model.clone(),
                config.max_structured_output_retries,
            ),
            supervisor: Supervisor::new(llm.clone(), researcher, config.clone()),
            report_writer: ReportWriter::new(llm, config.final_report_model.clone()),
        })
    }
}

/// Brief → supervised research → final report
pub struct DeepResearcher {
    brief_writer: BriefWriter,
    supervisor: Supervisor,
    report_writer: ReportWriter,
}

impl DeepResearcher {
    pub fn builder() -> DeepResearcherBuilder {
        DeepResearcherBuilder::new()
    }

    /// Research a single question
    pub async fn run(&self, query: &str) -> ResearchOutcome {
        self.run_messages(&[Message::user(query)]).await
    }

    /// Research the request expressed by a conversation.
    ///
    /// Always returns an outcome; failures show up as `status: error` with a
    /// degraded report, never as a panic or `Err`.
    #[instrument(skip_all, fields(messages = messages.len()))]
    pub async fn run_messages(&self, messages: &[Message]) -> ResearchOutcome {
        let brief = self.brief_writer.write_brief(messages).await;
        info!(brief_len = brief.as_str().len(), "Research brief ready");

        let run = self.supervisor.run(brief).await;

        let report = self
            .report_writer
            .synthesize(&run.brief, messages, &run.findings)
            .await;

        let outcome = ResearchOutcome::from_run(run, report);
        info!(
            status = ?outcome.status,
            iterations = outcome.supervisor_iterations,
            searches = outcome.search_count,
            "Research finished"
        );
        outcome
    }
}
