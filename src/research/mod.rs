//! Research orchestration
//!
//! ```text
//! brief ──▶ supervisor ──ConductResearch×K──▶ researcher units ──▶ compression
//!              ▲                                                       │
//!              └──────────────── compressed notes ◀────────────────────┘
//!                        │
//!                        ▼
//!                 final report
//! ```
//!
//! Stages talk to models only through [`crate::llm::LLMProvider`] and to the
//! outside world only through [`crate::tools::ToolRegistry`].

pub mod brief;
pub mod compression;
pub mod prompts;
pub mod report;
pub mod researcher;
pub mod state;
pub mod supervisor;
pub mod token_limit;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use brief::BriefWriter;
pub use compression::Compressor;
pub use prompts::{PromptBuilder, ResearchPrompts};
pub use report::ReportWriter;
pub use researcher::{Researcher, StepOutcome};
pub use state::{
    CompressedNote, ExitReason, FinalReport, ResearchBrief, ResearchOutcome, ResearchStatus, ResearchUnit,
    SupervisorRun,
};
pub use supervisor::Supervisor;
pub use token_limit::{is_token_limit_error, is_token_limit_exceeded, model_token_limit, ModelFamily};
pub use workflow::{DeepResearcher, DeepResearcherBuilder};
