//! Research run data model
//!
//! Ownership follows the pipeline: the supervisor owns the [`SupervisorRun`],
//! each worker owns its [`ResearchUnit`], and unit results only reach the
//! run as [`CompressedNote`]s after the fan-in barrier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::Message;

/// The research question every stage works towards. Created once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchBrief {
    text: String,
}

impl ResearchBrief {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for ResearchBrief {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Why the supervisor loop stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "cause", rename_all = "snake_case")]
pub enum ExitReason {
    /// `max_researcher_iterations` decisions were made
    IterationLimit,
    /// The supervisor answered without calling a tool
    NoToolCalls,
    /// The supervisor called `ResearchComplete`
    ResearchComplete,
    /// A model call or the dispatch itself failed; notes gathered so far are kept
    Failure(String),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::IterationLimit => f.write_str("iteration limit reached"),
            ExitReason::NoToolCalls => f.write_str("no tool calls"),
            ExitReason::ResearchComplete => f.write_str("research complete"),
            ExitReason::Failure(cause) => write!(f, "failure: {cause}"),
        }
    }
}

/// State of the supervisor loop. Only the supervisor mutates it.
#[derive(Debug, Clone)]
pub struct SupervisorRun {
    pub brief: ResearchBrief,
    pub thread: Vec<Message>,
    /// Supervisor decisions made so far; never decreases
    pub iteration_count: usize,
    pub search_count: usize,
    /// Raw notes of every finished unit, in aggregation order
    pub notes: Vec<String>,
    /// Compressed note text of every finished unit, in aggregation order
    pub findings: Vec<String>,
    pub exit_reason: Option<ExitReason>,
}

impl SupervisorRun {
    pub fn new(brief: ResearchBrief, thread: Vec<Message>) -> Self {
        Self {
            brief,
            thread,
            iteration_count: 0,
            search_count: 0,
            notes: Vec::new(),
            findings: Vec::new(),
            exit_reason: None,
        }
    }

    /// Fold one unit's note into the run
    pub fn absorb(&mut self, note: &CompressedNote) {
        self.notes.extend(note.raw_notes.iter().cloned());
        self.findings.push(note.text.clone());
        self.search_count += note.search_count;
    }

    pub fn finish(&mut self, reason: ExitReason) {
        self.exit_reason = Some(reason);
    }
}

/// One delegated research task, owned by its worker
#[derive(Debug, Clone)]
pub struct ResearchUnit {
    pub topic: String,
    pub thread: Vec<Message>,
    /// Model turns taken so far
    pub tool_call_iterations: usize,
    pub search_count: usize,
}

impl ResearchUnit {
    pub fn new(topic: impl Into<String>, thread: Vec<Message>) -> Self {
        Self {
            topic: topic.into(),
            thread,
            tool_call_iterations: 0,
            search_count: 0,
        }
    }
}

/// Result of a research unit. Always produced, possibly degraded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedNote {
    pub text: String,
    /// Uncompressed tool and assistant output of the unit
    pub raw_notes: Vec<String>,
    pub search_count: usize,
    pub degraded: bool,
}

impl CompressedNote {
    pub fn new(text: impl Into<String>, raw_notes: Vec<String>, search_count: usize) -> Self {
        Self {
            text: text.into(),
            raw_notes,
            search_count,
            degraded: false,
        }
    }

    pub fn degraded(text: impl Into<String>, raw_notes: Vec<String>, search_count: usize) -> Self {
        Self {
            degraded: true,
            ..Self::new(text, raw_notes, search_count)
        }
    }
}

/// The synthesized answer. Produced exactly once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReport {
    pub text: String,
    pub degraded: bool,
}

impl FinalReport {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            degraded: false,
        }
    }

    pub fn degraded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            degraded: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchStatus {
    Success,
    Error,
}

/// What a caller gets back from a run. Never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchOutcome {
    pub final_report: String,
    pub notes: Vec<String>,
    pub research_brief: String,
    pub supervisor_iterations: usize,
    pub search_count: usize,
    pub status: ResearchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<ExitReason>,
}

impl ResearchOutcome {
    /// Assemble the outcome; the status is `Error` exactly when the report is degraded.
    pub fn from_run(run: SupervisorRun, report: FinalReport) -> Self {
        let (status, error) = if report.degraded {
            (ResearchStatus::Error, Some(report.text.clone()))
        } else {
            (ResearchStatus::Success, None)
        };

        Self {
            final_report: report.text,
            notes: run.notes,
            research_brief: run.brief.to_string(),
            supervisor_iterations: run.iteration_count,
            search_count: run.search_count,
            status,
            error,
            exit_reason: run.exit_reason,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResearchStatus::Success
    }
}
