//! Research supervisor
//!
//! ```text
//! Deciding ──▶ exit? ──yes──▶ Done
//!    ▲           │no
//!    │           ▼
//!    │      Dispatching (≤ K units on a JoinSet, overflow rejected)
//!    │           │ join all
//!    │           ▼
//!    └──── Aggregating (one result per call, call order)
//! ```
//!
//! Units are isolated: a failing, panicking or timed-out unit becomes a
//! degraded note for its own call and never affects its siblings.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::prompts::ResearchPrompts;
use super::researcher::Researcher;
use super::state::{CompressedNote, ExitReason, ResearchBrief, SupervisorRun};
use crate::config::ResearchConfig;
use crate::error::DeepResearchError;
use crate::llm::{complete_catching_panics, panic_message, LLMProvider};
use crate::state::{Message, ToolCall};
use crate::tools::{
    conduct_research_definition, ConductResearchArgs, ResearchCompleteTool, ThinkTool, Tool, ToolContext,
    ToolDefinition, CONDUCT_RESEARCH, RESEARCH_COMPLETE, THINK_TOOL,
};

/// Result text for a `ConductResearch` call beyond the concurrency cap
pub fn overflow_rejection(cap: usize) -> String {
    format!(
        "Error: Did not run this research as you have already exceeded the maximum number of \
         concurrent research units. Please try again with {cap} or fewer research units."
    )
}

/// How one call of a supervisor turn gets its result
#[derive(Debug)]
enum Planned {
    /// Admitted research unit; index into the dispatched topics
    Unit(usize),
    /// Result known without running a unit
    Immediate(String),
}

/// Decides, dispatches and aggregates until an exit criterion is met
pub struct Supervisor {
    llm: Arc<dyn LLMProvider>,
    researcher: Arc<Researcher>,
    config: Arc<ResearchConfig>,
}

impl Supervisor {
    pub fn new(llm: Arc<dyn LLMProvider>, researcher: Arc<Researcher>, config: Arc<ResearchConfig>) -> Self {
        Self {
            llm,
            researcher,
            config,
        }
    }

    fn tool_definitions() -> Vec<ToolDefinition> {
        vec![
            conduct_research_definition(),
            ResearchCompleteTool.definition(),
            ThinkTool.definition(),
        ]
    }

    pub fn start_run(&self, brief: ResearchBrief) -> SupervisorRun {
        let thread = vec![
            Message::system(&ResearchPrompts::supervisor(
                self.config.max_concurrent_research_units,
                self.config.max_researcher_iterations,
            )),
            Message::user(brief.as_str()),
        ];
        SupervisorRun::new(brief, thread)
    }

    /// Supervise research on `brief` until an exit criterion holds.
    ///
    /// Never fails: model or dispatch failures end the run with
    /// [`ExitReason::Failure`] and the notes gathered so far.
    #[instrument(skip_all)]
    pub async fn run(&self, brief: ResearchBrief) -> SupervisorRun {
        let mut run = self.start_run(brief);

        loop {
            let turn = match self.decide(&mut run).await {
                Ok(turn) => turn,
                Err(e) => {
                    warn!(error = %e, iteration = run.iteration_count, "Supervisor decision failed");
                    run.finish(ExitReason::Failure(e.to_string()));
                    break;
                }
            };

            if let Some(reason) = self.exit_reason(&run, &turn) {
                info!(iteration = run.iteration_count, %reason, "Supervisor finished");
                run.finish(reason);
                break;
            }

            if let Err(e) = self.dispatch_and_aggregate(&mut run, turn.calls()).await {
                warn!(error = %e, "Dispatch failed, ending run with partial notes");
                run.finish(ExitReason::Failure(e.to_string()));
                break;
            }
        }

        run
    }

    /// One supervisor model call; the turn is appended to the run thread
    pub async fn decide(&self, run: &mut SupervisorRun) -> Result<Message, DeepResearchError> {
        let response = complete_catching_panics(
            self.llm.as_ref(),
            &run.thread,
            &Self::tool_definitions(),
            Some(&self.config.supervisor_model),
        )
        .await?;
        run.iteration_count += 1;
        run.thread.push(response.message.clone());
        debug!(
            iteration = run.iteration_count,
            tool_calls = response.message.calls().len(),
            "Supervisor decided"
        );
        Ok(response.message)
    }

    /// Exit criteria in precedence order
    pub fn exit_reason(&self, run: &SupervisorRun, turn: &Message) -> Option<ExitReason> {
        if run.iteration_count >= self.config.max_researcher_iterations {
            Some(ExitReason::IterationLimit)
        } else if !turn.has_tool_calls() {
            Some(ExitReason::NoToolCalls)
        } else if turn.calls_tool(RESEARCH_COMPLETE) {
            Some(ExitReason::ResearchComplete)
        } else {
            None
        }
    }

    async fn dispatch_and_aggregate(
        &self,
        run: &mut SupervisorRun,
        calls: &[ToolCall],
    ) -> Result<(), DeepResearchError> {
        let (plan, topics) = self.plan(calls).await;
        let mut notes = self.fan_out(topics).await;

        for (call, planned) in calls.iter().zip(plan) {
            let content = match planned {
                Planned::Unit(idx) => {
                    let note = notes.get_mut(idx).and_then(Option::take).ok_or_else(|| {
                        DeepResearchError::Orchestration(format!("no result for research unit {idx}"))
                    })?;
                    run.absorb(&note);
                    note.text
                }
                Planned::Immediate(text) => text,
            };
            run.thread.push(Message::tool_result(call, &content));
        }

        debug!(
            notes = run.notes.len(),
            search_count = run.search_count,
            "Aggregated research units"
        );
        Ok(())
    }

    /// Admit up to the cap, answer everything else inline
    async fn plan(&self, calls: &[ToolCall]) -> (Vec<Planned>, Vec<String>) {
        let cap = self.config.max_concurrent_research_units;
        let mut plan = Vec::with_capacity(calls.len());
        let mut topics = Vec::new();
        let mut admitted = 0usize;

        for call in calls {
            let planned = match call.name.as_str() {
                CONDUCT_RESEARCH if admitted < cap => {
                    admitted += 1;
                    match ConductResearchArgs::parse(&call.arguments) {
                        Ok(args) => {
                            topics.push(args.research_topic);
                            Planned::Unit(topics.len() - 1)
                        }
                        Err(e) => Planned::Immediate(format!("Error: {e}")),
                    }
                }
                CONDUCT_RESEARCH => {
                    warn!(cap, call_id = %call.id, "Research unit rejected, over the concurrency cap");
                    Planned::Immediate(overflow_rejection(cap))
                }
                THINK_TOOL => {
                    let ctx = ToolContext::new().with_tool_call_id(&call.id);
                    match ThinkTool.execute(call.arguments.clone(), &ctx).await {
                        Ok(ack) => Planned::Immediate(ack),
                        Err(e) => Planned::Immediate(format!("Error executing tool '{THINK_TOOL}': {e}")),
                    }
                }
                other => Planned::Immediate(format!(
                    "Error: {}",
                    crate::error::ToolError::NotFound(other.to_string())
                )),
            };
            plan.push(planned);
        }

        info!(requested = calls.len(), admitted = topics.len(), "Planned supervisor turn");
        (plan, topics)
    }

    /// Run every topic as its own task and wait for all of them.
    ///
    /// The returned vector is indexed like `topics`; every slot is filled.
    async fn fan_out(&self, topics: Vec<String>) -> Vec<Option<CompressedNote>> {
        let mut notes: Vec<Option<CompressedNote>> = vec![None; topics.len()];
        let mut set = JoinSet::new();

        for (idx, topic) in topics.into_iter().enumerate() {
            let researcher = self.researcher.clone();
            let unit_timeout = self.config.unit_timeout;
            set.spawn(async move {
                let unit = AssertUnwindSafe(run_unit(researcher, topic, unit_timeout)).catch_unwind();
                let note = match unit.await {
                    Ok(Ok(note)) => note,
                    Ok(Err(e)) => {
                        warn!(unit = idx, error = %e, "Research unit failed");
                        degraded_note(&e)
                    }
                    Err(panic) => {
                        let cause = panic_message(panic.as_ref());
                        warn!(unit = idx, cause = %cause, "Research unit panicked");
                        degraded_note(&DeepResearchError::UnitFailure(format!("panicked: {cause}")))
                    }
                };
                (idx, note)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, note)) => notes[idx] = Some(note),
                Err(e) => warn!(error = %e, "Research unit task did not complete"),
            }
        }

        for slot in notes.iter_mut().filter(|n| n.is_none()) {
            *slot = Some(degraded_note(&DeepResearchError::UnitFailure(
                "task cancelled before completion".to_string(),
            )));
        }
        notes
    }
}

async fn run_unit(
    researcher: Arc<Researcher>,
    topic: String,
    unit_timeout: Option<Duration>,
) -> Result<CompressedNote, DeepResearchError> {
    match unit_timeout {
        Some(limit) => tokio::time::timeout(limit, researcher.research(&topic))
            .await
            .map_err(|_| DeepResearchError::UnitTimeout(limit))?,
        None => researcher.research(&topic).await,
    }
}

fn degraded_note(error: &DeepResearchError) -> CompressedNote {
    CompressedNote::degraded(format!("Error: {error}"), Vec::new(), 0)
}
