//! Final report synthesis
//!
//! One model call over the brief and the gathered findings. On a token-limit
//! error the findings are cut down and the call retried: first to four
//! characters per token of the model's context window, then by a further
//! 10% each time. Every path returns a [`FinalReport`].

use std::sync::Arc;

use tracing::{info, warn};

use super::prompts::ResearchPrompts;
use super::state::{FinalReport, ResearchBrief};
use super::token_limit::{is_token_limit_error, model_token_limit};
use crate::llm::{complete_catching_panics, LLMConfig, LLMProvider};
use crate::state::{truncate_chars, user_contents, Message};

pub const MAX_REPORT_ATTEMPTS: usize = 3;

const CHARS_PER_TOKEN: u64 = 4;

/// Writes the final report with the final-report model
#[derive(Clone)]
pub struct ReportWriter {
    llm: Arc<dyn LLMProvider>,
    model: LLMConfig,
}

impl ReportWriter {
    pub fn new(llm: Arc<dyn LLMProvider>, model: LLMConfig) -> Self {
        Self { llm, model }
    }

    /// Synthesize the report for `brief` from `findings`.
    ///
    /// `messages` are the user's original messages, given to the model as
    /// context.
    pub async fn synthesize(&self, brief: &ResearchBrief, messages: &[Message], findings: &[String]) -> FinalReport {
        let findings = findings.join("\n");
        let conversation = user_contents(messages).join("\n");
        let mut limit: Option<usize> = None;

        for attempt in 1..=MAX_REPORT_ATTEMPTS {
            let visible = match limit {
                Some(max) => truncate_chars(&findings, max),
                None => findings.as_str(),
            };
            let prompt = ResearchPrompts::final_report(brief.as_str(), &conversation, visible);

            let request = [Message::user(&prompt)];
            match complete_catching_panics(self.llm.as_ref(), &request, &[], Some(&self.model)).await {
                Ok(response) => {
                    info!(attempt, findings_chars = visible.len(), "Final report generated");
                    return FinalReport::new(response.message.content);
                }
                Err(e) if is_token_limit_error(&e, &self.model.model) => {
                    let next = match limit {
                        None => match model_token_limit(&self.model.model) {
                            Some(tokens) => (tokens * CHARS_PER_TOKEN) as usize,
                            None => {
                                warn!(model = %self.model.model, "Token limit exceeded for a model with unknown context window");
                                return FinalReport::degraded(format!(
                                    "Error generating final report: Token limit exceeded, however the context \
                                     window of model '{}' is unknown. {}",
                                    self.model.model, e
                                ));
                            }
                        },
                        Some(previous) => previous * 9 / 10,
                    };
                    warn!(attempt, truncate_to = next, "Final report hit the token limit, truncating findings");
                    limit = Some(next);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Final report generation failed");
                    return FinalReport::degraded(format!("Error generating final report: {e}"));
                }
            }
        }

        FinalReport::degraded("Error generating final report: Maximum retries exceeded")
    }
}
