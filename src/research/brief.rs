//! Research brief writer
//!
//! Turns the user's messages into one detailed research question. The model
//! answers with `{"research_brief": "..."}`; malformed answers are retried
//! and, when every attempt fails, the last user message becomes the brief.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::prompts::ResearchPrompts;
use super::state::ResearchBrief;
use crate::error::DeepResearchError;
use crate::llm::{complete_catching_panics, LLMConfig, LLMProvider};
use crate::state::{user_contents, Message};
use crate::tools::parse_json_object;

#[derive(Debug, Deserialize)]
struct BriefAnswer {
    research_brief: String,
}

fn render_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone)]
pub struct BriefWriter {
    llm: Arc<dyn LLMProvider>,
    model: LLMConfig,
    max_attempts: usize,
}

impl BriefWriter {
    pub fn new(llm: Arc<dyn LLMProvider>, model: LLMConfig, max_attempts: usize) -> Self {
        Self {
            llm,
            model,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn write_brief(&self, messages: &[Message]) -> ResearchBrief {
        let prompt = ResearchPrompts::brief(&render_messages(messages));
        let request = [Message::user(&prompt)];

        for attempt in 1..=self.max_attempts {
            match self.attempt(&request).await {
                Ok(brief) => {
                    debug!(attempt, "Research brief written");
                    return ResearchBrief::new(brief);
                }
                Err(e) => warn!(attempt, error = %e, "Brief attempt failed"),
            }
        }

        let fallback = user_contents(messages).last().copied().unwrap_or_default();
        warn!("Falling back to the last user message as the research brief");
        ResearchBrief::new(fallback)
    }

    async fn attempt(&self, request: &[Message]) -> Result<String, DeepResearchError> {
        let response = complete_catching_panics(self.llm.as_ref(), request, &[], Some(&self.model)).await?;
        parse_json_object::<BriefAnswer>(&response.message.content)
            .map(|answer| answer.research_brief.trim().to_string())
            .filter(|brief| !brief.is_empty())
            .ok_or_else(|| {
                DeepResearchError::StructuredOutput("expected a JSON object with a non-empty research_brief".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::testing::ScriptedLLM;

    fn writer(llm: &Arc<ScriptedLLM>) -> BriefWriter {
        BriefWriter::new(llm.clone(), LLMConfig::new("openai:gpt-4.1"), 3)
    }

    #[tokio::test]
    async fn test_brief_parsed_from_json() {
        let llm = Arc::new(ScriptedLLM::new().reply(r#"{"research_brief": "I want a comparison of X and Y."}"#));
        let brief = writer(&llm).write_brief(&[Message::user("compare x and y")]).await;

        assert_eq!(brief.as_str(), "I want a comparison of X and Y.");
        assert!(llm.calls()[0].messages[0].content.contains("user: compare x and y"));
    }

    #[tokio::test]
    async fn test_malformed_answers_are_retried() {
        let llm = Arc::new(
            ScriptedLLM::new()
                .reply("Sure! Here is your brief.")
                .fail("timeout")
                .reply("```json\n{\"research_brief\": \"third time\"}\n```"),
        );
        let brief = writer(&llm).write_brief(&[Message::user("q")]).await;

        assert_eq!(brief.as_str(), "third time");
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_malformed_answer_is_structured_output_error() {
        let llm = Arc::new(ScriptedLLM::new().reply(r#"{"research_brief": "   "}"#));
        let err = writer(&llm).attempt(&[Message::user("q")]).await.unwrap_err();
        assert!(matches!(err, DeepResearchError::StructuredOutput(_)));
    }

    #[tokio::test]
    async fn test_panicking_provider_falls_back_to_last_user_message() {
        let llm = Arc::new(crate::research::testing::FnLLM::new(|_| panic!("brief model crashed")));
        let brief = BriefWriter::new(llm.clone(), LLMConfig::new("openai:gpt-4.1"), 2)
            .write_brief(&[Message::user("what changed in Rust 2024?")])
            .await;

        assert_eq!(brief.as_str(), "what changed in Rust 2024?");
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_falls_back_to_last_user_message() {
        let llm = Arc::new(ScriptedLLM::new().reply("nope").reply("{}").reply("still no"));
        let messages = [Message::user("first"), Message::assistant("?"), Message::user("the real question")];
        let brief = writer(&llm).write_brief(&messages).await;

        assert_eq!(brief.as_str(), "the real question");
        assert_eq!(llm.call_count(), 3);
    }
}
