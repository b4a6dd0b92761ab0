//! Compression: researcher transcript → note
//!
//! ```text
//! attempt 1: [compression system, transcript..., instruction]
//!    │ token-limit error
//!    ▼
//! attempt 2: [compression system, prune(transcript)..., instruction]
//!    │ token-limit error
//!    ▼
//! attempt 3: [compression system, prune(prune(transcript))..., instruction]
//!    │ any failure
//!    ▼
//! degraded note
//! ```
//!
//! Compression never fails: every path ends in a [`CompressedNote`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::prompts::ResearchPrompts;
use super::state::CompressedNote;
use super::token_limit::is_token_limit_error;
use crate::llm::{LLMConfig, LLMProvider};
use crate::state::{join_tool_and_assistant_content, Message, Role};

pub const MAX_COMPRESSION_ATTEMPTS: usize = 3;

pub const COMPRESSION_FAILED: &str = "Error synthesizing research report: Maximum retries exceeded";

/// Keep everything before the last assistant message; that message and
/// whatever follows it (its tool results) are dropped.
///
/// Dropping whole trailing turns keeps every remaining tool call paired with
/// its result. A thread without assistant messages comes back unchanged.
pub fn prune_to_last_assistant(thread: &[Message]) -> Vec<Message> {
    match thread.iter().rposition(|m| m.role == Role::Assistant) {
        Some(idx) => thread[..idx].to_vec(),
        None => thread.to_vec(),
    }
}

/// Compresses research unit transcripts with the compression model
#[derive(Clone)]
pub struct Compressor {
    llm: Arc<dyn LLMProvider>,
    model: LLMConfig,
}

impl Compressor {
    pub fn new(llm: Arc<dyn LLMProvider>, model: LLMConfig) -> Self {
        Self { llm, model }
    }

    fn attempt_thread(transcript: &[Message]) -> Vec<Message> {
        let mut thread = Vec::with_capacity(transcript.len() + 2);
        thread.push(Message::system(&ResearchPrompts::compression_system()));
        thread.extend_from_slice(transcript);
        thread.push(Message::user(ResearchPrompts::compression_human()));
        thread
    }

    /// Compress a researcher thread into a note carrying `search_count`
    pub async fn compress(&self, thread: &[Message], search_count: usize) -> CompressedNote {
        let raw_notes = vec![join_tool_and_assistant_content(thread)];

        let start = thread.iter().take_while(|m| m.role == Role::System).count();
        let mut transcript = thread[start..].to_vec();

        for attempt in 1..=MAX_COMPRESSION_ATTEMPTS {
            let request = Self::attempt_thread(&transcript);
            debug!(attempt, messages = request.len(), "Compressing research transcript");

            match self.llm.complete(&request, &[], Some(&self.model)).await {
                Ok(response) => {
                    info!(attempt, search_count, "Research compressed");
                    return CompressedNote::new(response.message.content, raw_notes, search_count);
                }
                Err(e) if is_token_limit_error(&e, &self.model.model) => {
                    transcript = prune_to_last_assistant(&transcript);
                    warn!(
                        attempt,
                        remaining = transcript.len(),
                        "Compression hit the token limit, pruned transcript"
                    );
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Compression failed");
                    break;
                }
            }
        }

        CompressedNote::degraded(COMPRESSION_FAILED, raw_notes, search_count)
    }
}
