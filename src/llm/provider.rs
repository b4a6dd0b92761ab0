//! LLM Provider trait definition
//!
//! The only model-facing seam of the crate. Implementations bridge to a
//! concrete provider (see [`crate::compat::RigAgentAdapter`]); the research
//! stages only ever see this trait.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;

use super::config::{LLMConfig, TokenUsage};
use crate::error::DeepResearchError;
use crate::state::Message;
use crate::tools::ToolDefinition;

/// Completion response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// The assistant turn
    pub message: Message,
    pub usage: Option<TokenUsage>,
    /// Server-side web searches the provider ran while producing this turn.
    /// These never show up as tool calls, but still count as searches.
    pub native_search_calls: usize,
}

impl LLMResponse {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
            native_search_calls: 0,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_native_search_calls(mut self, count: usize) -> Self {
        self.native_search_calls = count;
        self
    }
}

/// Stateless model invocation.
///
/// `complete` receives the whole thread, the tools the model may call and
/// the configuration of the calling stage. Errors must keep the provider's
/// error text: the token-limit classifier matches on it.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, DeepResearchError>;

    /// Provider name for logging
    fn name(&self) -> &str;

    fn default_model(&self) -> &str;
}

/// [`LLMProvider::complete`] with a panic inside the provider returned as
/// [`DeepResearchError::ProviderPanic`] instead of unwinding into the caller
pub async fn complete_catching_panics(
    llm: &dyn LLMProvider,
    messages: &[Message],
    tools: &[ToolDefinition],
    config: Option<&LLMConfig>,
) -> Result<LLMResponse, DeepResearchError> {
    AssertUnwindSafe(llm.complete(messages, tools, config))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(DeepResearchError::ProviderPanic(panic_message(panic.as_ref()))))
}

/// Payload of a caught panic as text
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Role;

    struct EchoProvider;

    #[async_trait]
    impl LLMProvider for EchoProvider {
        async fn complete(
            &self,
            messages: &[Message],
            _tools: &[ToolDefinition],
            config: Option<&LLMConfig>,
        ) -> Result<LLMResponse, DeepResearchError> {
            let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
            let model = config.map(|c| c.model.as_str()).unwrap_or(self.default_model());
            Ok(LLMResponse::new(Message::assistant(&format!("{model}: {last}"))))
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn default_model(&self) -> &str {
            "echo-1"
        }
    }

    #[tokio::test]
    async fn test_complete_uses_call_config() {
        let provider = EchoProvider;
        let config = LLMConfig::new("openai:gpt-4.1");
        let response = provider
            .complete(&[Message::user("hello")], &[], Some(&config))
            .await
            .unwrap();

        assert_eq!(response.message.role, Role::Assistant);
        assert_eq!(response.message.content, "openai:gpt-4.1: hello");
        assert_eq!(response.native_search_calls, 0);
    }

    struct PanickingProvider;

    #[async_trait]
    impl LLMProvider for PanickingProvider {
        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _config: Option<&LLMConfig>,
        ) -> Result<LLMResponse, DeepResearchError> {
            panic!("decoder state corrupted");
        }

        fn name(&self) -> &str {
            "panicking"
        }

        fn default_model(&self) -> &str {
            "panicking-1"
        }
    }

    #[tokio::test]
    async fn test_panic_in_provider_becomes_error() {
        let err = complete_catching_panics(&PanickingProvider, &[Message::user("hi")], &[], None)
            .await
            .unwrap_err();

        assert!(matches!(err, DeepResearchError::ProviderPanic(ref cause) if cause == "decoder state corrupted"));
    }

    #[tokio::test]
    async fn test_catching_panics_passes_results_through() {
        let response = complete_catching_panics(&EchoProvider, &[Message::user("hello")], &[], None)
            .await
            .unwrap();
        assert_eq!(response.message.content, "echo-1: hello");
    }

    #[test]
    fn test_llm_response_builders() {
        let response = LLMResponse::new(Message::assistant("hi"))
            .with_usage(TokenUsage::new(10, 5))
            .with_native_search_calls(2);

        assert_eq!(response.usage, Some(TokenUsage::new(10, 5)));
        assert_eq!(response.native_search_calls, 2);
    }
}
