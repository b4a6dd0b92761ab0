//! Per-call model configuration and token usage

use serde::{Deserialize, Serialize};

use crate::research::token_limit::{model_token_limit, ModelFamily};

/// Token usage statistics from a completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(input: u64, output: u64) -> Self {
        Self {
            input_tokens: input,
            output_tokens: output,
            total_tokens: input + output,
        }
    }

    pub fn from_rig_usage(usage: &rig::completion::Usage) -> Self {
        Self::new(usage.input_tokens, usage.output_tokens)
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Model configuration passed explicitly on every model call.
///
/// Each pipeline stage (supervisor, research, compression, final report,
/// summarization) owns one of these; there is no process-wide model state.
///
/// # Example
///
/// ```
/// use deep_research::llm::LLMConfig;
///
/// let config = LLMConfig::new("openai:gpt-4.1").with_max_tokens(10_000);
/// assert_eq!(config.model, "openai:gpt-4.1");
/// assert_eq!(config.max_tokens, Some(10_000));
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LLMConfig {
    /// Model identifier, optionally provider-prefixed ("anthropic:claude-sonnet-4")
    pub model: String,
    pub temperature: Option<f64>,
    /// Maximum tokens to generate in the response
    pub max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl LLMConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u64) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Provider family inferred from the model id
    pub fn family(&self) -> Option<ModelFamily> {
        ModelFamily::from_model_id(&self.model)
    }

    /// Known context window of the configured model, if any
    pub fn context_window(&self) -> Option<u64> {
        model_token_limit(&self.model)
    }
}
