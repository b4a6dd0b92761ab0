//! Token-limit classification
//!
//! Providers report context overflow in their own words. Compression and
//! the final report retry with a shorter input only when the error text
//! says the context window was exceeded; every other error is terminal for
//! that stage.

use crate::error::DeepResearchError;

/// Provider family of a model, used to pick the right overflow phrasing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    OpenAi,
    Anthropic,
    Gemini,
}

impl ModelFamily {
    /// Infer the family from `provider:model` ids or bare model names.
    ///
    /// ```
    /// use deep_research::research::token_limit::ModelFamily;
    ///
    /// assert_eq!(ModelFamily::from_model_id("openai:gpt-4.1"), Some(ModelFamily::OpenAi));
    /// assert_eq!(ModelFamily::from_model_id("claude-sonnet-4"), Some(ModelFamily::Anthropic));
    /// assert_eq!(ModelFamily::from_model_id("mistral-large"), None);
    /// ```
    pub fn from_model_id(model_id: &str) -> Option<Self> {
        let id = model_id.trim().to_lowercase();

        if let Some((provider, _)) = id.split_once(':') {
            match provider {
                "openai" | "azure_openai" => return Some(Self::OpenAi),
                "anthropic" => return Some(Self::Anthropic),
                "google" | "google_genai" | "google_vertexai" | "gemini" => return Some(Self::Gemini),
                _ => {}
            }
        }

        let name = id.rsplit(':').next().unwrap_or(&id);
        if name.starts_with("gpt-") || is_openai_reasoning_model(name) {
            Some(Self::OpenAi)
        } else if name.starts_with("claude") {
            Some(Self::Anthropic)
        } else if name.starts_with("gemini") {
            Some(Self::Gemini)
        } else {
            None
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::OpenAi => &[
                "context_length_exceeded",
                "maximum context length",
                "reduce the length",
                "too many tokens",
                "string too long",
            ],
            Self::Anthropic => &[
                "prompt is too long",
                "exceed context limit",
                "exceeds the context window",
                "too many total text bytes",
            ],
            Self::Gemini => &[
                "resource_exhausted",
                "exceeds the maximum number of tokens",
                "input token count",
                "token count exceeds",
            ],
        }
    }
}

fn is_openai_reasoning_model(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('o') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

/// Keywords used when the family is unknown; any one of them matches
const GENERIC_KEYWORDS: &[&str] = &["token", "limit", "exceeded", "too long", "context length", "maximum"];

/// True if `error_text` reports a context-window overflow.
///
/// With a known family only that family's phrasing matches. Without one
/// any of the generic keywords does, so an unknown provider's rate-limit
/// error is also treated as an overflow.
pub fn is_token_limit_exceeded(error_text: &str, family: Option<ModelFamily>) -> bool {
    let text = error_text.to_lowercase();
    let keywords = match family {
        Some(family) => family.keywords(),
        None => GENERIC_KEYWORDS,
    };
    keywords.iter().any(|k| text.contains(k))
}

/// Classify a model-call error for the given model id.
///
/// Only provider errors can be token-limit errors; routing, configuration
/// and conversion failures never are.
pub fn is_token_limit_error(error: &DeepResearchError, model_id: &str) -> bool {
    match error {
        DeepResearchError::LlmError(text) => {
            is_token_limit_exceeded(text, ModelFamily::from_model_id(model_id))
        }
        _ => false,
    }
}

/// Known context windows, most specific name first
const MODEL_TOKEN_LIMITS: &[(&str, u64)] = &[
    ("gpt-4.1-mini", 1_047_576),
    ("gpt-4.1-nano", 1_047_576),
    ("gpt-4.1", 1_047_576),
    ("gpt-4o-mini", 128_000),
    ("gpt-4o", 128_000),
    ("gpt-4-turbo", 128_000),
    ("gpt-4", 8_192),
    ("gpt-3.5-turbo", 16_385),
    ("o4-mini", 200_000),
    ("o3-mini", 200_000),
    ("o3", 200_000),
    ("o1", 200_000),
    ("claude-opus-4", 200_000),
    ("claude-sonnet-4", 200_000),
    ("claude-3-7-sonnet", 200_000),
    ("claude-3-5-sonnet", 200_000),
    ("claude-3-5-haiku", 200_000),
    ("claude-3-opus", 200_000),
    ("claude-3-haiku", 200_000),
    ("gemini-1.5-pro", 2_097_152),
    ("gemini-1.5-flash", 1_048_576),
    ("gemini-2.0-flash", 1_048_576),
    ("gemini-2.5-pro", 1_048_576),
    ("gemini-2.5-flash", 1_048_576),
];

/// Context window of a known model, substring-matched on the model name.
pub fn model_token_limit(model_id: &str) -> Option<u64> {
    let id = model_id.to_lowercase();
    let name = id.rsplit(':').next().unwrap_or(&id);
    MODEL_TOKEN_LIMITS
        .iter()
        .find(|(key, _)| {
            if key.starts_with('o') {
                name.starts_with(key)
            } else {
                name.contains(key)
            }
        })
        .map(|&(_, limit)| limit)
}
