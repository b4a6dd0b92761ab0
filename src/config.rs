//! Run configuration
//!
//! One `ResearchConfig` is built per run and shared read-only (behind an
//! `Arc`) by the supervisor and every research unit.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DeepResearchError;
use crate::llm::LLMConfig;

const ENV_PREFIX: &str = "DEEP_RESEARCH_";

/// Limits, per-stage models and search settings of a research run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Maximum `ConductResearch` calls admitted per supervisor turn
    pub max_concurrent_research_units: usize,

    /// Maximum supervisor decisions per run
    pub max_researcher_iterations: usize,

    /// Maximum model turns per research unit
    pub max_react_tool_calls: usize,

    /// Attempts for structured (JSON) model output
    pub max_structured_output_retries: usize,

    pub supervisor_model: LLMConfig,
    pub research_model: LLMConfig,
    pub compression_model: LLMConfig,
    pub final_report_model: LLMConfig,
    pub summarization_model: LLMConfig,

    /// Characters of raw page content sent to the summarizer
    pub max_content_length: usize,

    /// Wall-clock limit of one page summarization
    #[serde(with = "humantime_serde")]
    pub summarization_timeout: Duration,

    /// Optional wall-clock limit of one research unit; a unit running past
    /// it becomes a degraded note
    #[serde(with = "humantime_serde")]
    pub unit_timeout: Option<Duration>,

    /// Results per search query
    pub search_max_results: u32,

    #[serde(skip_serializing)]
    pub tavily_api_key: Option<String>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_research_units: 5,
            max_researcher_iterations: 6,
            max_react_tool_calls: 10,
            max_structured_output_retries: 3,
            supervisor_model: LLMConfig::new("openai:gpt-4.1").with_max_tokens(10_000),
            research_model: LLMConfig::new("openai:gpt-4.1").with_max_tokens(10_000),
            compression_model: LLMConfig::new("openai:gpt-4.1").with_max_tokens(8_192),
            final_report_model: LLMConfig::new("openai:gpt-4.1").with_max_tokens(10_000),
            summarization_model: LLMConfig::new("openai:gpt-4.1-mini").with_max_tokens(8_192),
            max_content_length: 50_000,
            summarization_timeout: Duration::from_secs(60),
            unit_timeout: None,
            search_max_results: 5,
            tavily_api_key: None,
        }
    }
}

impl ResearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrent_research_units(mut self, max: usize) -> Self {
        self.max_concurrent_research_units = max;
        self
    }

    pub fn with_max_researcher_iterations(mut self, max: usize) -> Self {
        self.max_researcher_iterations = max;
        self
    }

    pub fn with_max_react_tool_calls(mut self, max: usize) -> Self {
        self.max_react_tool_calls = max;
        self
    }

    pub fn with_max_structured_output_retries(mut self, max: usize) -> Self {
        self.max_structured_output_retries = max;
        self
    }

    pub fn with_supervisor_model(mut self, model: LLMConfig) -> Self {
        self.supervisor_model = model;
        self
    }

    pub fn with_research_model(mut self, model: LLMConfig) -> Self {
        self.research_model = model;
        self
    }

    pub fn with_compression_model(mut self, model: LLMConfig) -> Self {
        self.compression_model = model;
        self
    }

    pub fn with_final_report_model(mut self, model: LLMConfig) -> Self {
        self.final_report_model = model;
        self
    }

    pub fn with_summarization_model(mut self, model: LLMConfig) -> Self {
        self.summarization_model = model;
        self
    }

    pub fn with_max_content_length(mut self, max: usize) -> Self {
        self.max_content_length = max;
        self
    }

    pub fn with_summarization_timeout(mut self, timeout: Duration) -> Self {
        self.summarization_timeout = timeout;
        self
    }

    pub fn with_unit_timeout(mut self, timeout: Duration) -> Self {
        self.unit_timeout = Some(timeout);
        self
    }

    pub fn with_search_max_results(mut self, max: u32) -> Self {
        self.search_max_results = max;
        self
    }

    pub fn with_tavily_api_key(mut self, key: impl Into<String>) -> Self {
        self.tavily_api_key = Some(key.into());
        self
    }

    /// Load configuration from the environment.
    ///
    /// A `.env` file is loaded first if present. Recognized variables are
    /// `TAVILY_API_KEY` and `DEEP_RESEARCH_*` overrides of every field, e.g.
    /// `DEEP_RESEARCH_MAX_CONCURRENT_RESEARCH_UNITS=3` or
    /// `DEEP_RESEARCH_UNIT_TIMEOUT=10m`.
    pub fn from_env() -> Result<Self, DeepResearchError> {
        let _ = dotenvy::dotenv();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DeepResearchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut config = Self::default();

        if let Some(val) = var("MAX_CONCURRENT_RESEARCH_UNITS") {
            config.max_concurrent_research_units = parse_number("MAX_CONCURRENT_RESEARCH_UNITS", &val)?;
        }
        if let Some(val) = var("MAX_RESEARCHER_ITERATIONS") {
            config.max_researcher_iterations = parse_number("MAX_RESEARCHER_ITERATIONS", &val)?;
        }
        if let Some(val) = var("MAX_REACT_TOOL_CALLS") {
            config.max_react_tool_calls = parse_number("MAX_REACT_TOOL_CALLS", &val)?;
        }
        if let Some(val) = var("MAX_STRUCTURED_OUTPUT_RETRIES") {
            config.max_structured_output_retries = parse_number("MAX_STRUCTURED_OUTPUT_RETRIES", &val)?;
        }
        if let Some(val) = var("MAX_CONTENT_LENGTH") {
            config.max_content_length = parse_number("MAX_CONTENT_LENGTH", &val)?;
        }
        if let Some(val) = var("SEARCH_MAX_RESULTS") {
            config.search_max_results = parse_number("SEARCH_MAX_RESULTS", &val)?;
        }
        if let Some(val) = var("SUMMARIZATION_TIMEOUT") {
            config.summarization_timeout = parse_duration("SUMMARIZATION_TIMEOUT", &val)?;
        }
        if let Some(val) = var("UNIT_TIMEOUT") {
            config.unit_timeout = Some(parse_duration("UNIT_TIMEOUT", &val)?);
        }

        for (stage, model) in [
            ("SUPERVISOR", &mut config.supervisor_model),
            ("RESEARCH", &mut config.research_model),
            ("COMPRESSION", &mut config.compression_model),
            ("FINAL_REPORT", &mut config.final_report_model),
            ("SUMMARIZATION", &mut config.summarization_model),
        ] {
            if let Some(val) = var(&format!("{stage}_MODEL")) {
                model.model = val;
            }
            let key = format!("{stage}_MODEL_MAX_TOKENS");
            if let Some(val) = var(&key) {
                model.max_tokens = Some(parse_number(&key, &val)?);
            }
        }

        config.tavily_api_key = lookup("TAVILY_API_KEY").filter(|k| !k.is_empty());

        Ok(config)
    }

    /// Reject configurations no run can make progress with
    pub fn validate(&self) -> Result<(), DeepResearchError> {
        let limits = [
            ("max_concurrent_research_units", self.max_concurrent_research_units),
            ("max_researcher_iterations", self.max_researcher_iterations),
            ("max_react_tool_calls", self.max_react_tool_calls),
            ("max_structured_output_retries", self.max_structured_output_retries),
            ("max_content_length", self.max_content_length),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(DeepResearchError::Config(format!("{name} must be at least 1")));
            }
        }

        for model in [
            &self.supervisor_model,
            &self.research_model,
            &self.compression_model,
            &self.final_report_model,
            &self.summarization_model,
        ] {
            if model.model.trim().is_empty() {
                return Err(DeepResearchError::Config("model id cannot be empty".to_string()));
            }
            if let Some(t) = model.temperature {
                if !(0.0..=2.0).contains(&t) {
                    return Err(DeepResearchError::Config(format!(
                        "temperature of '{}' must be between 0.0 and 2.0, got: {t}",
                        model.model
                    )));
                }
            }
        }

        if self.summarization_timeout.is_zero() {
            return Err(DeepResearchError::Config("summarization_timeout must be positive".to_string()));
        }
        if self.unit_timeout.is_some_and(|t| t.is_zero()) {
            return Err(DeepResearchError::Config("unit_timeout must be positive".to_string()));
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, val: &str) -> Result<T, DeepResearchError> {
    val.trim().parse().map_err(|_| {
        DeepResearchError::Config(format!("{ENV_PREFIX}{name} must be a valid positive integer, got: {val}"))
    })
}

fn parse_duration(name: &str, val: &str) -> Result<Duration, DeepResearchError> {
    humantime_serde::re::humantime::parse_duration(val.trim()).map_err(|e| {
        DeepResearchError::Config(format!("{ENV_PREFIX}{name} must be a duration like '60s': {e}"))
    })
}
