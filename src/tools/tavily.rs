//! `tavily_search`: batched web search with per-page summarization
//!
//! One invocation carries a list of queries. Queries run concurrently,
//! results are de-duplicated by URL, and each page's raw content is
//! optionally condensed by a summarization model before it reaches the
//! researcher's thread.
//!
//! - HTTP timeout and retry with exponential backoff; a 429 waits for
//!   the server's `Retry-After` instead
//! - Typed errors; only transient failures are retried
//! - Summarization is bounded by a timeout and falls back to raw content

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Tool, ToolContext, ToolDefinition, ToolKind};
use crate::error::ToolError;
use crate::llm::{LLMConfig, LLMProvider};
use crate::research::prompts::ResearchPrompts;
use crate::state::{truncate_chars, Message};

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

const MAX_RETRIES: u32 = 3;

const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Upper bound on a server-requested wait
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

const NO_RESULTS: &str =
    "No valid search results found. Please try different search queries or use a different search API.";

/// Topic filter for the Tavily API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchTopic {
    #[default]
    General,
    News,
    Finance,
}

/// Condenses a fetched page with a summarization model.
///
/// Content is cut to `max_content_length` characters before it is sent.
/// On timeout, model error or an unparseable answer this yields `None`
/// and the caller keeps the (cut) raw content instead.
#[derive(Clone)]
pub struct WebpageSummarizer {
    provider: Arc<dyn LLMProvider>,
    model: LLMConfig,
    max_content_length: usize,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct Summary {
    summary: String,
    #[serde(default)]
    key_excerpts: String,
}

impl WebpageSummarizer {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        model: LLMConfig,
        max_content_length: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            model,
            max_content_length,
            timeout,
        }
    }

    pub async fn summarize(&self, content: &str) -> Option<String> {
        let content = truncate_chars(content, self.max_content_length);
        let prompt = ResearchPrompts::summarize_webpage(content);
        let thread = [Message::user(&prompt)];

        let call = self.provider.complete(&thread, &[], Some(&self.model));
        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "Webpage summarization failed, keeping raw content");
                return None;
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Webpage summarization timed out, keeping raw content");
                return None;
            }
        };

        match parse_json_object::<Summary>(&response.message.content) {
            Some(s) => Some(format!(
                "<summary>\n{}\n</summary>\n\n<key_excerpts>\n{}\n</key_excerpts>",
                s.summary, s.key_excerpts
            )),
            None => {
                debug!("Summarizer answer was not a summary object, keeping raw content");
                None
            }
        }
    }
}

/// Parse the first JSON object found in a model answer, tolerating code
/// fences and surrounding prose.
pub(crate) fn parse_json_object<T: serde::de::DeserializeOwned>(text: &str) -> Option<T> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Tavily search tool bound to research units
pub struct TavilySearchTool {
    api_key: String,
    client: Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    max_results: u32,
    summarizer: Option<WebpageSummarizer>,
}

impl TavilySearchTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_results: 5,
            summarizer: None,
        }
    }

    /// Point the tool at another endpoint (a proxy, or a mock server in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Default results per query when the call does not specify one
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results.clamp(1, 20);
        self
    }

    pub fn with_summarizer(mut self, summarizer: WebpageSummarizer) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    async fn execute_with_retry(&self, request: &TavilyRequest) -> Result<TavilyResponse, TavilyError> {
        let mut attempt = 0;
        loop {
            match self.execute_single_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.retry_delay(attempt, &e);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Tavily request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Wait before retry number `attempt + 1`
    fn retry_delay(&self, attempt: u32, error: &TavilyError) -> Duration {
        match error {
            TavilyError::RateLimited { retry_after: Some(wait) } => (*wait).min(MAX_RETRY_AFTER),
            _ => self.retry_base_delay.saturating_mul(2u32.saturating_pow(attempt)),
        }
    }

    async fn execute_single_request(&self, request: &TavilyRequest) -> Result<TavilyResponse, TavilyError> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| TavilyError::ParseError(e.to_string()));
        }

        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(TavilyError::from_status(status.as_u16(), retry_after, body))
    }

    /// Run every query concurrently and keep the first result seen per URL.
    ///
    /// Individual query failures are logged and skipped; the call fails only
    /// when every query failed.
    async fn search_all(&self, args: &TavilySearchArgs) -> Result<Vec<TavilyResult>, TavilyError> {
        let max_results = args.max_results.unwrap_or(self.max_results).clamp(1, 20);
        let requests: Vec<TavilyRequest> = args
            .queries
            .iter()
            .map(|query| TavilyRequest {
                query: query.clone(),
                max_results,
                topic: args.topic,
                include_raw_content: true,
            })
            .collect();

        let responses = join_all(requests.iter().map(|r| self.execute_with_retry(r))).await;

        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0usize;

        for (request, response) in requests.iter().zip(responses) {
            match response {
                Ok(response) => {
                    succeeded += 1;
                    for result in response.results {
                        if seen.insert(result.url.clone()) {
                            unique.push(result);
                        }
                    }
                }
                Err(e) => {
                    warn!(query = %request.query, error = %e, "Tavily query failed");
                    last_error = Some(e);
                }
            }
        }

        match (succeeded, last_error) {
            (0, Some(e)) => Err(e),
            _ => Ok(unique),
        }
    }

    async fn render(&self, results: Vec<TavilyResult>) -> String {
        if results.is_empty() {
            return NO_RESULTS.to_string();
        }

        let summaries = join_all(results.iter().map(|r| async move {
            match (&self.summarizer, r.raw_content.as_deref()) {
                (Some(summarizer), Some(raw)) if !raw.is_empty() => match summarizer.summarize(raw).await {
                    Some(summary) => summary,
                    None => truncate_chars(raw, summarizer.max_content_length).to_string(),
                },
                _ => r.content.clone(),
            }
        }))
        .await;

        let mut output = String::from("Search results: \n\n");
        for (i, (result, summary)) in results.iter().zip(summaries).enumerate() {
            output.push_str(&format!("\n\n--- SOURCE {}: {} ---\n", i + 1, result.title));
            output.push_str(&format!("URL: {}\n\n", result.url));
            output.push_str(&format!("SUMMARY:\n{}\n\n", summary));
            output.push_str(&"-".repeat(80));
            output.push('\n');
        }
        output
    }
}

/// Typed errors for the Tavily API
#[derive(Debug, thiserror::Error)]
pub enum TavilyError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - check API key")]
    Unauthorized,

    #[error("Rate limited - too many requests")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl TavilyError {
    fn from_status(status: u16, retry_after: Option<Duration>, body: String) -> Self {
        match status {
            401 => TavilyError::Unauthorized,
            429 => TavilyError::RateLimited { retry_after },
            400 => TavilyError::BadRequest(body),
            500..=599 => TavilyError::ServerError(status, body),
            _ => TavilyError::HttpError(status, body),
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            TavilyError::Timeout
                | TavilyError::Connection(_)
                | TavilyError::RateLimited { .. }
                | TavilyError::ServerError(_, _)
        )
    }
}

impl From<reqwest::Error> for TavilyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TavilyError::Timeout
        } else if e.is_connect() {
            TavilyError::Connection(e.to_string())
        } else {
            TavilyError::Network(e.to_string())
        }
    }
}

/// `Retry-After` as delay-seconds or an HTTP date
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let wait = at.with_timezone(&chrono::Utc) - chrono::Utc::now();
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}

impl From<TavilyError> for ToolError {
    fn from(e: TavilyError) -> Self {
        ToolError::Execution(format!("Tavily API error: {}", e))
    }
}

#[derive(Debug, Deserialize)]
struct TavilySearchArgs {
    queries: Vec<String>,

    #[serde(default)]
    max_results: Option<u32>,

    #[serde(default)]
    topic: SearchTopic,
}

#[derive(Debug, Serialize)]
struct TavilyRequest {
    query: String,
    max_results: u32,
    topic: SearchTopic,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    content: String,
    #[serde(default)]
    raw_content: Option<String>,
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "tavily_search".to_string(),
            description: "A search engine optimized for comprehensive, accurate, and trusted results. \
                Useful for when you need to answer questions about current events. \
                Pass several related queries at once to cover a topic from different angles."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "queries": {
                        "type": "array",
                        "items": {"type": "string", "maxLength": 400},
                        "description": "List of search queries to execute",
                        "minItems": 1
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of results to return per query",
                        "minimum": 1,
                        "maximum": 20
                    },
                    "topic": {
                        "type": "string",
                        "enum": ["general", "news", "finance"],
                        "description": "Topic to filter results by",
                        "default": "general"
                    }
                },
                "required": ["queries"],
                "additionalProperties": false
            }),
        }
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Search
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let args: TavilySearchArgs =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        if args.queries.is_empty() {
            return Err(ToolError::InvalidArguments("queries must not be empty".to_string()));
        }
        if args.queries.iter().any(|q| q.len() > 400) {
            return Err(ToolError::InvalidArguments(
                "Query too long (max 400 characters)".to_string(),
            ));
        }

        debug!(
            tool_call_id = ctx.tool_call_id.as_deref().unwrap_or("-"),
            queries = args.queries.len(),
            "Executing tavily_search"
        );

        let results = self.search_all(&args).await?;
        Ok(self.render(results).await)
    }
}
