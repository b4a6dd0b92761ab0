//! Model routing by model id
//!
//! Stages select their model through [`LLMConfig::model`]. A rig agent is
//! bound to a single model, so the router maps each configured model id to
//! the provider that serves it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::config::LLMConfig;
use super::provider::{LLMProvider, LLMResponse};
use crate::error::DeepResearchError;
use crate::state::Message;
use crate::tools::ToolDefinition;

/// Routes each call to the provider registered for the call's model id.
#[derive(Default, Clone)]
pub struct ModelRouter {
    routes: HashMap<String, Arc<dyn LLMProvider>>,
    fallback: Option<Arc<dyn LLMProvider>>,
}

impl ModelRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `model` with `provider`
    pub fn route(mut self, model: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        self.routes.insert(model.into(), provider);
        self
    }

    /// Provider for calls whose model id has no route (or no config at all)
    pub fn with_fallback(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.fallback = Some(provider);
        self
    }

    fn resolve(&self, config: Option<&LLMConfig>) -> Result<&Arc<dyn LLMProvider>, DeepResearchError> {
        config
            .and_then(|c| self.routes.get(&c.model))
            .or(self.fallback.as_ref())
            .ok_or_else(|| {
                DeepResearchError::Config(format!(
                    "no provider registered for model '{}'",
                    config.map(|c| c.model.as_str()).unwrap_or("<none>")
                ))
            })
    }
}

#[async_trait]
impl LLMProvider for ModelRouter {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, DeepResearchError> {
        let provider = self.resolve(config)?;
        debug!(
            provider = provider.name(),
            model = config.map(|c| c.model.as_str()).unwrap_or(provider.default_model()),
            "Routing completion"
        );
        provider.complete(messages, tools, config).await
    }

    fn name(&self) -> &str {
        "router"
    }

    fn default_model(&self) -> &str {
        self.fallback
            .as_ref()
            .map(|p| p.default_model())
            .unwrap_or("unrouted")
    }
}

impl std::fmt::Debug for ModelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRouter")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl LLMProvider for Named {
        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _config: Option<&LLMConfig>,
        ) -> Result<LLMResponse, DeepResearchError> {
            Ok(LLMResponse::new(Message::assistant(self.0)))
        }

        fn name(&self) -> &str {
            self.0
        }

        fn default_model(&self) -> &str {
            self.0
        }
    }

    #[tokio::test]
    async fn test_routes_by_model_id() {
        let router = ModelRouter::new()
            .route("openai:gpt-4.1", Arc::new(Named("big")))
            .route("openai:gpt-4.1-mini", Arc::new(Named("small")));

        let small = LLMConfig::new("openai:gpt-4.1-mini");
        let response = router.complete(&[], &[], Some(&small)).await.unwrap();
        assert_eq!(response.message.content, "small");
    }

    #[tokio::test]
    async fn test_unrouted_model_uses_fallback() {
        let router = ModelRouter::new().with_fallback(Arc::new(Named("default")));
        let config = LLMConfig::new("anthropic:claude-sonnet-4");
        let response = router.complete(&[], &[], Some(&config)).await.unwrap();
        assert_eq!(response.message.content, "default");
    }

    #[tokio::test]
    async fn test_unrouted_model_without_fallback_is_config_error() {
        let router = ModelRouter::new();
        let config = LLMConfig::new("unknown-model");
        let err = router.complete(&[], &[], Some(&config)).await.unwrap_err();
        assert!(matches!(err, DeepResearchError::Config(_)));
        assert!(err.to_string().contains("unknown-model"));
    }
}
