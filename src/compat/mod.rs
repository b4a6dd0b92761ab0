//! Bridge to rig-core
//!
//! ```text
//! research stages ──complete()──▶ LLMProvider
//!                                    │
//!                                    ▼
//!                         RigAgentAdapter<M>  ──▶ rig Agent<M> ──▶ provider API
//! ```
//!
//! One adapter wraps one rig agent, i.e. one model. Serve several stages
//! from different models by registering one adapter per model id on a
//! [`crate::llm::ModelRouter`]:
//!
//! ```rust,ignore
//! use rig::client::{CompletionClient, ProviderClient};
//! use rig::providers::openai::Client;
//! use deep_research::compat::RigAgentAdapter;
//! use deep_research::llm::ModelRouter;
//!
//! let client = Client::from_env();
//! let router = ModelRouter::new()
//!     .route("openai:gpt-4.1", Arc::new(RigAgentAdapter::new(client.agent("gpt-4.1").build(), "openai:gpt-4.1")))
//!     .route("openai:gpt-4.1-mini", Arc::new(RigAgentAdapter::new(client.agent("gpt-4.1-mini").build(), "openai:gpt-4.1-mini")));
//! ```

mod rig_agent_adapter;

pub use rig_agent_adapter::RigAgentAdapter;
