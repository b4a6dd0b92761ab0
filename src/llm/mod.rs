//! Model invocation
//!
//! ```text
//! supervisor / researcher / compression / report stages
//!                   │ complete(thread, tools, &LLMConfig)
//!                   ▼
//!           LLMProvider (trait)
//!                   │
//!         ┌─────────┴──────────┐
//!         ▼                    ▼
//!    ModelRouter        RigAgentAdapter<M>
//!  (model id → provider)  (rig-core agent)
//! ```

mod config;
mod provider;
mod router;

pub use config::{LLMConfig, TokenUsage};
pub use provider::{complete_catching_panics, LLMProvider, LLMResponse};
pub(crate) use provider::panic_message;
pub use router::ModelRouter;
