use async_trait::async_trait;

use crate::error::Result;

/// Completion backend used for the final itinerary generation.
///
/// The reply is free text with no guaranteed structure.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, preamble: &str, prompt: &str) -> Result<String>;
}

#[cfg(feature = "rig")]
pub use openrouter_client::OpenRouterClient;

#[cfg(feature = "rig")]
mod openrouter_client {
    use async_trait::async_trait;
    use rig::completion::Chat;
    use rig::prelude::*;
    use rig::providers::openrouter;
    use tracing::{debug, error};

    use super::LlmClient;
    use crate::error::{Result, TripError};

    /// OpenRouter-backed client built on rig agents
    pub struct OpenRouterClient {
        client: openrouter::Client,
        model: String,
    }

    impl OpenRouterClient {
        pub fn new(api_key: &str, model: impl Into<String>) -> Self {
            Self {
                client: openrouter::Client::new(api_key),
                model: model.into(),
            }
        }
    }

    #[async_trait]
    impl LlmClient for OpenRouterClient {
        async fn complete(&self, preamble: &str, prompt: &str) -> Result<String> {
            let agent = self.client.agent(&self.model).preamble(preamble).build();

            debug!(model = %self.model, prompt_length = prompt.len(), "Requesting completion");
            let response = agent.chat(prompt, Vec::new()).await.map_err(|e| {
                error!(model = %self.model, error = %e, "LLM chat failed");
                TripError::Upstream(e.to_string())
            })?;

            if response.trim().is_empty() {
                return Err(TripError::Upstream("empty completion".to_string()));
            }
            Ok(response)
        }
    }
}
