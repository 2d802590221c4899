use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LLMConfig;
use crate::llm::openai::OpenAIAdapter;
use crate::types::{AppError, AppResult, ChatDelta, LLMRequest};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
// GLM general endpoint; the coding endpoint needs a separate subscription
const GLM_API_BASE: &str = "https://api.z.ai/api/paas/v4";
const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion_stream(
        &self,
        request: &LLMRequest,
    ) -> AppResult<BoxStream<'static, AppResult<ChatDelta>>>;
}

/// Default base URL for a named provider. All supported providers speak the
/// OpenAI chat-completions protocol.
pub fn default_api_base(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some(OPENAI_API_BASE),
        "glm" => Some(GLM_API_BASE),
        "groq" => Some(GROQ_API_BASE),
        "openrouter" => Some(OPENROUTER_API_BASE),
        _ => None,
    }
}

/// Build the adapter for the configured provider.
pub fn build_adapter(config: &LLMConfig) -> AppResult<Arc<dyn LLMAdapter>> {
    let api_base = match (&config.api_base, default_api_base(&config.provider)) {
        (Some(base), _) => base.clone(),
        (None, Some(base)) => base.to_string(),
        (None, None) => {
            return Err(AppError::Config(format!(
                "Unsupported provider '{}' (set LLM_API_BASE to use a custom endpoint)",
                config.provider
            )))
        }
    };

    let adapter = OpenAIAdapter::new(
        &config.api_key,
        &api_base,
        Duration::from_secs(config.connect_timeout_secs),
        Duration::from_secs(config.timeout_secs),
    )?;

    Ok(Arc::new(adapter))
}
