use std::sync::Arc;

use bytes::Bytes;

use crate::config::Config;
use crate::llm::{build_adapter, ChatClient, ChatOptions};
use crate::tools::ToolRegistry;
use crate::types::AppResult;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub chat: Arc<ChatClient>,
}

impl AppState {
    pub fn new(config: Config, chat: ChatClient) -> Self {
        Self {
            config: Arc::new(config),
            chat: Arc::new(chat),
        }
    }

    /// Wire the configured provider and the default tools into a chat client.
    pub fn from_config(config: Config) -> AppResult<Self> {
        let adapter = build_adapter(&config.llm)?;
        let chat = ChatClient::new(
            adapter,
            ToolRegistry::with_defaults(),
            ChatOptions::from(&config.llm),
        );
        Ok(Self::new(config, chat))
    }
}

/// A file plus the question asked about it, as received by the upload endpoints.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Bytes,
    pub question: String,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub provider: String,
    pub model: String,
    pub tools: Vec<String>,
}
