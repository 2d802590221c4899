// In-memory adapter that replays canned completion rounds

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, ChatDelta, LLMRequest};

/// Each call to the adapter pops the next round of deltas and records the
/// request it was given.
pub struct ScriptedAdapter {
    rounds: Mutex<VecDeque<Vec<AppResult<ChatDelta>>>>,
    requests: Mutex<Vec<LLMRequest>>,
}

impl ScriptedAdapter {
    pub fn new(rounds: Vec<Vec<AppResult<ChatDelta>>>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMAdapter for ScriptedAdapter {
    async fn create_chat_completion_stream(
        &self,
        request: &LLMRequest,
    ) -> AppResult<BoxStream<'static, AppResult<ChatDelta>>> {
        self.requests.lock().unwrap().push(request.clone());
        let round = self
            .rounds
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::LLMApi("script exhausted".to_string()))?;
        Ok(stream::iter(round).boxed())
    }
}
