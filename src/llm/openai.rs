// OpenAI-compatible chat-completions adapter
// Works against OpenAI, GLM (Zhipu AI), Groq, OpenRouter and self-hosted
// gateways; only the base URL differs.

use crate::llm::provider::LLMAdapter;
use crate::types::{
    AppError, AppResult, ChatDelta, LLMMessage, LLMRequest, ToolCallDelta, ToolDefinition,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub struct OpenAIAdapter {
    client: Client,
    api_key: String,
    api_base: String,
}

// Request types
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [LLMMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Serialize)]
struct ToolSpec<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDefinition,
}

// Streaming response types
#[derive(Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ChunkToolCall>>,
}

#[derive(Deserialize)]
struct ChunkToolCall {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<ChunkFunction>,
}

#[derive(Deserialize)]
struct ChunkFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl OpenAIAdapter {
    /// `read_timeout` bounds the wait between two reads of the response, so a
    /// long answer that keeps streaming is never cut off.
    pub fn new(
        api_key: &str,
        api_base: &str,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

/// Turn a non-success response body into a readable error.
fn api_error(status: reqwest::StatusCode, body: &str) -> AppError {
    if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
        return AppError::LLMApi(format!(
            "API error ({}): {} (code: {:?})",
            status, error_response.error.message, error_response.error.code
        ));
    }
    AppError::LLMApi(format!("API error ({}): {}", status, body))
}

/// Splits a byte stream into SSE lines. Bytes are buffered until a newline so
/// multi-byte characters split across network chunks survive.
#[derive(Default)]
pub(crate) struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }

    /// Whatever is left once the body ends without a trailing newline.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.buffer).trim().to_string();
        self.buffer.clear();
        (!rest.is_empty()).then_some(rest)
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum SseEvent {
    Delta(ChatDelta),
    Done,
    Skip,
}

/// Interpret one SSE line of a streamed chat completion.
pub(crate) fn parse_sse_line(line: &str) -> AppResult<SseEvent> {
    let Some(payload) = line.strip_prefix("data:") else {
        // blank separators, `event:`/`id:` fields and `:` comments
        return Ok(SseEvent::Skip);
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(SseEvent::Skip);
    }
    if payload == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    // error objects also deserialize as a chunk without choices
    if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(payload) {
        return Err(AppError::LLMApi(format!(
            "stream error: {}",
            error_response.error.message
        )));
    }

    let chunk: ChatCompletionChunk = serde_json::from_str(payload)
        .map_err(|e| AppError::LLMApi(format!("failed to parse stream chunk: {}", e)))?;

    let Some(choice) = chunk.choices.into_iter().next() else {
        // usage-only trailer chunks carry no choices
        return Ok(SseEvent::Skip);
    };

    let tool_calls = choice
        .delta
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            let (name, arguments) = match call.function {
                Some(f) => (f.name, f.arguments),
                None => (None, None),
            };
            ToolCallDelta {
                index: call.index,
                id: call.id,
                name,
                arguments,
            }
        })
        .collect();

    Ok(SseEvent::Delta(ChatDelta {
        content: choice.delta.content,
        tool_calls,
    }))
}

#[async_trait]
impl LLMAdapter for OpenAIAdapter {
    async fn create_chat_completion_stream(
        &self,
        request: &LLMRequest,
    ) -> AppResult<BoxStream<'static, AppResult<ChatDelta>>> {
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            tools: request
                .tools
                .iter()
                .map(|function| ToolSpec {
                    kind: "function",
                    function,
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
        };

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending streaming chat completion request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(api_error(status, &error_text));
        }

        let mut bytes = Box::pin(response.bytes_stream());

        let stream: BoxStream<'static, AppResult<ChatDelta>> = Box::pin(try_stream! {
            let mut decoder = SseLineDecoder::default();
            let mut done = false;

            while !done {
                let Some(chunk) = bytes.next().await else {
                    break;
                };
                let chunk = chunk.map_err(AppError::from)?;
                for line in decoder.push(&chunk) {
                    match parse_sse_line(&line)? {
                        SseEvent::Delta(delta) => {
                            yield delta;
                        }
                        SseEvent::Done => {
                            done = true;
                            break;
                        }
                        SseEvent::Skip => {}
                    }
                }
            }

            if !done {
                if let Some(rest) = decoder.finish() {
                    if let SseEvent::Delta(delta) = parse_sse_line(&rest)? {
                        yield delta;
                    }
                }
            }
        });

        Ok(stream)
    }
}
