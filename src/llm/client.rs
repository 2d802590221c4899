//! Chat Client
//!
//! Sends a prompt to the configured adapter and streams the answer back as text
//! fragments. When tools are enabled, the client runs the tool loop itself:
//! tool calls streamed by the model are collected, executed through the
//! [`ToolRegistry`], and their results are sent back in a follow-up request
//! until the model answers without calling a tool.

use async_stream::try_stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::LLMConfig;
use crate::llm::provider::LLMAdapter;
use crate::tools::ToolRegistry;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest, ToolCall, ToolCallDelta};

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_tool_rounds: usize,
    pub system_prompt: Option<String>,
}

impl From<&LLMConfig> for ChatOptions {
    fn from(config: &LLMConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_tool_rounds: config.max_tool_rounds,
            system_prompt: config.system_prompt.clone(),
        }
    }
}

pub struct ChatClient {
    adapter: Arc<dyn LLMAdapter>,
    tools: Arc<ToolRegistry>,
    options: ChatOptions,
}

impl ChatClient {
    pub fn new(adapter: Arc<dyn LLMAdapter>, tools: ToolRegistry, options: ChatOptions) -> Self {
        Self {
            adapter,
            tools: Arc::new(tools),
            options,
        }
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Stream the answer to `prompt`. With `with_tools` the registry's tools are
    /// offered to the model. The stream ends after the first error item.
    pub fn stream(
        &self,
        prompt: impl Into<String>,
        with_tools: bool,
    ) -> BoxStream<'static, AppResult<String>> {
        let adapter = self.adapter.clone();
        let options = self.options.clone();
        let registry = if with_tools {
            self.tools.clone()
        } else {
            Arc::new(ToolRegistry::new())
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &options.system_prompt {
            messages.push(LLMMessage::system(system.clone()));
        }
        messages.push(LLMMessage::user(prompt));

        Box::pin(try_stream! {
            let definitions = registry.definitions();
            let mut round = 0usize;

            loop {
                let request = LLMRequest {
                    model: options.model.clone(),
                    messages: messages.clone(),
                    tools: definitions.clone(),
                    max_tokens: options.max_tokens,
                    temperature: options.temperature,
                };

                debug!(round, messages = request.messages.len(), "Starting completion round");
                let mut deltas = adapter.create_chat_completion_stream(&request).await?;

                let mut text = String::new();
                let mut pending = ToolCallAccumulator::default();
                while let Some(delta) = deltas.next().await {
                    let delta = delta?;
                    pending.absorb(delta.tool_calls);
                    if let Some(content) = delta.content {
                        if !content.is_empty() {
                            text.push_str(&content);
                            yield content;
                        }
                    }
                }

                let calls = pending.finish();
                if calls.is_empty() {
                    break;
                }

                check_tool_budget(round, options.max_tool_rounds)?;
                round += 1;
                info!(round, calls = calls.len(), "Model requested tool calls");

                let content = (!text.is_empty()).then_some(text);
                messages.push(LLMMessage::assistant_tool_calls(content, calls.clone()));
                for call in &calls {
                    let output = registry.execute(call).await;
                    messages.push(LLMMessage::tool_result(call.id.clone(), output.content));
                }
            }
        })
    }
}

fn check_tool_budget(rounds_used: usize, max_rounds: usize) -> AppResult<()> {
    if rounds_used >= max_rounds {
        return Err(AppError::LLMApi(format!(
            "tool call limit exceeded after {} rounds",
            max_rounds
        )));
    }
    Ok(())
}

#[derive(Default)]
struct PartialToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Reassembles tool calls from streamed fragments, keyed by call index.
#[derive(Default)]
struct ToolCallAccumulator {
    calls: BTreeMap<usize, PartialToolCall>,
}

impl ToolCallAccumulator {
    fn absorb(&mut self, deltas: Vec<ToolCallDelta>) {
        for delta in deltas {
            let call = self.calls.entry(delta.index).or_default();
            if let Some(id) = delta.id.filter(|id| !id.is_empty()) {
                call.id = Some(id);
            }
            // the name arrives whole; some gateways repeat it on every fragment
            if let Some(name) = delta.name.filter(|name| !name.is_empty()) {
                if call.name.is_empty() {
                    call.name = name;
                }
            }
            if let Some(arguments) = delta.arguments {
                call.arguments.push_str(&arguments);
            }
        }
    }

    fn finish(self) -> Vec<ToolCall> {
        self.calls
            .into_iter()
            .map(|(index, call)| {
                let id = call.id.unwrap_or_else(|| format!("call_{}", index));
                ToolCall::new(id, call.name, call.arguments)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::llm::scripted::ScriptedAdapter;
    use crate::tools::READ_FILE_TOOL;
    use crate::types::{ChatDelta, Role};
    use tempfile::TempDir;

    fn client(adapter: Arc<ScriptedAdapter>, max_tool_rounds: usize) -> ChatClient {
        let mut options = ChatOptions::from(&Config::default().llm);
        options.max_tool_rounds = max_tool_rounds;
        ChatClient::new(adapter, ToolRegistry::with_defaults(), options)
    }

    fn tool_call_delta(index: usize, id: Option<&str>, name: Option<&str>, args: &str) -> ChatDelta {
        ChatDelta {
            tool_calls: vec![ToolCallDelta {
                index,
                id: id.map(str::to_string),
                name: name.map(str::to_string),
                arguments: Some(args.to_string()),
            }],
            ..ChatDelta::default()
        }
    }

    #[test]
    fn test_accumulator_joins_fragments() {
        let mut acc = ToolCallAccumulator::default();
        acc.absorb(vec![ToolCallDelta {
            index: 0,
            id: Some("call_a".to_string()),
            name: Some("readFileAndPrint".to_string()),
            arguments: Some("{\"filePath\":".to_string()),
        }]);
        acc.absorb(vec![ToolCallDelta {
            index: 0,
            arguments: Some("\"/tmp/x.txt\"}".to_string()),
            ..ToolCallDelta::default()
        }]);
        acc.absorb(vec![ToolCallDelta {
            index: 1,
            name: Some("other".to_string()),
            ..ToolCallDelta::default()
        }]);

        let calls = acc.finish();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].function.arguments, "{\"filePath\":\"/tmp/x.txt\"}");
        assert_eq!(calls[1].id, "call_1");
        assert_eq!(calls[1].function.name, "other");
    }

    #[test]
    fn test_accumulator_keeps_repeated_name_once() {
        let mut acc = ToolCallAccumulator::default();
        for args in ["{\"filePath\":", "\"a.txt\"}"] {
            acc.absorb(vec![ToolCallDelta {
                index: 0,
                id: Some("call_a".to_string()),
                name: Some(READ_FILE_TOOL.to_string()),
                arguments: Some(args.to_string()),
            }]);
        }

        let calls = acc.finish();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, READ_FILE_TOOL);
        assert_eq!(calls[0].function.arguments, "{\"filePath\":\"a.txt\"}");
    }

    #[tokio::test]
    async fn test_stream_forwards_chunks_without_tools() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![vec![
            Ok(ChatDelta::text("The ")),
            Ok(ChatDelta::text("answer")),
        ]]));
        let chunks: Vec<String> = client(adapter.clone(), 4)
            .stream("question", false)
            .map(|c| c.unwrap())
            .collect()
            .await;

        assert_eq!(chunks, vec!["The ", "answer"]);
        let requests = adapter.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_empty());
        assert_eq!(requests[0].messages, vec![LLMMessage::user("question")]);
    }

    #[tokio::test]
    async fn test_stream_runs_tool_loop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("facts.txt");
        std::fs::write(&path, "Rust 1.0 shipped in 2015.").unwrap();
        let args = serde_json::json!({ "filePath": path }).to_string();
        let (head, tail) = args.split_at(5);

        let adapter = Arc::new(ScriptedAdapter::new(vec![
            vec![
                Ok(tool_call_delta(0, Some("call_7"), Some(READ_FILE_TOOL), head)),
                Ok(tool_call_delta(0, None, None, tail)),
            ],
            vec![Ok(ChatDelta::text("It shipped in 2015."))],
        ]));

        let chunks: Vec<String> = client(adapter.clone(), 4)
            .stream("When did Rust 1.0 ship?", true)
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["It shipped in 2015."]);

        let requests = adapter.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools[0].name, READ_FILE_TOOL);

        let followup = &requests[1].messages;
        assert_eq!(followup.len(), 3);
        assert_eq!(followup[1].role, Role::Assistant);
        assert_eq!(followup[1].tool_calls[0].function.arguments, args);
        assert_eq!(followup[2].role, Role::Tool);
        assert_eq!(followup[2].tool_call_id.as_deref(), Some("call_7"));
        assert_eq!(followup[2].content.as_deref(), Some("Rust 1.0 shipped in 2015."));
    }

    #[tokio::test]
    async fn test_stream_stops_at_tool_budget() {
        let looping = || vec![Ok(tool_call_delta(0, Some("c"), Some(READ_FILE_TOOL), "{\"filePath\":\"x\"}"))];
        let adapter = Arc::new(ScriptedAdapter::new(vec![looping(), looping(), looping()]));

        let items: Vec<AppResult<String>> = client(adapter.clone(), 1)
            .stream("loop forever", true)
            .collect()
            .await;

        assert_eq!(items.len(), 1);
        let err = items.into_iter().next().unwrap().unwrap_err();
        assert!(err.to_string().contains("tool call limit exceeded"));
        assert_eq!(adapter.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_stream_ends_after_upstream_error() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![vec![
            Ok(ChatDelta::text("partial")),
            Err(AppError::LLMApi("connection reset".to_string())),
            Ok(ChatDelta::text("never seen")),
        ]]));

        let items: Vec<AppResult<String>> = client(adapter, 4).stream("q", false).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn test_system_prompt_is_sent_first() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![vec![Ok(ChatDelta::text("ok"))]]));
        let mut options = ChatOptions::from(&Config::default().llm);
        options.system_prompt = Some("Be brief.".to_string());
        let client = ChatClient::new(adapter.clone(), ToolRegistry::new(), options);

        let _: Vec<_> = client.stream("hi", false).collect().await;
        let messages = &adapter.requests()[0].messages;
        assert_eq!(messages[0], LLMMessage::system("Be brief."));
        assert_eq!(messages[1], LLMMessage::user("hi"));
    }
}
