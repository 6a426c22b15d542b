//! Ollama chat client (`/api/chat`, non-streaming).

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::Error;
use crate::tools::ToolDefinition;
use crate::Result;

use super::super::message::{Message, Role, ToolCallRequest};
use super::types::{ChatRequest, ChatResponse, WireCall, WireFunction, WireMessage, WireTool, WireToolCall};
use super::{LlmClient, LlmResponse, Usage};

pub const DEFAULT_OLLAMA_HOST: &str = "http://127.0.0.1:11434";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Ollama API client; an API key, when set, is sent as a bearer token.
#[derive(Clone)]
pub struct OllamaClient {
    host: String,
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl OllamaClient {
    pub fn new(host: &str, model: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            host: host.trim_end_matches('/').to_string(),
            api_key: None,
            model: model.to_string(),
            client,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    fn build_url(&self) -> String {
        format!("{}/api/chat", self.host)
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|m| WireMessage {
                role: match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                }
                .to_string(),
                content: m.content.clone(),
                tool_calls: m
                    .tool_calls
                    .iter()
                    .flatten()
                    .map(|tc| WireToolCall {
                        id: None,
                        function: WireCall {
                            name: tc.name.clone(),
                            arguments: tc.arguments.clone(),
                        },
                    })
                    .collect(),
                tool_name: m.tool_name.clone(),
            })
            .collect()
    }

    fn convert_tools<'a>(&self, tools: &'a [ToolDefinition]) -> Vec<WireTool<'a>> {
        tools
            .iter()
            .map(|t| WireTool {
                kind: "function",
                function: WireFunction {
                    name: &t.name,
                    description: &t.description,
                    parameters: &t.parameters,
                },
            })
            .collect()
    }

    fn parse_response(&self, response: ChatResponse) -> LlmResponse {
        let tool_calls: Vec<ToolCallRequest> = response
            .message
            .tool_calls
            .into_iter()
            .enumerate()
            .map(|(i, call)| ToolCallRequest {
                id: call.id.unwrap_or_else(|| format!("call_{}", i)),
                name: call.function.name,
                arguments: normalize_arguments(call.function.arguments),
            })
            .collect();

        let content = Some(response.message.content).filter(|c| !c.is_empty());

        let prompt_tokens = response.prompt_eval_count.unwrap_or(0);
        let completion_tokens = response.eval_count.unwrap_or(0);

        LlmResponse {
            content,
            tool_calls,
            finish_reason: response.done_reason.unwrap_or_else(|| "stop".to_string()),
            usage: Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        }
    }
}

/// Arguments may arrive as an object, a JSON-encoded string, or not at all
fn normalize_arguments(arguments: Value) -> Value {
    match arguments {
        Value::Null => Value::Object(Default::default()),
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        other => other,
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        let request = ChatRequest {
            model: &self.model,
            messages: self.convert_messages(messages),
            tools: self.convert_tools(tools),
            stream: false,
        };

        let mut builder = self.client.post(self.build_url()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Llm(format!("Ollama request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("Ollama API error ({status}): {error_text}")));
        }

        let body: ChatResponse = response.json().await?;
        let parsed = self.parse_response(body);
        tracing::debug!(
            tool_calls = parsed.tool_calls.len(),
            prompt_tokens = parsed.usage.prompt_tokens,
            completion_tokens = parsed.usage.completion_tokens,
            "Ollama response"
        );
        Ok(parsed)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
