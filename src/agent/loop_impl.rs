//! Agent loop - alternates model turns and tool execution

use std::sync::Arc;
use serde_json::json;
use tracing::{debug, info, warn};
use crate::Result;
use crate::error::Error;
use crate::tools::ToolRegistry;
use super::llm::LlmClient;
use super::message::{Conversation, Message, ToolCallRequest};

/// The agent loop processes a prompt through the LLM and tool execution
pub struct AgentLoop<C: LlmClient> {
    client: C,
    registry: Arc<ToolRegistry>,
    max_iterations: usize,
    system_prompt: Option<String>,
}

impl<C: LlmClient> AgentLoop<C> {
    /// Create a new agent loop
    pub fn new(client: C, registry: Arc<ToolRegistry>, max_iterations: usize) -> Self {
        Self {
            client,
            registry,
            max_iterations,
            system_prompt: None,
        }
    }

    /// Seed every conversation with a system instruction
    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt.filter(|s| !s.trim().is_empty());
        self
    }

    /// Run until the model answers without requesting tools
    pub async fn run(&self, prompt: &str) -> Result<Conversation> {
        let mut transcript = Vec::new();
        if let Some(system) = &self.system_prompt {
            transcript.push(Message::system(system.clone()));
        }
        transcript.push(Message::user(prompt));

        info!(model = self.client.model(), "Starting agent loop");
        let tools = self.registry.definitions();

        for iteration in 0..self.max_iterations {
            debug!("Iteration {}/{}", iteration + 1, self.max_iterations);

            let response = self.client.chat(&transcript, &tools).await?;
            let content = response.content.clone().unwrap_or_default();
            debug!(finish_reason = %response.finish_reason, "Model turn finished");

            if !response.has_tool_calls() {
                info!("Agent completed with response: {} chars", content.len());
                transcript.push(Message::assistant(content.clone()));
                return Ok(Conversation {
                    answer: content,
                    transcript,
                });
            }

            transcript.push(Message::assistant_with_tools(content, response.tool_calls.clone()));

            for tool_call in &response.tool_calls {
                let result = self.execute_tool(tool_call).await;
                transcript.push(Message::tool_result(tool_call, result));
            }
        }

        Err(Error::MaxIterations(self.max_iterations))
    }

    async fn execute_tool(&self, tool_call: &ToolCallRequest) -> String {
        debug!("Executing tool: {} with args: {}", tool_call.name, tool_call.arguments);

        match self.registry.dispatch(&tool_call.name, tool_call.arguments.clone()).await {
            Ok(result) => {
                debug!("Tool {} succeeded", tool_call.name);
                result.to_string()
            }
            Err(e) => {
                warn!("Tool {} failed: {}", tool_call.name, e);
                json!({ "error": e.to_string() }).to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::{FakeLlmClient, LlmResponse};
    use crate::agent::message::Role;
    use crate::tools::spotify::fake::FakeSpotify;
    use crate::tools::{spotify, DummyTool, ToolModule};
    use serde_json::{json, Value};

    fn dummy_registry() -> Arc<ToolRegistry> {
        Arc::new(
            ToolRegistry::compose([ToolModule::new("test")
                .with_tool(DummyTool { name: "first".to_string(), result: json!({"n": 1}) })
                .with_tool(DummyTool { name: "second".to_string(), result: json!({"n": 2}) })])
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_agent_loop_simple() {
        let client = FakeLlmClient::new(vec!["Hello, human!"]);
        let agent = AgentLoop::new(client, dummy_registry(), 10);

        let conversation = agent.run("Hi there").await.unwrap();

        assert_eq!(conversation.answer, "Hello, human!");
        assert_eq!(conversation.transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_tool_calls_run_in_order() {
        let client = FakeLlmClient::scripted(vec![
            LlmResponse::tool_calls(vec![
                ToolCallRequest::new("call_0", "first", json!({})),
                ToolCallRequest::new("call_1", "second", json!({})),
            ]),
            LlmResponse::text("done"),
        ]);
        let agent = AgentLoop::new(client, dummy_registry(), 10);

        let conversation = agent.run("go").await.unwrap();
        let roles: Vec<Role> = conversation.transcript.iter().map(|m| m.role.clone()).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Tool, Role::Assistant]);

        let first = &conversation.transcript[2];
        assert_eq!(first.tool_name.as_deref(), Some("first"));
        assert_eq!(first.content, r#"{"n":1}"#);
        let second = &conversation.transcript[3];
        assert_eq!(second.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(second.content, r#"{"n":2}"#);
    }

    #[tokio::test]
    async fn test_unknown_tool_continues_loop() {
        let client = FakeLlmClient::with_tool_call("launch_rocket", json!({}), "I can't do that.");
        let agent = AgentLoop::new(client, dummy_registry(), 10);

        let conversation = agent.run("launch").await.unwrap();
        assert_eq!(conversation.answer, "I can't do that.");

        let tool_message = &conversation.transcript[2];
        let payload: Value = serde_json::from_str(&tool_message.content).unwrap();
        assert_eq!(payload["error"], "No handler registered for tool launch_rocket");
    }

    #[tokio::test]
    async fn test_pause_scenario() {
        let fake = Arc::new(FakeSpotify::default());
        let registry = Arc::new(ToolRegistry::compose([spotify::module(fake.clone())]).unwrap());
        let client = FakeLlmClient::with_tool_call("pause_spotify_playback", json!({}), "Paused.");
        let agent = AgentLoop::new(client, registry, 10).with_system_prompt(Some("Only Spotify.".to_string()));

        let conversation = agent.run("pause the music").await.unwrap();

        assert_eq!(conversation.answer, "Paused.");
        assert_eq!(conversation.transcript[0].role, Role::System);
        let result: Value = serde_json::from_str(&conversation.transcript[3].content).unwrap();
        assert_eq!(result["status"], "paused");
        assert!(result.get("deviceId").is_none());
        assert_eq!(fake.calls(), vec!["pause None"]);
    }

    #[tokio::test]
    async fn test_model_sees_tool_results() {
        let client = FakeLlmClient::with_tool_call("first", json!({}), "ok");
        let agent = AgentLoop::new(client, dummy_registry(), 10);

        agent.run("go").await.unwrap();
        let seen = agent.client.seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].len(), 1);
        assert_eq!(seen[1].last().map(|m| m.role.clone()), Some(Role::Tool));
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let looping: Vec<LlmResponse> = (0..5)
            .map(|i| LlmResponse::tool_calls(vec![ToolCallRequest::new(format!("call_{i}"), "first", json!({}))]))
            .collect();
        let agent = AgentLoop::new(FakeLlmClient::scripted(looping), dummy_registry(), 3);

        let err = agent.run("spin").await.unwrap_err();
        assert!(matches!(err, Error::MaxIterations(3)));
    }
}
