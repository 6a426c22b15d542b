//! Agent module - core agent logic.
//!
//! This module contains:
//! - Message types (Message, ToolCallRequest, Conversation)
//! - LLM client trait and the Ollama implementation
//! - Agent loop alternating model turns and tool calls

mod loop_impl;
mod message;

// LLM providers in submodule
pub mod llm;

// Re-exports for convenience
pub use llm::{LlmClient, LlmResponse, OllamaClient, Usage, DEFAULT_OLLAMA_HOST};
pub use loop_impl::AgentLoop;
pub use message::{Conversation, Message, Role, ToolCallRequest};
