//! Agent system for answering data-dependent questions with tool calling.
//!
//! Provides an LLM agent that can query cancer genomics and preprint-search
//! tools before committing to an answer letter.

mod runner;
mod tools;

pub use runner::{Agent, AgentResponse, ToolCallRecord};
pub use tools::{parse_tool_call, ToolCall, ToolContext};
