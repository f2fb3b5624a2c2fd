//! Nutrition assistant
//!
//! A chat model that answers questions about the diary, calling back into
//! local data through a small set of read-only tools.

pub mod client;
pub mod session;
pub mod tools;

pub use client::{AnthropicClient, AssistantError, ChatBackend, ChatReply, ContentBlock, Message, Role};
pub use session::{ChatOutcome, ChatSession, ToolCallRecord, MAX_TOOL_ROUNDS};
pub use tools::AssistantTools;
