//! Generic OpenAI-compatible API client.
//!
//! Works with any API that follows the OpenAI chat completions format.

mod client;
mod conversions;
mod dto;

pub use client::{DEFAULT_CHAT_COMPLETIONS_URL, DEFAULT_MODEL, OpenAICompatibleClient};
pub use dto::{ChatChoice, ChatMessage, ChatRequest, ChatRequestBuilder, ChatResponse, ChatUsage};
