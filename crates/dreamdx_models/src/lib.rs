//! Remote text generator clients for DreamDX.
//!
//! Provides [`OpenAICompatibleClient`], a [`NarrativeDriver`] for any
//! provider that speaks the OpenAI chat-completions format.
//!
//! [`NarrativeDriver`]: dreamdx_interface::NarrativeDriver

mod openai_compat;

pub use openai_compat::{
    ChatChoice, ChatMessage, ChatRequest, ChatRequestBuilder, ChatResponse, ChatUsage,
    DEFAULT_CHAT_COMPLETIONS_URL, DEFAULT_MODEL, OpenAICompatibleClient,
};
