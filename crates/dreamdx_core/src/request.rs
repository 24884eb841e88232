//! Request and response types for text generation.

use crate::Role;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// A single chat message sent to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Message {
    /// The role of the message sender
    role: Role,
    /// The text of the message
    content: String,
}

impl Message {
    /// Creates a new message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Generation request.
///
/// # Examples
///
/// ```
/// use dreamdx_core::{GenerateRequest, Role};
///
/// let request = GenerateRequest::from_prompt("Describe a forest");
/// assert_eq!(request.messages().len(), 1);
/// assert_eq!(*request.messages()[0].role(), Role::User);
/// ```
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Default, Getters, derive_builder::Builder,
)]
#[builder(setter(into), default)]
pub struct GenerateRequest {
    /// Conversation messages
    messages: Vec<Message>,
    /// Maximum tokens to generate
    max_tokens: Option<u32>,
    /// Sampling temperature
    temperature: Option<f32>,
    /// Model override
    model: Option<String>,
}

impl GenerateRequest {
    /// Returns a builder for constructing a GenerateRequest.
    pub fn builder() -> GenerateRequestBuilder {
        GenerateRequestBuilder::default()
    }

    /// Request holding a single user prompt.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::new(Role::User, prompt)],
            ..Self::default()
        }
    }

    /// Concatenated text of the user messages.
    pub fn prompt_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct GenerateResponse {
    /// Generated text, already trimmed
    text: String,
    /// Provider's finish reason, when reported
    finish_reason: Option<String>,
}

impl GenerateResponse {
    /// Creates a response.
    pub fn new(text: impl Into<String>, finish_reason: Option<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason,
        }
    }
}
