//! Conversions between DreamDX and OpenAI chat formats.

use crate::openai_compat::{ChatMessage, ChatRequest, ChatResponse};
use dreamdx_core::{GenerateRequest, GenerateResponse};
use dreamdx_error::{GenerationError, GenerationErrorKind};

/// Converts a GenerateRequest to OpenAI chat format.
///
/// A model set on the request overrides the client's default.
pub fn to_chat_request(
    req: &GenerateRequest,
    default_model: &str,
) -> Result<ChatRequest, GenerationError> {
    let messages: Vec<ChatMessage> = req
        .messages()
        .iter()
        .map(|msg| ChatMessage {
            role: msg.role().to_string(),
            content: msg.content().clone(),
        })
        .collect();

    if messages.is_empty() {
        return Err(GenerationError::new(GenerationErrorKind::Builder(
            "Request has no messages".to_string(),
        )));
    }

    let model = req
        .model()
        .clone()
        .unwrap_or_else(|| default_model.to_string());

    let mut builder = ChatRequest::builder();
    builder.model(model).messages(messages);

    if let Some(max_tokens) = req.max_tokens() {
        builder.max_tokens(*max_tokens);
    }

    if let Some(temp) = req.temperature() {
        builder.temperature(*temp);
    }

    builder.build().map_err(|e| {
        GenerationError::new(GenerationErrorKind::Builder(format!(
            "Failed to build request: {}",
            e
        )))
    })
}

/// Converts an OpenAI chat response to a GenerateResponse.
///
/// The first choice is used and its content trimmed; blank content is an
/// `EmptyResponse`.
pub fn from_chat_response(response: &ChatResponse) -> Result<GenerateResponse, GenerationError> {
    let choice = response.choices.first().ok_or_else(|| {
        GenerationError::new(GenerationErrorKind::ResponseParsing(
            "No choices in response".to_string(),
        ))
    })?;

    let text = choice.message.content.trim();
    if text.is_empty() {
        return Err(GenerationError::new(GenerationErrorKind::EmptyResponse));
    }

    Ok(GenerateResponse::new(text, choice.finish_reason.clone()))
}
