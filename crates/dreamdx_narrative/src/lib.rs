//! Dream narrative service.
//!
//! [`NarrativeService`] turns dream commands into prompts, asks a
//! [`NarrativeDriver`](dreamdx_interface::NarrativeDriver) for text and keeps
//! the growing story in a [`NarrativeStore`](dreamdx_interface::NarrativeStore).

mod prompts;
mod service;

pub use prompts::{
    CONTINUATION_PROMPT_TEMPLATE, INITIAL_PROMPT_TEMPLATE, NarrativePrompts, OPENING_PREFIX,
};
pub use service::{DeleteMode, GenerationSettings, NarrativeService, WAKE_UP_MESSAGE};
