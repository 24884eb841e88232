//! Prompt templates for opening and continuing a dream.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Template for the opening scene. `{context}` is replaced by the seed text.
pub const INITIAL_PROMPT_TEMPLATE: &str = "
Based on the following context, generate a descriptive environment for the beginning of a narrative:
{context}

Remember:
- Address the reader directly as the protagonist, making them feel like they're experiencing it firsthand.
- Use simple, conversational language, as if narrating a dream to a friend.
- Keep the story concise, use no more than 100 words.
---

Description:
";

/// Instructions appended after the story so far and the user's action.
pub const CONTINUATION_PROMPT_TEMPLATE: &str = "
Continue the narrative focusing on the immediate next action and the current scene.
- Keep the narrative short but informative about the scene, no more than 100 words.
- Avoid using concluding phrases or wrapping up the story
- Be creative and imaginative. Feel free to introduce new elements and unexpected twists
- Avoid controlling the user actions, just control the setup or character.
- Introduce new elements and unexpected twists to make the narrative more engaging.
";

/// Framing put around the first generated description.
pub const OPENING_PREFIX: &str = "You open your eyes, this is the first thing that you see...\n\n";

/// Placeholder substituted in the initial template.
const CONTEXT_PLACEHOLDER: &str = "{context}";

/// The templates used to talk to the generator.
///
/// # Examples
///
/// ```
/// use dreamdx_narrative::NarrativePrompts;
///
/// let prompts = NarrativePrompts::default();
/// let prompt = prompts.continuation(&["A forest.", "A river."], "swim");
/// assert!(prompt.starts_with("A forest. A river.\nUser action: swim\n\n"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct NarrativePrompts {
    /// Opening template containing `{context}`
    initial_template: String,
    /// Continuation instructions
    continuation_template: String,
    /// Prefix of the stored opening description
    opening_prefix: String,
}

impl Default for NarrativePrompts {
    fn default() -> Self {
        Self {
            initial_template: INITIAL_PROMPT_TEMPLATE.to_string(),
            continuation_template: CONTINUATION_PROMPT_TEMPLATE.to_string(),
            opening_prefix: OPENING_PREFIX.to_string(),
        }
    }
}

impl NarrativePrompts {
    /// Prompt for the opening scene.
    pub fn initial(&self, seed: &str) -> String {
        self.initial_template.replace(CONTEXT_PLACEHOLDER, seed)
    }

    /// Prompt for the next scene given every prior description.
    pub fn continuation(&self, descriptions: &[&str], action: &str) -> String {
        format!(
            "{}\nUser action: {}\n\n{}",
            descriptions.join(" "),
            action,
            self.continuation_template
        )
    }

    /// Stored form of the first generated description.
    pub fn frame_opening(&self, description: &str) -> String {
        format!("{}{}\n", self.opening_prefix, description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_prompt_embeds_seed() {
        let prompt = NarrativePrompts::default().initial("a foggy harbour");
        assert!(prompt.contains("beginning of a narrative:\na foggy harbour\n"));
        assert!(!prompt.contains(CONTEXT_PLACEHOLDER));
    }

    #[test]
    fn test_opening_is_framed() {
        let framed = NarrativePrompts::default().frame_opening("Gulls circle.");
        assert_eq!(
            framed,
            "You open your eyes, this is the first thing that you see...\n\nGulls circle.\n"
        );
    }

    #[test]
    fn test_continuation_ends_with_instructions() {
        let prompt = NarrativePrompts::default().continuation(&["One."], "run");
        assert!(prompt.ends_with(CONTINUATION_PROMPT_TEMPLATE));
    }
}
