//! Shared fixtures for narrative service tests.

use async_trait::async_trait;
use dreamdx_core::{GenerateRequest, GenerateResponse};
use dreamdx_error::{GenerationError, GenerationErrorKind};
use dreamdx_interface::NarrativeDriver;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Driver that replays scripted replies and records every prompt it receives.
///
/// Once the script runs out it answers `Scene N` where N counts calls from 1.
#[derive(Default)]
pub struct ScriptedDriver {
    script: Mutex<VecDeque<Result<String, GenerationErrorKind>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, text: &str) -> Self {
        self.script.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    /// Queue a failure.
    pub fn fail(self, kind: GenerationErrorKind) -> Self {
        self.script.lock().unwrap().push_back(Err(kind));
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl NarrativeDriver for ScriptedDriver {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, GenerationError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(req.prompt_text());
            prompts.len()
        };

        match self.script.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(GenerateResponse::new(text, Some("stop".to_string()))),
            Some(Err(kind)) => Err(GenerationError::new(kind)),
            None => Ok(GenerateResponse::new(format!("Scene {}", call), None)),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-v1"
    }
}
