//! The narrative service: one generation and one write per turn.

use crate::NarrativePrompts;
use chrono::Utc;
use derive_getters::Getters;
use derive_setters::Setters;
use dreamdx_core::{
    Acknowledgement, DreamCommand, DreamReply, GenerateRequest, NarrativeDocument, NarrativeKey,
    NarrativeRecord, RequestContext, record_operation,
};
use dreamdx_error::{DreamResult, GenerationError, GenerationErrorKind, NarrativeError, NarrativeErrorKind};
use dreamdx_interface::{NarrativeDriver, NarrativeStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Acknowledgement returned by `wake up`.
pub const WAKE_UP_MESSAGE: &str = "You woke up.";

/// How `delete narrative` removes a record.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeleteMode {
    /// Remove the record from the store
    #[default]
    Hard,
    /// Keep the record with its deleted flag set
    Soft,
}

/// Sampling options sent with every generation request.
#[derive(Debug, Clone, Default, PartialEq, Getters, Setters)]
#[setters(prefix = "with_", strip_option)]
pub struct GenerationSettings {
    /// Model override
    model: Option<String>,
    /// Maximum tokens to generate
    max_tokens: Option<u32>,
    /// Sampling temperature
    temperature: Option<f32>,
}

/// Runs dream commands against a generator and a store.
///
/// Holds no per-user state; everything about a dream lives in the store and
/// each call receives its [`RequestContext`] explicitly.
pub struct NarrativeService {
    driver: Arc<dyn NarrativeDriver>,
    store: Arc<dyn NarrativeStore>,
    prompts: NarrativePrompts,
    settings: GenerationSettings,
    delete_mode: DeleteMode,
}

impl std::fmt::Debug for NarrativeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeService")
            .field("provider", &self.driver.provider_name())
            .field("model", &self.driver.model_name())
            .field("delete_mode", &self.delete_mode)
            .finish()
    }
}

impl NarrativeService {
    /// Create a service with default prompts, settings and hard delete.
    pub fn new(driver: Arc<dyn NarrativeDriver>, store: Arc<dyn NarrativeStore>) -> Self {
        Self {
            driver,
            store,
            prompts: NarrativePrompts::default(),
            settings: GenerationSettings::default(),
            delete_mode: DeleteMode::default(),
        }
    }

    /// Replace the prompt templates.
    pub fn with_prompts(mut self, prompts: NarrativePrompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Replace the generation settings.
    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Choose how deletes behave.
    pub fn with_delete_mode(mut self, delete_mode: DeleteMode) -> Self {
        self.delete_mode = delete_mode;
        self
    }

    /// Configured delete behaviour.
    pub fn delete_mode(&self) -> DeleteMode {
        self.delete_mode
    }

    /// Start a dream from seed text.
    ///
    /// # Errors
    ///
    /// - `MalformedRequest` for a blank user, session or seed
    /// - `DuplicateSession` when an active narrative already uses the key
    /// - generation or storage failures
    #[instrument(skip_all, fields(request_id = %ctx.request_id(), key = %key))]
    pub async fn start(
        &self,
        ctx: &RequestContext,
        key: &NarrativeKey,
        seed: &str,
    ) -> DreamResult<NarrativeRecord> {
        validate_key(key)?;
        require_text(seed, "dream_description")?;

        if let Some(existing) = self.store.get(key).await?
            && existing.is_active()
        {
            warn!("Narrative already exists");
            return Err(NarrativeError::new(NarrativeErrorKind::DuplicateSession {
                user_id: key.user_id.clone(),
                session_id: key.session_id.clone(),
            })
            .into());
        }

        let prompt = self.prompts.initial(seed);
        let description = self.generate(&prompt).await?;
        let record = NarrativeRecord::begin(
            key,
            prompt,
            self.prompts.frame_opening(&description),
            Utc::now(),
        );

        self.store.put(&record).await?;
        info!("Narrative started");
        Ok(record)
    }

    /// Add the dreamer's action and narrate what happens next.
    ///
    /// # Errors
    ///
    /// - `MalformedRequest` for a blank user, session or action
    /// - `SessionNotFound` when no active narrative uses the key
    /// - generation or storage failures
    #[instrument(skip_all, fields(request_id = %ctx.request_id(), key = %key))]
    pub async fn continue_narrative(
        &self,
        ctx: &RequestContext,
        key: &NarrativeKey,
        action: &str,
    ) -> DreamResult<NarrativeRecord> {
        validate_key(key)?;
        require_text(action, "user_action")?;

        let mut record = self.active(key).await?;
        let prompt = self.prompts.continuation(&record.descriptions(), action);
        let description = self.generate(&prompt).await?;

        record.append_turn(action, prompt, description, Utc::now());
        self.store.put(&record).await?;

        debug!(entries = record.entries().len(), "Narrative continued");
        Ok(record)
    }

    /// Acknowledge the end of a dream. Touches neither generator nor store.
    pub fn wake_up(&self, ctx: &RequestContext) -> Acknowledgement {
        debug!(request_id = %ctx.request_id(), "Wake up");
        Acknowledgement::new(WAKE_UP_MESSAGE)
    }

    /// Active narratives of a user ordered by session id.
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id()))]
    pub async fn list(
        &self,
        ctx: &RequestContext,
        user_id: &str,
    ) -> DreamResult<Vec<NarrativeRecord>> {
        require_text(user_id, "user_id")?;

        let mut records: Vec<NarrativeRecord> = self
            .store
            .list(user_id)
            .await?
            .into_iter()
            .filter(NarrativeRecord::is_active)
            .collect();
        records.sort_by(|a, b| a.session_id().cmp(b.session_id()));

        debug!(count = records.len(), "Listed narratives");
        Ok(records)
    }

    /// Delete a narrative according to the configured [`DeleteMode`].
    ///
    /// # Errors
    ///
    /// `SessionNotFound` when nothing (or, in soft mode, nothing active) is
    /// stored under the key.
    #[instrument(skip_all, fields(request_id = %ctx.request_id(), key = %key, mode = %self.delete_mode))]
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        key: &NarrativeKey,
    ) -> DreamResult<Acknowledgement> {
        validate_key(key)?;

        match self.delete_mode {
            DeleteMode::Hard => {
                if !self.store.delete(key).await? {
                    return Err(not_found(key).into());
                }
            }
            DeleteMode::Soft => {
                let mut record = self.active(key).await?;
                record.mark_deleted(Utc::now());
                self.store.put(&record).await?;
            }
        }

        info!("Narrative deleted");
        Ok(Acknowledgement::new(format!(
            "Successfully deleted narrative session {} for user {}",
            key.session_id, key.user_id
        )))
    }

    /// Fetch one active narrative.
    #[instrument(skip_all, fields(request_id = %ctx.request_id(), key = %key))]
    pub async fn get(
        &self,
        ctx: &RequestContext,
        key: &NarrativeKey,
    ) -> DreamResult<NarrativeRecord> {
        validate_key(key)?;
        self.active(key).await
    }

    /// Run a parsed command and shape its result for the wire.
    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        command: DreamCommand,
    ) -> DreamResult<DreamReply> {
        let label = command.command().endpoint();

        let result: DreamResult<DreamReply> = match command {
            DreamCommand::Start { key, seed } => self
                .start(ctx, &key, &seed)
                .await
                .map(|r| NarrativeDocument::from(r).into()),
            DreamCommand::Continue { key, action } => self
                .continue_narrative(ctx, &key, &action)
                .await
                .map(|r| NarrativeDocument::from(r).into()),
            DreamCommand::WakeUp => Ok(self.wake_up(ctx).into()),
            DreamCommand::List { user_id } => self.list(ctx, &user_id).await.map(|records| {
                records
                    .into_iter()
                    .map(NarrativeDocument::from)
                    .collect::<Vec<_>>()
                    .into()
            }),
            DreamCommand::Delete { key } => self.delete(ctx, &key).await.map(DreamReply::from),
            DreamCommand::GetContent { key } => self
                .get(ctx, &key)
                .await
                .map(|r| NarrativeDocument::from(r).into()),
        };

        match &result {
            Ok(_) => record_operation(label, "ok"),
            Err(e) => {
                warn!(request_id = %ctx.request_id(), command = label, error = %e, "Command failed");
                record_operation(label, "error");
            }
        }
        result
    }

    async fn active(&self, key: &NarrativeKey) -> DreamResult<NarrativeRecord> {
        match self.store.get(key).await? {
            Some(record) if record.is_active() => Ok(record),
            _ => Err(not_found(key).into()),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut builder = GenerateRequest::builder();
        builder
            .messages(GenerateRequest::from_prompt(prompt).messages().clone())
            .model(self.settings.model.clone())
            .max_tokens(self.settings.max_tokens)
            .temperature(self.settings.temperature);
        let request = builder
            .build()
            .map_err(|e| GenerationError::new(GenerationErrorKind::Builder(e.to_string())))?;

        debug!(
            provider = self.driver.provider_name(),
            model = self.driver.model_name(),
            prompt_len = prompt.len(),
            "Requesting generation"
        );

        let text = self.driver.generate(&request).await?.text().trim().to_string();
        if text.is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::EmptyResponse));
        }
        Ok(text)
    }
}

fn not_found(key: &NarrativeKey) -> NarrativeError {
    NarrativeError::new(NarrativeErrorKind::SessionNotFound {
        user_id: key.user_id.clone(),
        session_id: key.session_id.clone(),
    })
}

#[track_caller]
fn require_text(value: &str, field: &str) -> Result<(), NarrativeError> {
    if value.trim().is_empty() {
        return Err(NarrativeError::malformed(format!("{} must not be blank", field)));
    }
    Ok(())
}

#[track_caller]
fn validate_key(key: &NarrativeKey) -> Result<(), NarrativeError> {
    require_text(&key.user_id, "user_id")?;
    require_text(&key.session_id, "session_id")
}
