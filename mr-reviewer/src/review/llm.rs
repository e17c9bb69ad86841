//! LLM access for the review pipeline.
//!
//! Thin wrapper around [`ai_llm_service::service_profiles::LlmServiceProfiles`]
//! so the rest of `review` only has to know about fast/slow generation and
//! doesn't have to reach into provider-specific client types.

use std::sync::Arc;

use super::prompt::Prompt;
use crate::errors::MrResult;
use ai_llm_service::config::llm_model_config::LlmModelConfig;
use ai_llm_service::service_profiles::{GenerationOutcome, LlmServiceProfiles};

/// Config for the review LLM router: fast model, optional slow model for
/// escalation, and an embedding model used by retrieval.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub fast: LlmModelConfig,
    pub slow: Option<LlmModelConfig>,
    pub embedding: LlmModelConfig,
    /// Timeout used for the one-shot health probe at startup.
    pub health_timeout_secs: Option<u64>,
}

/// Enum-dispatch-free façade: owns a [`LlmServiceProfiles`] and exposes the
/// two calls the review pipeline needs.
pub struct LlmClient {
    profiles: Arc<LlmServiceProfiles>,
}

impl LlmClient {
    /// Builds the underlying provider clients from config.
    pub fn from_config(cfg: LlmConfig) -> MrResult<Self> {
        let profiles = LlmServiceProfiles::new(
            cfg.fast,
            cfg.slow,
            cfg.embedding,
            cfg.health_timeout_secs,
        )?;
        Ok(Self {
            profiles: Arc::new(profiles),
        })
    }

    /// Returns a clone of the shared profile handle, for callers (like the
    /// RAG retrieval step) that need their own reference to it.
    pub fn profiles(&self) -> Arc<LlmServiceProfiles> {
        self.profiles.clone()
    }

    /// Generates a completion using the fast model. Returns the text along
    /// with the provider-reported token count for the call.
    pub async fn generate(&self, prompt: &Prompt) -> MrResult<GenerationOutcome> {
        self.profiles
            .generate_fast(&prompt.user, Some(&prompt.system))
            .await
            .map_err(Into::into)
    }

    /// Generates a completion using the slow model, if one was configured,
    /// falling back to the fast model otherwise.
    pub async fn generate_slow(&self, prompt: &Prompt) -> MrResult<GenerationOutcome> {
        self.profiles
            .generate_slow(&prompt.user, Some(&prompt.system))
            .await
            .map_err(Into::into)
    }

    /// Embeds a snippet of text for retrieval.
    pub async fn embed(&self, text: &str) -> MrResult<Vec<f32>> {
        self.profiles.embed(text).await.map_err(Into::into)
    }
}
