//! Adapts [`LlmServiceProfiles`] to [`rag_store::embed::EmbeddingsProvider`]
//! so `rag-base`'s feedback processor can embed `final_code_snapshot` without
//! knowing about ai-llm-service's client types. Shaped like
//! `rag_store::embed::ollama::OllamaEmbedder`'s boxed-future impl.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ai_llm_service::service_profiles::LlmServiceProfiles;
use rag_store::RagError;
use rag_store::embed::EmbeddingsProvider;

pub struct LlmServiceEmbedder {
    profiles: Arc<LlmServiceProfiles>,
}

impl LlmServiceEmbedder {
    pub fn new(profiles: Arc<LlmServiceProfiles>) -> Self {
        Self { profiles }
    }
}

impl EmbeddingsProvider for LlmServiceEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(async move {
            self.profiles
                .embed(text)
                .await
                .map_err(|e| RagError::Provider(e.to_string()))
        })
    }
}
