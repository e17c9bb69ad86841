//! Typed error for the contextor crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// Errors from the underlying rag-store crate.
    #[error("RAG error: {0}")]
    Rag(#[from] rag_store::RagError),

    /// Errors from the embedding/generation layer.
    #[error("LLM service error: {0}")]
    Llm(#[from] ai_llm_service::error_handler::AiLlmError),
}

pub type Result<T> = std::result::Result<T, ContextorError>;
