use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("clone error: {0}")]
    Clone(#[from] project_code_store::errors::GitCloneError),

    #[error("background task error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("knowledge store error: {0}")]
    Store(#[from] rag_store::RagError),
}

pub type Result<T> = std::result::Result<T, Error>;
