//! Process-wide configuration, loaded once from the environment at startup.
//!
//! Follows the `must_env`/`env_opt_*` idiom from `ai_llm_service::error_handler`:
//! every knob is read strictly from env vars, with typed errors rather than
//! panics, so a misconfigured deployment fails fast at boot with a clear
//! message instead of later inside a handler.

use std::path::PathBuf;

use ai_llm_service::config::default_config;
use ai_llm_service::config::llm_model_config::LlmModelConfig;
use mr_reviewer::git_providers::ProviderConfig;
use mr_reviewer::review::llm::LlmConfig;
use rag_base::ConstraintConfig;
use rag_store::RagConfig;
use services::domain::Platform;
use task_queue::TaskQueueConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid number in {var}: {reason}")]
    InvalidNumber { var: &'static str, reason: &'static str },

    #[error("no git provider configured: set GITHUB_BASE_API/GITHUB_TOKEN or GITEA_BASE_API/GITEA_TOKEN")]
    NoProviderConfigured,

    #[error("ai-llm-service config error: {0}")]
    Llm(#[from] ai_llm_service::error_handler::AiLlmError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Immutable application configuration, built once in [`AppConfig::from_env`]
/// and shared behind an `Arc` by [`crate::core::app_state::AppState`].
pub struct AppConfig {
    pub bind_addr: String,
    pub github: Option<ProviderConfig>,
    pub gitea: Option<ProviderConfig>,
    pub llm: LlmConfig,
    /// `None` disables RAG-backed related context and review suppression
    /// retrieval entirely (degradation controller treats the store as down).
    pub rag: Option<RagConfig>,
    pub constraints: Option<ConstraintConfig>,
    pub feedback_log_dir: PathBuf,
    pub task_queue: TaskQueueConfig,
    pub degradation_poll_interval_secs: u64,
    pub constraint_sweep_interval_secs: u64,
    pub metrics_aggregation_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_or("BIND_ADDR", "0.0.0.0:8080");

        let github = provider_from_env(Platform::Github, "GITHUB")?;
        let gitea = provider_from_env(Platform::Gitea, "GITEA")?;
        if github.is_none() && gitea.is_none() {
            return Err(ConfigError::NoProviderConfigured);
        }

        let llm = LlmConfig {
            fast: default_config::config_ollama_fast()?,
            slow: default_config::config_ollama_slow().ok(),
            embedding: default_config::config_ollama_embedding()?,
            health_timeout_secs: env_opt_u64("LLM_HEALTH_TIMEOUT_SECS")?,
        };

        let rag = match RagConfig::from_env() {
            Ok(cfg) => Some(cfg),
            Err(_) => None,
        };

        let constraints = match ConstraintConfig::from_env() {
            Ok(cfg) => Some(cfg),
            Err(_) => None,
        };

        let feedback_log_dir = PathBuf::from(env_or("FEEDBACK_LOG_DIR", "data/feedback"));

        Ok(Self {
            bind_addr,
            github,
            gitea,
            llm,
            rag,
            constraints,
            feedback_log_dir,
            task_queue: TaskQueueConfig::from_env(),
            degradation_poll_interval_secs: env_u64_or("DEGRADATION_POLL_INTERVAL_SECS", 60),
            constraint_sweep_interval_secs: env_u64_or("CONSTRAINT_SWEEP_INTERVAL_SECS", 86_400),
            metrics_aggregation_interval_secs: env_u64_or("METRICS_AGGREGATION_INTERVAL_SECS", 60),
        })
    }

    /// Picks an embedding-capable model config reachable without a live
    /// review, used by standalone stages (e.g. the indexer's embed step).
    pub fn embedding_model(&self) -> &LlmModelConfig {
        &self.llm.embedding
    }
}

fn provider_from_env(platform: Platform, prefix: &'static str) -> Result<Option<ProviderConfig>> {
    let base_api_key: &'static str = match prefix {
        "GITHUB" => "GITHUB_BASE_API",
        _ => "GITEA_BASE_API",
    };
    let token_key: &'static str = match prefix {
        "GITHUB" => "GITHUB_TOKEN",
        _ => "GITEA_TOKEN",
    };
    let secret_key: &'static str = match prefix {
        "GITHUB" => "GITHUB_WEBHOOK_SECRET",
        _ => "GITEA_WEBHOOK_SECRET",
    };
    let verify_key: &'static str = match prefix {
        "GITHUB" => "GITHUB_VERIFY_SIGNATURES",
        _ => "GITEA_VERIFY_SIGNATURES",
    };

    let Some(base_api) = std::env::var(base_api_key).ok().filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    let token = std::env::var(token_key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .ok_or(ConfigError::MissingVar(token_key))?;
    let webhook_secret = std::env::var(secret_key).ok().filter(|s| !s.trim().is_empty());
    let verify_signatures = std::env::var(verify_key)
        .ok()
        .map(|s| s.eq_ignore_ascii_case("true"))
        .unwrap_or(webhook_secret.is_some());

    Ok(Some(ProviderConfig {
        platform,
        base_api,
        token,
        webhook_secret,
        verify_signatures,
    }))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_u64_or(key: &'static str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_opt_u64(key: &'static str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var: key, reason: "expected u64" }),
        _ => Ok(None),
    }
}
