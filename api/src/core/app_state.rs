//! Process-wide shared state, built once in [`crate::build_state`] from
//! [`AppConfig`] and handed to every route handler via axum's `State`.

use std::collections::HashMap;
use std::sync::Arc;

use ai_llm_service::service_profiles::LlmServiceProfiles;
use git_context_engine::Orchestrator;
use metrics_exporter_prometheus::PrometheusHandle;
use mr_reviewer::git_providers::ProviderConfig;
use mr_reviewer::review::RagContext;
use mr_reviewer::review::llm::LlmClient;
use rag_base::{ConstraintStore, FeedbackLog};
use rag_store::knowledge::KnowledgeStore;
use serde::{Deserialize, Serialize};
use services::domain::{FeedbackRequest, PrMetadata, ReviewConfig, ReviewTask, TaskRecord};
use task_queue::{Broker, ResultBackend};

use crate::core::config::AppConfig;
use crate::core::llm_embedder::LlmServiceEmbedder;
use crate::degradation::DegradationController;

/// Everything a worker needs to run one unit of work. One variant per named
/// queue (`code_review`, `indexing`, `feedback`); `default` carries nothing
/// today and is left unrouted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskPayload {
    CodeReview {
        metadata: PrMetadata,
        config: ReviewConfig,
    },
    Indexing {
        repo_id: String,
        git_url: String,
        access_token: String,
        branch: Option<String>,
        index_depth: Option<u32>,
    },
    Feedback {
        request: FeedbackRequest,
        repo_id: String,
        violation_reason: String,
    },
}

impl TaskPayload {
    pub fn queue_name(&self) -> &'static str {
        match self {
            TaskPayload::CodeReview { .. } => "code_review",
            TaskPayload::Indexing { .. } => "indexing",
            TaskPayload::Feedback { .. } => "feedback",
        }
    }
}

/// `FeedbackRequest` carries no `repo_id`/`violation_reason`; both are
/// resolved from the review that produced the comment being acted on. The
/// worker populates one entry here per completed `code_review` task, keyed
/// by `review_id`, and `/feedback` consults it before enqueuing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReviewIndexEntry {
    pub repo_id: String,
    /// `comment_id -> message`, used as the suppression fingerprint source.
    pub violation_reasons: HashMap<String, String>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub broker: Arc<Broker<TaskPayload>>,
    pub review_results: ResultBackend<ReviewTask>,
    pub task_results: ResultBackend<TaskRecord>,
    pub review_index: ResultBackend<ReviewIndexEntry>,
    pub orchestrator: Arc<Orchestrator>,
    pub llm_profiles: Arc<LlmServiceProfiles>,
    pub constraints: Option<Arc<ConstraintStore>>,
    pub feedback_log: Option<Arc<FeedbackLog>>,
    pub degradation: Arc<DegradationController>,
    pub metrics_handle: PrometheusHandle,
    pub embedder: Arc<LlmServiceEmbedder>,
    /// `None` when no `RagConfig` is configured; the indexer and RAG context
    /// both treat that as "knowledge features disabled", not an error.
    pub knowledge_store: Option<Arc<KnowledgeStore>>,
}

impl AppState {
    /// `metrics_handle` is installed by the caller before any request is
    /// served, since the recorder has to be set as the global default
    /// exactly once per process (see `crate::start`).
    pub fn build(
        config: AppConfig,
        metrics_handle: PrometheusHandle,
    ) -> Result<Self, crate::error_handler::AppError> {
        let config = Arc::new(config);

        let mut providers = HashMap::new();
        if let Some(cfg) = &config.github {
            providers.insert(cfg.platform, cfg.clone());
        }
        if let Some(cfg) = &config.gitea {
            providers.insert(cfg.platform, cfg.clone());
        }
        let providers: HashMap<_, ProviderConfig> = providers;

        let llm = Arc::new(LlmClient::from_config(config.llm.clone())?);
        let llm_profiles = llm.profiles();

        // The orchestrator and the feedback processor both need to see the
        // same writes (reinforce_or_create from feedback must be visible to
        // review-time suppression lookups), so there is exactly one
        // `ConstraintStore`, shared behind one `Arc`.
        let constraints = config
            .constraints
            .clone()
            .and_then(|cfg| ConstraintStore::new(cfg).ok())
            .map(Arc::new);

        let rag = config.rag.clone().map(|rag_config| RagContext {
            svc: llm_profiles.clone(),
            config: rag_config,
        });

        let orchestrator = Arc::new(Orchestrator::new(
            providers,
            llm,
            rag,
            constraints.clone(),
        ));

        let feedback_log = if config.constraints.is_some() {
            Some(Arc::new(FeedbackLog::new(config.feedback_log_dir.clone())))
        } else {
            None
        };

        let degradation = Arc::new(DegradationController::new(
            config.llm.embedding.clone(),
            constraints.clone(),
            config.llm.health_timeout_secs,
        )?);

        let embedder = Arc::new(LlmServiceEmbedder::new(llm_profiles.clone()));

        let knowledge_store = config.rag.clone().and_then(|rag_config| {
            rag_store::qdrant_facade::QdrantFacade::new(&rag_config)
                .ok()
                .map(|client| Arc::new(KnowledgeStore::new(&rag_config, client)))
        });

        Ok(Self {
            broker: Arc::new(Broker::new(config.task_queue.clone())),
            review_results: ResultBackend::new(config.task_queue.result_ttl_secs),
            task_results: ResultBackend::new(config.task_queue.result_ttl_secs),
            review_index: ResultBackend::new(config.task_queue.result_ttl_secs),
            orchestrator,
            llm_profiles,
            constraints,
            feedback_log,
            degradation,
            metrics_handle,
            embedder,
            knowledge_store,
            config,
        })
    }
}
