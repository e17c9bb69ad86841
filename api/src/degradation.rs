//! Degradation controller (C12): tracks the health of the LLM and the
//! knowledge/constraint store and exposes the current [`FallbackLevel`] as a
//! pure function of the last probe results. Re-probed on a fixed cadence by
//! [`DegradationController::spawn_poll_loop`]; the orchestrator consults
//! [`DegradationController::level`] before invoking RAG/RLHF rather than
//! retrying a plane that's already known to be down.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ai_llm_service::config::llm_model_config::LlmModelConfig;
use ai_llm_service::error_handler::AiLlmError;
use ai_llm_service::health_service::HealthService;
use rag_base::ConstraintStore;
use serde::Serialize;
use tracing::{info, warn};

/// Cascading fallback state, ordered worst-to-best as in §4.8's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackLevel {
    /// LLM down: no reviews possible regardless of queue/store.
    Emergency,
    /// LLM up, queue and store both down: LLM only, inline synchronous.
    Minimal,
    /// LLM up, store down: no RAG, no RLHF.
    DegradedBoth,
    /// LLM up, queue down, store up: async affected, RAG/RLHF still usable.
    DegradedRag,
    /// Everything healthy.
    Full,
}

impl FallbackLevel {
    /// RAG retrieval and RLHF suppression both read the same store; neither
    /// is worth attempting unless this is true.
    pub fn store_features_enabled(self) -> bool {
        matches!(self, FallbackLevel::Full | FallbackLevel::DegradedRag)
    }

    pub fn reviews_possible(self) -> bool {
        !matches!(self, FallbackLevel::Emergency)
    }
}

pub struct DegradationController {
    health: HealthService,
    llm_config: LlmModelConfig,
    constraints: Option<Arc<ConstraintStore>>,
    llm_up: AtomicBool,
    store_up: AtomicBool,
}

impl DegradationController {
    pub fn new(
        llm_config: LlmModelConfig,
        constraints: Option<Arc<ConstraintStore>>,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        Ok(Self {
            health: HealthService::new(health_timeout_secs)?,
            llm_config,
            constraints,
            llm_up: AtomicBool::new(true),
            store_up: AtomicBool::new(false),
        })
    }

    /// The broker backing this deployment is in-process: "queue down" can
    /// only mean this process is dead, which no probe it runs could ever
    /// observe. A real external broker would replace this with its own
    /// health flag.
    fn queue_up(&self) -> bool {
        true
    }

    /// Re-runs both probes and updates the health flags they drive.
    pub async fn probe_once(&self) {
        let status = self.health.check(&self.llm_config).await;
        self.llm_up.store(status.ok, Ordering::Relaxed);

        let store_ok = match &self.constraints {
            Some(store) => store.ensure_ready().await.is_ok(),
            None => false,
        };
        self.store_up.store(store_ok, Ordering::Relaxed);
    }

    /// First-match-wins cascade over §4.8's truth table.
    pub fn level(&self) -> FallbackLevel {
        let llm_up = self.llm_up.load(Ordering::Relaxed);
        let queue_up = self.queue_up();
        let store_up = self.store_up.load(Ordering::Relaxed);

        if !llm_up {
            FallbackLevel::Emergency
        } else if !queue_up && !store_up {
            FallbackLevel::Minimal
        } else if !store_up {
            FallbackLevel::DegradedBoth
        } else if !queue_up {
            FallbackLevel::DegradedRag
        } else {
            FallbackLevel::Full
        }
    }

    /// Wraps one remote call: on success, marks `flag` healthy and returns
    /// the value; on failure, logs, flips `flag` unhealthy, and returns
    /// `fallback` instead of propagating.
    pub async fn guarded<T, E, F, Fut>(flag: &AtomicBool, label: &str, fallback: T, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match call().await {
            Ok(v) => {
                flag.store(true, Ordering::Relaxed);
                v
            }
            Err(e) => {
                warn!(label, error = %e, "remote call failed, falling back");
                flag.store(false, Ordering::Relaxed);
                fallback
            }
        }
    }

    /// Spawns the fixed-cadence re-probe loop described in §4.8 (default
    /// interval 60s, overridden by `DEGRADATION_POLL_INTERVAL_SECS`).
    pub fn spawn_poll_loop(self: Arc<Self>, interval_secs: u64) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
            loop {
                ticker.tick().await;
                self.probe_once().await;
                info!(level = ?self.level(), "degradation probe completed");
            }
        });
    }
}
