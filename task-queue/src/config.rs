use rand::Rng;
use std::time::Duration;

/// Queue-wide knobs. Defaults match the platform's own retry/timeout
/// conventions: 3 retries, 60s initial backoff doubling to a 600s cap, a
/// 300s hard limit, and worker self-restart every 100 tasks.
#[derive(Debug, Clone)]
pub struct TaskQueueConfig {
    pub max_retries: u32,
    pub initial_backoff_secs: u64,
    pub max_backoff_secs: u64,
    pub hard_limit_secs: u64,
    pub soft_limit_ratio: f64,
    pub prefetch: u32,
    pub restart_after: u32,
    pub result_ttl_secs: i64,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_secs: 60,
            max_backoff_secs: 600,
            hard_limit_secs: 300,
            soft_limit_ratio: 0.8,
            prefetch: 1,
            restart_after: 100,
            result_ttl_secs: 24 * 3600,
        }
    }
}

impl TaskQueueConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_retries: env_u32("TASK_MAX_RETRIES", d.max_retries),
            initial_backoff_secs: env_u64("TASK_INITIAL_BACKOFF_SECS", d.initial_backoff_secs),
            max_backoff_secs: env_u64("TASK_MAX_BACKOFF_SECS", d.max_backoff_secs),
            hard_limit_secs: env_u64("TASK_HARD_LIMIT_SECS", d.hard_limit_secs),
            soft_limit_ratio: env_f64("TASK_SOFT_LIMIT_RATIO", d.soft_limit_ratio),
            prefetch: env_u32("TASK_PREFETCH", d.prefetch),
            restart_after: env_u32("TASK_RESTART_AFTER", d.restart_after),
            result_ttl_secs: env_i64("TASK_RESULT_TTL_SECS", d.result_ttl_secs),
        }
    }

    pub fn soft_limit(&self) -> Duration {
        Duration::from_secs_f64(self.hard_limit_secs as f64 * self.soft_limit_ratio)
    }

    /// Exponential backoff from `initial_backoff_secs`, doubling per retry,
    /// capped at `max_backoff_secs`, plus up to 20% jitter.
    pub fn backoff_for(&self, retry_count: u32) -> Duration {
        let shift = retry_count.saturating_sub(1).min(10);
        let exp = self.initial_backoff_secs.saturating_mul(1u64 << shift);
        let capped = exp.min(self.max_backoff_secs);
        let jitter_span = (capped / 5).max(1);
        let jitter = rand::thread_rng().gen_range(0..=jitter_span);
        Duration::from_secs(capped.saturating_add(jitter))
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let cfg = TaskQueueConfig::default();
        assert!(cfg.backoff_for(1).as_secs() >= 60);
        assert!(cfg.backoff_for(1).as_secs() <= 72);
        assert!(cfg.backoff_for(2).as_secs() >= 120);
        assert!(cfg.backoff_for(10).as_secs() <= 720);
    }
}
