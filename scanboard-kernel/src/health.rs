use crate::config::Strategy;
use crate::error::SummaryError;
use crate::models::now_rfc3339;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub strategy: String,
    pub summaries_served: u32,
    pub upstream_failures: u32,
    pub config_failures: u32,
    pub last_success: Option<String>,
    pub last_error: Option<String>,
    pub memory_usage_mb: f32,
}

#[derive(Default)]
struct LastOutcome {
    success_at: Option<String>,
    error: Option<String>,
}

/// Compteurs process-local, partagés entre handlers (clone = même état).
#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    strategy: Strategy,
    summaries_served: Arc<AtomicU32>,
    upstream_failures: Arc<AtomicU32>,
    config_failures: Arc<AtomicU32>,
    last: Arc<Mutex<LastOutcome>>,
}

impl HealthTracker {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            start_time: Instant::now(),
            strategy,
            summaries_served: Arc::new(AtomicU32::new(0)),
            upstream_failures: Arc::new(AtomicU32::new(0)),
            config_failures: Arc::new(AtomicU32::new(0)),
            last: Arc::new(Mutex::new(LastOutcome::default())),
        }
    }

    pub fn record_success(&self, last_sync: &str) {
        self.summaries_served.fetch_add(1, Ordering::Relaxed);
        self.last.lock().success_at = Some(last_sync.to_string());
    }

    pub fn record_failure(&self, err: &SummaryError) {
        let counter = match err {
            SummaryError::Config(_) => &self.config_failures,
            SummaryError::Upstream(_) => &self.upstream_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.last.lock().error = Some(format!("{} {}", now_rfc3339(), err));
    }

    pub fn get_health(&self) -> KernelHealth {
        let last = self.last.lock();
        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            strategy: self.strategy.as_str().to_string(),
            summaries_served: self.summaries_served.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            config_failures: self.config_failures.load(Ordering::Relaxed),
            last_success: last.success_at.clone(),
            last_error: last.error.clone(),
            memory_usage_mb: get_memory_usage_mb(),
        }
    }
}

fn get_memory_usage_mb() -> f32 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let kb = status
                .lines()
                .find(|l| l.starts_with("VmRSS:"))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|v| v.parse::<u64>().ok());
            if let Some(kb) = kb {
                return kb as f32 / 1024.0;
            }
        }
    }

    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, UpstreamError};

    #[test]
    fn test_counters_are_shared_between_clones() {
        let tracker = HealthTracker::new(Strategy::BucketStats);
        let other = tracker.clone();

        other.record_success("2026-01-01T00:00:00Z");
        tracker.record_failure(&SummaryError::from(ConfigError::MissingCredentials));
        other.record_failure(&SummaryError::from(UpstreamError::Status {
            path: "/hosts/search".into(),
            status: 403,
            body: "forbidden".into(),
        }));

        let health = tracker.get_health();
        assert_eq!(health.strategy, "bucket_stats");
        assert_eq!(health.summaries_served, 1);
        assert_eq!(health.config_failures, 1);
        assert_eq!(health.upstream_failures, 1);
        assert_eq!(health.last_success.as_deref(), Some("2026-01-01T00:00:00Z"));
        assert!(health.last_error.unwrap().contains("403"));
    }

    #[test]
    fn test_fresh_tracker() {
        let health = HealthTracker::new(Strategy::SearchFacets).get_health();
        assert_eq!(health.strategy, "search_facets");
        assert_eq!(health.summaries_served, 0);
        assert!(health.last_success.is_none());
        assert!(health.last_error.is_none());
    }
}
