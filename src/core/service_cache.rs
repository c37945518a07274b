use crate::domain::model::{CacheState, PollOutcome};
use crate::domain::ports::ServiceSource;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Owns the published service snapshot and runs poll cycles against a [`ServiceSource`].
pub struct ServiceCache {
    source: Arc<dyn ServiceSource>,
    state: RwLock<CacheState>,
    in_flight: AtomicBool,
}

/// Releases the in-flight flag when the cycle ends, including when its task is aborted.
struct CycleGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> CycleGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl ServiceCache {
    pub fn new(source: Arc<dyn ServiceSource>) -> Self {
        Self {
            source,
            state: RwLock::new(CacheState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub async fn snapshot(&self) -> CacheState {
        self.state.read().await.clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Runs one poll cycle unless another is in flight, in which case it returns
    /// [`PollOutcome::Skipped`] without waiting.
    pub async fn refresh(&self) -> PollOutcome {
        let Some(_guard) = CycleGuard::try_acquire(&self.in_flight) else {
            tracing::debug!("Poll cycle already in flight, skipping");
            return PollOutcome::Skipped;
        };

        tracing::info!("Fetching data from PagerDuty API");
        match self.source.fetch_services().await {
            Ok(services) => {
                let count = services.len();
                let mut state = self.state.write().await;
                state.services = Arc::new(services);
                state.error_message = None;
                state.last_updated = Some(Utc::now());
                tracing::info!("✅ Cached {} services", count);
                PollOutcome::Updated(count)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!("Failed to fetch data, {}", message);
                tracing::debug!("💡 {}", e.recovery_suggestion());
                // 保留上次成功的資料，但錯誤存在時不對外提供
                self.state.write().await.error_message = Some(message.clone());
                PollOutcome::Failed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ServiceRecord;
    use crate::utils::error::{PluginError, Result};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn record(id: &str) -> ServiceRecord {
        ServiceRecord {
            id: id.to_string(),
            name: format!("Service {}", id),
            homepage_url: format!("https://acme.pagerduty.com/services/{}", id),
        }
    }

    /// Replays scripted results in order.
    struct ScriptedSource {
        results: Mutex<VecDeque<Result<Vec<ServiceRecord>>>>,
    }

    impl ScriptedSource {
        fn new(results: Vec<Result<Vec<ServiceRecord>>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
            }
        }
    }

    #[async_trait]
    impl ServiceSource for ScriptedSource {
        async fn fetch_services(&self) -> Result<Vec<ServiceRecord>> {
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    /// Blocks inside `fetch_services` until released.
    struct GatedSource {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ServiceSource for GatedSource {
        async fn fetch_services(&self) -> Result<Vec<ServiceRecord>> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(vec![record("SLOW")])
        }
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let cache = ServiceCache::new(Arc::new(ScriptedSource::new(vec![])));
        let state = cache.snapshot().await;

        assert!(state.services.is_empty());
        assert!(state.error_message.is_none());
        assert!(state.last_updated.is_none());
    }

    #[tokio::test]
    async fn test_success_publishes_snapshot() {
        let cache = ServiceCache::new(Arc::new(ScriptedSource::new(vec![Ok(vec![
            record("P1"),
            record("P2"),
        ])])));

        assert_eq!(cache.refresh().await, PollOutcome::Updated(2));

        let state = cache.snapshot().await;
        assert_eq!(state.services.as_slice(), &[record("P1"), record("P2")]);
        assert!(state.error_message.is_none());
        assert!(state.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_failure_keeps_data_and_records_error_until_next_success() {
        let cache = ServiceCache::new(Arc::new(ScriptedSource::new(vec![
            Ok(vec![record("P1")]),
            Err(PluginError::Upstream {
                status: 500,
                message: "a b".to_string(),
            }),
            Ok(vec![record("P2")]),
        ])));

        cache.refresh().await;
        let outcome = cache.refresh().await;
        assert_eq!(
            outcome,
            PollOutcome::Failed("Request failed with 500, a b".to_string())
        );

        let state = cache.snapshot().await;
        assert_eq!(state.services.as_slice(), &[record("P1")]);
        assert_eq!(
            state.error_message.as_deref(),
            Some("Request failed with 500, a b")
        );

        cache.refresh().await;
        let state = cache.snapshot().await;
        assert_eq!(state.services.as_slice(), &[record("P2")]);
        assert!(state.error_message.is_none());
    }

    #[tokio::test]
    async fn test_missing_token_is_recorded_as_error() {
        let cache = ServiceCache::new(Arc::new(ScriptedSource::new(vec![Err(
            PluginError::MissingToken,
        )])));

        assert!(matches!(cache.refresh().await, PollOutcome::Failed(_)));
        assert_eq!(
            cache.snapshot().await.error_message.as_deref(),
            Some("Missing PagerDuty API token")
        );
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_skipped() {
        let source = Arc::new(GatedSource {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let cache = Arc::new(ServiceCache::new(source.clone()));

        let running = tokio::spawn({
            let cache = cache.clone();
            async move { cache.refresh().await }
        });
        source.entered.notified().await;

        assert!(cache.is_refreshing());
        assert_eq!(cache.refresh().await, PollOutcome::Skipped);

        source.release.notify_one();
        assert_eq!(running.await.unwrap(), PollOutcome::Updated(1));
        assert!(!cache.is_refreshing());
    }

    #[tokio::test]
    async fn test_aborted_cycle_releases_guard() {
        let source = Arc::new(GatedSource {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let cache = Arc::new(ServiceCache::new(source.clone()));

        let running = tokio::spawn({
            let cache = cache.clone();
            async move { cache.refresh().await }
        });
        source.entered.notified().await;
        running.abort();
        let _ = running.await;

        assert!(!cache.is_refreshing());
    }
}
