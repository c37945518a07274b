use crate::core::service_cache::ServiceCache;
use crate::domain::model::PollOutcome;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Drives [`ServiceCache::refresh`] on a fixed interval.
pub struct ServicePoller {
    cache: Arc<ServiceCache>,
    interval: Duration,
}

/// Handle to a running poller. Stop it with [`PollerHandle::shutdown`].
pub struct PollerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ServicePoller {
    /// Intervals shorter than one millisecond are raised to one millisecond.
    pub fn new(cache: Arc<ServiceCache>, interval: Duration) -> Self {
        Self {
            cache,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Spawns the timer task. The first cycle starts one interval from now.
    pub fn start(self) -> PollerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let Self { cache, interval } = self;

        tracing::info!("Starting service poller every {:?}", interval);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // 每個週期在獨立 task 中執行，慢速上游不會延遲計時器
            let mut in_flight: Option<JoinHandle<PollOutcome>> = None;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if in_flight.as_ref().is_some_and(|cycle| !cycle.is_finished()) {
                            tracing::debug!("Previous poll cycle still running, skipping tick");
                            continue;
                        }
                        let cache = Arc::clone(&cache);
                        in_flight = Some(tokio::spawn(async move { cache.refresh().await }));
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Service poller shutdown requested");
                        break;
                    }
                }
            }

            if let Some(cycle) = in_flight.take() {
                cycle.abort();
                let _ = cycle.await;
            }
            tracing::info!("Service poller stopped");
        });

        PollerHandle {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

impl PollerHandle {
    /// Stops the timer and aborts any in-flight cycle. Returns once the task has exited.
    pub async fn shutdown(mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Error waiting for service poller to stop: {}", e);
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}
