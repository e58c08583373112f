use crate::enrichment::EnrichmentJob;
use crate::error::EnrichmentError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Trigger a run every `every`, starting one period after startup
/// Ticks that land while a run is still going are skipped by the job's lease
pub async fn run_every(job: Arc<EnrichmentJob>, every: Duration) {
    info!("⏰ Scheduling enrichment every {} minutes", every.as_secs() / 60);

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        match job.run().await {
            Ok(summary) => info!(
                processed = summary.totals.processed,
                updated = summary.totals.updated,
                failed = summary.totals.failed,
                "Scheduled enrichment run complete"
            ),
            Err(EnrichmentError::AlreadyRunning) => {
                info!("Previous enrichment run still in progress, skipping tick")
            }
            Err(err) => warn!("Scheduled enrichment run failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JobConfig, TableConfig};
    use crate::store::MemoryStore;
    use tokio::time::sleep;

    const PERIOD: Duration = Duration::from_secs(60);

    fn single_table_job(store: Arc<MemoryStore>) -> Arc<EnrichmentJob> {
        let config = JobConfig {
            tables: vec![TableConfig::new("listings")],
            ..JobConfig::default()
        };
        Arc::new(EnrichmentJob::new(store, config))
    }

    #[tokio::test(start_paused = true)]
    async fn first_run_waits_one_period() {
        let store = Arc::new(MemoryStore::new());
        let handle = tokio::spawn(run_every(single_table_job(store.clone()), PERIOD));

        sleep(PERIOD - Duration::from_secs(1)).await;
        assert_eq!(store.fetch_count(), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(store.fetch_count(), 1);

        sleep(PERIOD).await;
        assert_eq!(store.fetch_count(), 2);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn tick_during_a_run_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let job = single_table_job(store.clone());
        let handle = tokio::spawn(run_every(job.clone(), PERIOD));

        let held = job.lease().try_lock().unwrap();
        sleep(PERIOD + Duration::from_secs(1)).await;
        assert_eq!(store.fetch_count(), 0);

        drop(held);
        sleep(PERIOD).await;
        assert_eq!(store.fetch_count(), 1);

        handle.abort();
    }
}
