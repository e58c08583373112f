use crate::config::{JobConfig, TableConfig};
use crate::enrichment::classify::should_be_expired;
use crate::enrichment::validate::{read_id, reported_id, validate_row, ValidatedRow};
use crate::error::{EnrichmentError, Result};
use crate::models::{
    Counts, EnrichmentResult, ListingRecord, ListingUpdate, RunSummary, TableOutcome, TableResult,
};
use crate::store::{ListingStore, StaleQuery};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Re-stamps stale rows across the lead tables, reporting failures per record
pub struct EnrichmentJob {
    store: Arc<dyn ListingStore>,
    config: JobConfig,
    /// Held for the whole of a run; overlapping runs are turned away
    lease: Mutex<()>,
}

impl EnrichmentJob {
    pub fn new(store: Arc<dyn ListingStore>, config: JobConfig) -> Self {
        Self {
            store,
            config,
            lease: Mutex::new(()),
        }
    }

    /// Run one pass over all tables, or `AlreadyRunning` if another pass holds the lease
    pub async fn run(&self) -> Result<RunSummary> {
        self.run_at(Utc::now()).await
    }

    pub(crate) async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let _lease = self
            .lease
            .try_lock()
            .map_err(|_| EnrichmentError::AlreadyRunning)?;

        let started = Instant::now();
        let cutoff = now - self.config.staleness_window();

        info!(
            backend = self.store.backend_name(),
            tables = self.config.tables.len(),
            %cutoff,
            "Starting prospect enrichment run"
        );

        // Collected before streaming so the run future stays Send
        let pending: Vec<_> = self
            .config
            .tables
            .iter()
            .map(|table| self.process_table(table, cutoff, now))
            .collect();
        let tables: Vec<TableResult> = stream::iter(pending)
            .buffered(self.config.table_concurrency)
            .collect()
            .await;

        let mut totals = Counts::default();
        for table in &tables {
            totals.add(table.counts());
        }

        let summary = RunSummary {
            started_at: now,
            totals,
            tables,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            processed = totals.processed,
            updated = totals.updated,
            failed = totals.failed,
            duration_ms = summary.duration_ms,
            "Prospect enrichment run finished"
        );

        Ok(summary)
    }

    /// Fetch, validate and enrich the stale rows of one table
    #[instrument(skip(self, table, cutoff, now), fields(table = %table.name))]
    async fn process_table(
        &self,
        table: &TableConfig,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> TableResult {
        let query = StaleQuery::new(table.clone(), cutoff, self.config.batch_size);

        let rows = match self.store.fetch_stale(&query).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!("Failed to fetch stale rows: {}", err);
                return TableResult {
                    table: table.name.clone(),
                    outcome: TableOutcome::FetchFailed {
                        error: err.to_string(),
                    },
                };
            }
        };

        if rows.is_empty() {
            debug!("No stale rows");
            return TableResult {
                table: table.name.clone(),
                outcome: TableOutcome::NoStaleRows,
            };
        }

        info!("Enriching {} stale rows", rows.len());

        let mut counts = Counts::default();
        let mut results = Vec::with_capacity(rows.len());

        for raw in rows {
            let result = match validate_row(raw, &table.id_column) {
                ValidatedRow::Valid(record) => self.enrich_listing(table, &record, now).await,
                ValidatedRow::Invalid { raw, reason } => {
                    self.reject_row(table, &raw, reason, now).await
                }
            };

            counts.record(&result);
            results.push(result);
        }

        TableResult {
            table: table.name.clone(),
            outcome: TableOutcome::Processed { counts, results },
        }
    }

    #[cfg(test)]
    pub(crate) fn lease(&self) -> &Mutex<()> {
        &self.lease
    }

    /// Report a malformed row as failed, stamping it when it has an id so it leaves the stale set
    async fn reject_row(
        &self,
        table: &TableConfig,
        raw: &serde_json::Value,
        reason: String,
        now: DateTime<Utc>,
    ) -> EnrichmentResult {
        let Some(id) = read_id(raw, &table.id_column) else {
            warn!("Skipping malformed row without an id: {}", reason);
            let id = reported_id(raw, &table.id_column);
            return EnrichmentResult::failed(id, &table.name, reason);
        };

        warn!(id = %id, "Skipping malformed row: {}", reason);

        let update = ListingUpdate {
            updated_at: now,
            last_scraped_at: now,
            expired: None,
        };
        match self.store.update_listing(table, &id, &update).await {
            Ok(()) => EnrichmentResult::failed(id, &table.name, reason),
            Err(err) => {
                warn!(id = %id, "Could not stamp malformed row: {}", err);
                EnrichmentResult::failed(id, &table.name, format!("{reason}; {err}"))
            }
        }
    }

    /// Re-stamp one listing and write back its classification; never fails
    async fn enrich_listing(
        &self,
        table: &TableConfig,
        record: &ListingRecord,
        now: DateTime<Utc>,
    ) -> EnrichmentResult {
        let classified = should_be_expired(record.status.as_deref());
        let update = ListingUpdate {
            updated_at: now,
            last_scraped_at: now,
            expired: classified,
        };

        match self.store.update_listing(table, &record.id, &update).await {
            Ok(()) => {
                debug!(
                    id = %record.id,
                    expired = ?classified,
                    list_price = ?record.list_price,
                    active = ?record.active,
                    previous_update = ?record.updated_at,
                    previous_scrape = ?record.last_scraped_at,
                    "Listing enriched"
                );
                EnrichmentResult::success(&record.id, &table.name, classified.or(record.expired))
            }
            Err(err) => {
                let message = match err {
                    EnrichmentError::Backend(msg) if !msg.trim().is_empty() => msg,
                    EnrichmentError::Backend(_) => "Failed to update listing".to_string(),
                    other => other.to_string(),
                };
                warn!(id = %record.id, "Update failed: {}", message);
                EnrichmentResult::failed(&record.id, &table.name, message)
            }
        }
    }
}
