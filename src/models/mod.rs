use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A prospect listing row as read from one of the lead tables
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    pub id: String,
    pub status: Option<String>,
    pub list_price: Option<f64>,
    pub expired: Option<bool>,
    pub active: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_scraped_at: Option<DateTime<Utc>>,
}

/// Partial update written back for one enriched listing
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListingUpdate {
    pub updated_at: DateTime<Utc>,
    pub last_scraped_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
}

/// Outcome of enriching one record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Failed,
}

/// Per-record result reported in the run summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichmentResult {
    pub id: String,
    pub table: String,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
}

impl EnrichmentResult {
    pub fn success(id: impl Into<String>, table: impl Into<String>, expired: Option<bool>) -> Self {
        Self {
            id: id.into(),
            table: table.into(),
            status: RecordStatus::Success,
            message: Some("Listing enriched".to_string()),
            error: None,
            expired,
        }
    }

    pub fn failed(id: impl Into<String>, table: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            table: table.into(),
            status: RecordStatus::Failed,
            message: None,
            error: Some(error.into()),
            expired: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RecordStatus::Success
    }
}

/// Processed/updated/failed counters for a table or a whole run
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counts {
    pub processed: usize,
    pub updated: usize,
    pub failed: usize,
}

impl Counts {
    pub fn record(&mut self, result: &EnrichmentResult) {
        self.processed += 1;
        if result.is_success() {
            self.updated += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn add(&mut self, other: Counts) {
        self.processed += other.processed;
        self.updated += other.updated;
        self.failed += other.failed;
    }
}

/// What happened to one table during a run
#[derive(Debug, Clone, PartialEq)]
pub enum TableOutcome {
    /// The fetch succeeded but nothing was stale
    NoStaleRows,
    Processed {
        counts: Counts,
        results: Vec<EnrichmentResult>,
    },
    /// The fetch itself failed; the table contributes nothing to the totals
    FetchFailed { error: String },
}

/// Result of processing one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableResult {
    pub table: String,
    pub outcome: TableOutcome,
}

impl TableResult {
    pub fn counts(&self) -> Counts {
        match &self.outcome {
            TableOutcome::Processed { counts, .. } => *counts,
            _ => Counts::default(),
        }
    }

    pub fn results(&self) -> &[EnrichmentResult] {
        match &self.outcome {
            TableOutcome::Processed { results, .. } => results,
            _ => &[],
        }
    }
}

/// Aggregated result of one full invocation across all tables
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub totals: Counts,
    pub tables: Vec<TableResult>,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn is_empty(&self) -> bool {
        self.totals.processed == 0
    }

    /// Per-record results of every table, in table order
    pub fn results(&self) -> impl Iterator<Item = &EnrichmentResult> {
        self.tables.iter().flat_map(|t| t.results().iter())
    }
}

/// Parse a Postgres timestamp as returned by PostgREST
/// `timestamptz` arrives as RFC 3339; plain `timestamp` has no offset and is read as UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}
