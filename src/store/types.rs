use crate::config::TableConfig;
use chrono::{DateTime, SecondsFormat, Utc};

/// Columns needed to classify and re-stamp a listing
pub const STATUS_COLUMNS: [&str; 6] = [
    "status",
    "list_price",
    "expired",
    "active",
    "updated_at",
    "last_scraped_at",
];

/// Parameters for fetching stale rows from one table
#[derive(Debug, Clone)]
pub struct StaleQuery {
    pub table: TableConfig,
    /// Rows updated at or after this instant are fresh
    pub cutoff: DateTime<Utc>,
    pub limit: usize,
}

impl StaleQuery {
    pub fn new(table: TableConfig, cutoff: DateTime<Utc>, limit: usize) -> Self {
        Self {
            table,
            cutoff,
            limit,
        }
    }

    /// Comma-separated projection, id column first
    pub fn select(&self) -> String {
        std::iter::once(self.table.id_column.as_str())
            .chain(STATUS_COLUMNS)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// PostgREST query parameters: `updated_at IS NULL OR updated_at < cutoff`, active only
    pub fn postgrest_params(&self) -> Vec<(String, String)> {
        let cutoff = self.cutoff.to_rfc3339_opts(SecondsFormat::Millis, true);
        vec![
            ("select".to_string(), self.select()),
            (
                "or".to_string(),
                format!("(updated_at.is.null,updated_at.lt.{cutoff})"),
            ),
            ("active".to_string(), "eq.true".to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ]
    }
}
