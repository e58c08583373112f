use crate::config::TableConfig;
use crate::error::{EnrichmentError, Result};
use crate::models::{parse_timestamp, ListingUpdate};
use crate::store::traits::ListingStore;
use crate::store::types::StaleQuery;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory listing tables with injectable failures
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    failing_fetches: HashSet<String>,
    failing_updates: HashSet<(String, String)>,
    updates: Mutex<Vec<(String, String, ListingUpdate)>>,
    fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, table: &str, rows: Vec<Value>) -> Self {
        self.tables
            .get_mut()
            .unwrap()
            .insert(table.to_string(), rows);
        self
    }

    pub fn failing_fetch(mut self, table: &str) -> Self {
        self.failing_fetches.insert(table.to_string());
        self
    }

    pub fn failing_update(mut self, table: &str, id: &str) -> Self {
        self.failing_updates
            .insert((table.to_string(), id.to_string()));
        self
    }

    /// Every update issued so far, as (table, id, payload)
    pub fn updates(&self) -> Vec<(String, String, ListingUpdate)> {
        self.updates.lock().unwrap().clone()
    }

    /// Number of fetches attempted, failed ones included
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn row(&self, table: &str, id_column: &str, id: &str) -> Option<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)?
            .iter()
            .find(|row| row_id(row, id_column).as_deref() == Some(id))
            .cloned()
    }
}

/// `updated_at IS NULL OR updated_at < cutoff`, active rows only
fn is_stale(query: &StaleQuery, row: &Value) -> bool {
    let updated_at = row
        .get("updated_at")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);
    let active = row.get("active").and_then(Value::as_bool);
    active == Some(true) && updated_at.map_or(true, |ts| ts < query.cutoff)
}

fn row_id(row: &Value, id_column: &str) -> Option<String> {
    match row.get(id_column)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn fetch_stale(&self, query: &StaleQuery) -> Result<Vec<Value>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if self.failing_fetches.contains(&query.table.name) {
            return Err(EnrichmentError::backend("connection reset by peer"));
        }

        let tables = self.tables.lock().unwrap();
        let rows = tables.get(&query.table.name).map(Vec::as_slice).unwrap_or(&[]);

        Ok(rows
            .iter()
            .filter(|row| is_stale(query, row))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn update_listing(
        &self,
        table: &TableConfig,
        id: &str,
        update: &ListingUpdate,
    ) -> Result<()> {
        if self
            .failing_updates
            .contains(&(table.name.clone(), id.to_string()))
        {
            return Err(EnrichmentError::backend("permission denied for table"));
        }

        self.updates
            .lock()
            .unwrap()
            .push((table.name.clone(), id.to_string(), update.clone()));

        let mut tables = self.tables.lock().unwrap();
        if let Some(row) = tables.get_mut(&table.name).and_then(|rows| {
            rows.iter_mut()
                .find(|row| row_id(row, &table.id_column).as_deref() == Some(id))
        }) {
            if let Some(fields) = row.as_object_mut() {
                let patch = serde_json::to_value(update).unwrap();
                if let Some(patch) = patch.as_object() {
                    for (key, value) in patch {
                        fields.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn stale_predicate() {
        let cutoff = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let q = StaleQuery::new(TableConfig::new("fsbo_leads"), cutoff, 200);
        let row = |updated_at: Value, active: Value| {
            json!({ "listing_id": "x", "updated_at": updated_at, "active": active })
        };
        let old = (cutoff - Duration::hours(1)).to_rfc3339();
        let fresh = (cutoff + Duration::minutes(5)).to_rfc3339();

        assert!(is_stale(&q, &row(Value::Null, json!(true))));
        assert!(is_stale(&q, &row(json!(old), json!(true))));
        assert!(!is_stale(&q, &row(json!(fresh), json!(true))));
        assert!(!is_stale(&q, &row(json!(cutoff.to_rfc3339()), json!(true))));
        assert!(!is_stale(&q, &row(Value::Null, json!(false))));
        assert!(!is_stale(&q, &row(json!(old), Value::Null)));
    }
}
