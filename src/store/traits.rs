use crate::config::TableConfig;
use crate::error::Result;
use crate::models::ListingUpdate;
use crate::store::types::StaleQuery;
use async_trait::async_trait;

/// Row-oriented backend holding the listing tables
/// The runner only ever selects stale rows and patches them by id
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Fetch raw rows matching the staleness query, at most `query.limit`
    async fn fetch_stale(&self, query: &StaleQuery) -> Result<Vec<serde_json::Value>>;

    /// Apply a partial update to the row whose id column equals `id`
    async fn update_listing(&self, table: &TableConfig, id: &str, update: &ListingUpdate)
        -> Result<()>;

    /// Get the name of the backend
    fn backend_name(&self) -> &'static str;
}
