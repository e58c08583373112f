use crate::config::{SupabaseCredentials, TableConfig};
use crate::error::{EnrichmentError, Result};
use crate::models::ListingUpdate;
use crate::store::traits::ListingStore;
use crate::store::types::StaleQuery;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, warn};

/// Supabase store talking to PostgREST at `<url>/rest/v1`
pub struct SupabaseStore {
    client: Client,
    rest_url: String,
}

impl SupabaseStore {
    /// Create a store with the service key attached to every request
    pub fn new(credentials: &SupabaseCredentials) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&credentials.key).context("Invalid Supabase key")?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", credentials.key))
            .context("Invalid Supabase key")?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .timeout(Duration::from_secs(credentials.timeout_secs))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", credentials.url.trim_end_matches('/')),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }
}

/// Turn a non-2xx PostgREST response into a backend error, preferring its `message`
async fn error_from_response(response: Response, fallback: &str) -> EnrichmentError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    EnrichmentError::backend(postgrest_error_message(status.as_u16(), &body, fallback))
}

fn postgrest_error_message(status: u16, body: &str, fallback: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .filter(|m| !m.trim().is_empty());

    match message {
        Some(message) => format!("{message} (HTTP {status})"),
        None if !body.trim().is_empty() => format!("{} (HTTP {status})", body.trim()),
        None => format!("{fallback} (HTTP {status})"),
    }
}

#[async_trait]
impl ListingStore for SupabaseStore {
    async fn fetch_stale(&self, query: &StaleQuery) -> Result<Vec<serde_json::Value>> {
        let url = self.table_url(&query.table.name);
        debug!("Fetching stale rows from {}", url);

        let response = self
            .client
            .get(&url)
            .query(&query.postgrest_params())
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(table = %query.table.name, "Supabase returned status: {}", response.status());
            return Err(error_from_response(response, "Failed to fetch listings").await);
        }

        let rows: Vec<serde_json::Value> = response.json().await?;
        debug!(table = %query.table.name, "Fetched {} stale rows", rows.len());
        Ok(rows)
    }

    async fn update_listing(
        &self,
        table: &TableConfig,
        id: &str,
        update: &ListingUpdate,
    ) -> Result<()> {
        let response = self
            .client
            .patch(self.table_url(&table.name))
            .query(&[(table.id_column.as_str(), format!("eq.{id}"))])
            .header("Prefer", "return=minimal")
            .json(update)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, "Failed to update listing").await);
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "Supabase"
    }
}
