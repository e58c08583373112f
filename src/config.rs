use crate::error::{EnrichmentError, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "leadmap-enrich.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub job: JobConfig,

    #[serde(default)]
    pub supabase: SupabaseConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// `[job]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Tables scanned on every run, in this order
    #[serde(default = "default_tables")]
    pub tables: Vec<TableConfig>,

    /// Maximum rows fetched per table per run
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Rows not updated within this many hours are stale
    #[serde(default = "default_staleness_hours")]
    pub staleness_hours: i64,

    /// Tables processed concurrently. 1 keeps the run fully sequential
    #[serde(default = "default_table_concurrency")]
    pub table_concurrency: usize,

    /// When set, `serve` also triggers a run on this interval
    #[serde(default)]
    pub schedule_interval_minutes: Option<u64>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            tables: default_tables(),
            batch_size: default_batch_size(),
            staleness_hours: default_staleness_hours(),
            table_concurrency: default_table_concurrency(),
            schedule_interval_minutes: None,
        }
    }
}

impl JobConfig {
    pub fn staleness_window(&self) -> Duration {
        Duration::hours(self.staleness_hours)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tables.is_empty() {
            return Err(EnrichmentError::config("job.tables must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(EnrichmentError::config("job.batch_size must be positive"));
        }
        if self.staleness_hours <= 0 {
            return Err(EnrichmentError::config("job.staleness_hours must be positive"));
        }
        if self.table_concurrency == 0 {
            return Err(EnrichmentError::config("job.table_concurrency must be at least 1"));
        }
        if let Some(table) = self.tables.iter().find(|t| t.name.trim().is_empty()) {
            return Err(EnrichmentError::config(format!(
                "table with id column '{}' has an empty name",
                table.id_column
            )));
        }
        Ok(())
    }
}

/// `[[job.tables]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableConfig {
    pub name: String,

    /// Primary key column used for the keyed update
    #[serde(default = "default_id_column")]
    pub id_column: String,
}

impl TableConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_column: default_id_column(),
        }
    }
}

fn default_tables() -> Vec<TableConfig> {
    [
        "listings",
        "expired_listings",
        "probate_leads",
        "fsbo_leads",
        "frbo_leads",
        "foreclosure_listings",
    ]
    .into_iter()
    .map(TableConfig::new)
    .collect()
}
fn default_batch_size() -> usize {
    200
}
fn default_staleness_hours() -> i64 {
    24
}
fn default_table_concurrency() -> usize {
    1
}
fn default_id_column() -> String {
    "listing_id".into()
}

/// `[supabase]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Name of the env var holding the project URL
    #[serde(default = "default_url_env")]
    pub url_env: String,

    /// Name of the env var holding the service role key
    #[serde(default = "default_key_env")]
    pub key_env: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url_env: default_url_env(),
            key_env: default_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_url_env() -> String {
    "SUPABASE_URL".into()
}
fn default_key_env() -> String {
    "SUPABASE_SERVICE_ROLE_KEY".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Resolved Supabase connection parameters
#[derive(Debug, Clone)]
pub struct SupabaseCredentials {
    pub url: String,
    pub key: String,
    pub timeout_secs: u64,
}

impl SupabaseConfig {
    pub fn resolve(&self) -> Result<SupabaseCredentials> {
        Ok(SupabaseCredentials {
            url: read_env(&self.url_env)?,
            key: read_env(&self.key_env)?,
            timeout_secs: self.timeout_secs,
        })
    }
}

/// `[server]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Name of the env var holding the trigger credential
    #[serde(default = "default_cron_secret_env")]
    pub cron_secret_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cron_secret_env: default_cron_secret_env(),
        }
    }
}

impl ServerConfig {
    pub fn cron_secret(&self) -> Result<String> {
        read_env(&self.cron_secret_env)
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".into()
}
fn default_cron_secret_env() -> String {
    "CRON_SECRET".into()
}

fn read_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(EnrichmentError::config(format!(
            "environment variable {name} is not set"
        ))),
    }
}

/// Load config from an explicit path, or from the default file if present
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                load_config_from(default_path)?
            } else {
                tracing::debug!("config file not found, using defaults");
                AppConfig::default()
            }
        }
    };

    config.job.validate()?;
    Ok(config)
}

fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        EnrichmentError::config(format!("failed to read {}: {e}", path.display()))
    })?;

    parse_config(&content)
        .map_err(|e| EnrichmentError::config(format!("failed to parse {}: {e}", path.display())))
}

fn parse_config(content: &str) -> std::result::Result<AppConfig, toml::de::Error> {
    toml::from_str(content)
}
