mod config;
mod enrichment;
mod error;
mod models;
mod scheduler;
mod server;
mod store;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use config::AppConfig;
use enrichment::EnrichmentJob;
use server::AppState;
use store::SupabaseStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Refreshes stale prospect listings in the LeadMap Supabase tables
#[derive(Parser)]
#[command(name = "leadmap-enrich", version)]
struct Cli {
    /// Config file (defaults to ./leadmap-enrich.toml when present)
    #[arg(short, long, global = true, env = "LEADMAP_ENRICH_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the cron trigger endpoints
    Serve {
        /// Address to listen on, overriding the config file
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run one enrichment pass and print the summary as JSON
    Run,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved configuration
    Show,
}

fn init_tracing(cli: &Cli) {
    let default_filter = match cli.verbose {
        0 => "leadmap_enrich=info,tower_http=info",
        1 => "leadmap_enrich=debug,tower_http=debug",
        _ => "leadmap_enrich=trace,tower_http=debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

fn build_job(config: &AppConfig) -> anyhow::Result<Arc<EnrichmentJob>> {
    let credentials = config.supabase.resolve()?;
    let store = SupabaseStore::new(&credentials)?;
    Ok(Arc::new(EnrichmentJob::new(Arc::new(store), config.job.clone())))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { bind } => {
            info!("🏠 LeadMap prospect enrichment");

            let job = build_job(&config)?;
            let cron_secret = config.server.cron_secret()?;

            if let Some(minutes) = config.job.schedule_interval_minutes.filter(|m| *m > 0) {
                tokio::spawn(scheduler::run_every(
                    job.clone(),
                    Duration::from_secs(minutes * 60),
                ));
            }

            let app = server::router(Arc::new(AppState { job, cron_secret }));
            let addr = bind.unwrap_or_else(|| config.server.bind.clone());
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;

            info!("Listening on {} ({})", addr, server::TRIGGER_PATH);
            axum::serve(listener, app).await.context("Server error")?;
        }
        Command::Run => {
            let job = build_job(&config)?;
            let summary = job.run().await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&server::response::summary_body(&summary))?
            );
        }
        Command::Config {
            action: ConfigAction::Show,
        } => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
