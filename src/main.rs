//! seo-engine binary
//!
//! `serve` runs the HTTP surface; `aggregate` and `cleanup` run the nightly
//! jobs once and exit, for use from a scheduler.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use seo_link_engine::{
    engine::{build_state, Backends},
    http_server,
    logging::{init_logging, LogConfig},
    EngineConfig,
};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "seo-engine",
    version,
    about = "SEO content generation and internal link tracking"
)]
struct Cli {
    /// Config file (defaults to seo-engine.toml or config/seo-engine.toml)
    #[arg(long, short, env = "SEO_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Overrides server.bind_addr
        #[arg(long)]
        bind: Option<String>,
    },
    /// Aggregate yesterday's link events
    Aggregate,
    /// Delete raw link events older than the retention window
    Cleanup {
        #[arg(long)]
        days_to_keep: Option<i64>,
    },
    /// Print a sample configuration file
    SampleConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::SampleConfig = cli.command {
        print!("{}", EngineConfig::sample_toml()?);
        return Ok(());
    }

    let config = EngineConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let _guard = init_logging(&LogConfig::from_server_config(&config.server))?;

    let backends = Backends::from_config(&config)
        .await
        .context("failed to open backends")?;
    let state = build_state(&config, backends);

    match cli.command {
        Command::Serve { bind } => {
            let addr = bind.unwrap_or_else(|| config.server.bind_addr.clone());
            http_server::serve(&addr, state).await?;
        }
        Command::Aggregate => {
            let report = state.tracking.aggregate_daily_metrics().await;
            if !report.success {
                anyhow::bail!(
                    "aggregation for {} failed: {}",
                    report.day,
                    report.error.unwrap_or_default()
                );
            }
            info!(day = %report.day, "Aggregation finished");
        }
        Command::Cleanup { days_to_keep } => {
            let days = days_to_keep.unwrap_or(config.tracking.retention_days);
            match state.tracking.cleanup_old_data(days).await {
                Ok(report) => info!(
                    clicks = report.clicks_deleted,
                    impressions = report.impressions_deleted,
                    "Cleanup finished"
                ),
                Err(e) => {
                    error!(error = %e, "Cleanup refused");
                    return Err(e.into());
                }
            }
        }
        Command::SampleConfig => {}
    }

    Ok(())
}
