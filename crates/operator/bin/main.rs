//! Flashplane Operator - Main Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use flashplane_operator::{LogFormat, LogLevel, Operator, StartupOptions, init_logging};
use flashplane_shared::config::ConfigLoader;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;

/// Flashplane Kubernetes Operator
#[derive(Parser, Debug)]
#[command(name = "flashplane-operator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Keeps Flashplane job records in sync with FlashJob workloads", long_about = None)]
struct Args {
    /// Optional .env file loaded before reading the environment
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Log level. Overrides FLASHPLANE_LOG_LEVEL.
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Do not run schema migrations on startup
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new(args.env_file.clone())
        .load_platform_config()
        .context("Failed to load configuration")?;

    let level = args
        .log_level
        .unwrap_or_else(|| LogLevel::from_config(&config.logging.level));
    init_logging(level, args.log_format);

    info!("Starting Flashplane Operator");

    let options = StartupOptions {
        skip_migrations: args.skip_migrations,
    };
    let operator = Operator::start(&config, &options).await?;

    info!("Operator is running. Press Ctrl+C to stop.");
    signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Shutting down operator...");

    operator.shutdown().await
}
