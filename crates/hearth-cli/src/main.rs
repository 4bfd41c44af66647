//! Hearth CLI - Household budget forecaster
//!
//! Usage:
//!   hearth analyze --file CSV                 Spending analysis
//!   hearth train --file CSV --output PATH     Fit and save forecast models
//!   hearth forecast --file CSV --horizon week Predict upcoming spending
//!   hearth recommend --file CSV --summary     Budget plan report

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let opts = cli.global_options();
    match cli.command {
        Commands::Analyze { file } => commands::cmd_analyze(&opts, &file),
        Commands::Train { file, output } => commands::cmd_train(&opts, &file, &output),
        Commands::Forecast {
            file,
            model,
            horizon,
        } => commands::cmd_forecast(&opts, &file, model.as_deref(), &horizon),
        Commands::Recommend {
            file,
            month,
            target,
            summary,
        } => commands::cmd_recommend(&opts, &file, &month, target, summary).await,
        Commands::Config => commands::cmd_config(&opts),
    }
}
