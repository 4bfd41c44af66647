//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::GlobalOptions;

/// Hearth - Forecast household spending and plan a budget
#[derive(Parser)]
#[command(name = "hearth")]
#[command(about = "Household budget forecaster and planner", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the per-user override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Treat rows as family members and share cuts by role weight
    #[arg(long, global = true)]
    pub family: bool,

    /// Currency code; money columns must end in `_<code>`
    #[arg(long, global = true)]
    pub currency: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn global_options(&self) -> GlobalOptions {
        GlobalOptions {
            config: self.config.clone(),
            family: self.family,
            currency: self.currency.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize spending patterns in a CSV
    Analyze {
        /// Household CSV file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Fit forecast models and save them
    Train {
        /// Household CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Where to write the model artifact
        #[arg(short, long, default_value = "hearth-models.json.gz")]
        output: PathBuf,
    },

    /// Forecast next month's or next week's spending
    Forecast {
        /// Household CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Saved model artifact (trains from the CSV when omitted)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Forecast horizon: month or week
        #[arg(long, default_value = "month")]
        horizon: String,
    },

    /// Build a budget plan for one month
    Recommend {
        /// Household CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Month number, or "latest"
        #[arg(short, long, default_value = "latest")]
        month: String,

        /// Target savings rate in [0, 1) (defaults to the configured rate)
        #[arg(short, long)]
        target: Option<f64>,

        /// Append a friendly LLM summary
        ///
        /// Uses OLLAMA_HOST / OLLAMA_MODEL when set.
        /// Set HEARTH_SUMMARY_BACKEND=mock to skip the network.
        #[arg(long)]
        summary: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}
