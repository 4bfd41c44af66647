//! Configuration command and shared session setup

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hearth_core::{AccountMode, BudgetSession, RecommenderConfig};

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub family: bool,
    pub currency: Option<String>,
}

impl GlobalOptions {
    pub fn mode(&self) -> AccountMode {
        if self.family {
            AccountMode::Family
        } else {
            AccountMode::Single
        }
    }
}

/// Override summary host/model with values from the environment
pub fn apply_env_overrides(
    config: &mut RecommenderConfig,
    host: Option<String>,
    model: Option<String>,
) {
    if let Some(host) = host.filter(|h| !h.trim().is_empty()) {
        config.summary.host = host;
    }
    if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
        config.summary.model = model;
    }
}

/// Resolve the effective config: file or defaults, then `--currency`, then env
pub fn load_config(opts: &GlobalOptions) -> Result<RecommenderConfig> {
    let mut config =
        RecommenderConfig::load(opts.config.as_deref()).context("Failed to load config")?;

    if let Some(currency) = &opts.currency {
        config.currency = currency.trim().to_uppercase();
    }
    apply_env_overrides(
        &mut config,
        std::env::var("OLLAMA_HOST").ok(),
        std::env::var("OLLAMA_MODEL").ok(),
    );

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Session with `file` loaded under the effective config
pub fn open_session(opts: &GlobalOptions, file: &Path) -> Result<BudgetSession> {
    let mut session = BudgetSession::new(load_config(opts)?, opts.mode());
    load_file(&mut session, file)?;
    Ok(session)
}

pub fn load_file(session: &mut BudgetSession, file: &Path) -> Result<()> {
    session
        .load_csv(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    Ok(())
}

pub fn cmd_config(opts: &GlobalOptions) -> Result<()> {
    let config = load_config(opts)?;
    let text = toml::to_string_pretty(&config).context("Failed to render config")?;
    println!("{}", text);
    Ok(())
}
