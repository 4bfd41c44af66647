//! Recommendation command

use std::path::Path;

use anyhow::{Context, Result};
use hearth_core::{MonthSelector, SummaryBackend, SummaryClient};
use tracing::info;

use super::{open_session, GlobalOptions};

pub async fn cmd_recommend(
    opts: &GlobalOptions,
    file: &Path,
    month: &str,
    target: Option<f64>,
    summary: bool,
) -> Result<()> {
    let text = if summary {
        let settings = super::load_config(opts)?.summary;
        let client = SummaryClient::from_config(&settings);
        info!("Summarizing with {}", client.name());
        recommendation_text(opts, file, month, target, Some(&client)).await?
    } else {
        recommendation_text::<SummaryClient>(opts, file, month, target, None).await?
    };

    println!("{}", text);
    Ok(())
}

/// Report for the chosen month, followed by the summary when a backend is given
pub async fn recommendation_text<B>(
    opts: &GlobalOptions,
    file: &Path,
    month: &str,
    target: Option<f64>,
    backend: Option<&B>,
) -> Result<String>
where
    B: SummaryBackend + ?Sized,
{
    let month: MonthSelector = month.parse()?;
    let mut session = open_session(opts, file)?;
    session
        .generate_recommendations(target, month)
        .context("Failed to build recommendations")?;

    let mut text = session.report()?;
    if let Some(backend) = backend {
        let summary = session.friendly_summary(backend).await?;
        text.push_str("\n\n📝 SUMMARY:\n");
        text.push_str(&summary);
    }
    Ok(text)
}
