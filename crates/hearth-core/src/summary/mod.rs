//! Friendly recommendation summaries from a local LLM
//!
//! The summary is advisory: backends never return errors, they degrade to
//! a short fallback sentence instead.
//!
//! # Architecture
//!
//! - `SummaryBackend` trait: one `generate` call per prompt
//! - `SummaryClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaSummarizer`, `MockSummarizer`
//!
//! # Configuration
//!
//! Environment variables:
//! - `HEARTH_SUMMARY_BACKEND`: `ollama` (default) or `mock`

mod mock;
mod ollama;

pub use mock::MockSummarizer;
pub use ollama::OllamaSummarizer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SummarySettings;
use crate::models::Recommendations;

/// Environment variable selecting the summary backend
pub const BACKEND_ENV: &str = "HEARTH_SUMMARY_BACKEND";

/// Steps included in the summary digest
const DIGEST_STEPS: usize = 3;

/// Text generation backend for summaries
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// Generate text for `prompt`; failures come back as fallback text
    async fn generate(&self, prompt: &str) -> String;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

#[derive(Clone)]
pub enum SummaryClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaSummarizer),
    /// Canned responses for tests and offline use
    Mock(MockSummarizer),
}

impl SummaryClient {
    /// Pick a backend from `HEARTH_SUMMARY_BACKEND`, configured from `settings`
    pub fn from_config(settings: &SummarySettings) -> Self {
        let backend = std::env::var(BACKEND_ENV).unwrap_or_else(|_| "ollama".to_string());

        match backend.to_lowercase().as_str() {
            "mock" => SummaryClient::Mock(MockSummarizer::new()),
            "ollama" => SummaryClient::Ollama(OllamaSummarizer::from_settings(settings)),
            _ => {
                tracing::warn!(
                    backend = %backend,
                    "Unknown summary backend, falling back to ollama"
                );
                SummaryClient::Ollama(OllamaSummarizer::from_settings(settings))
            }
        }
    }

    /// Create an Ollama backend directly (default request timeout)
    pub fn ollama(host: &str, model: &str) -> Self {
        SummaryClient::Ollama(OllamaSummarizer::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        SummaryClient::Mock(MockSummarizer::new())
    }
}

#[async_trait]
impl SummaryBackend for SummaryClient {
    async fn generate(&self, prompt: &str) -> String {
        match self {
            SummaryClient::Ollama(b) => b.generate(prompt).await,
            SummaryClient::Mock(b) => b.generate(prompt).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SummaryClient::Ollama(b) => b.name(),
            SummaryClient::Mock(b) => b.name(),
        }
    }
}

/// Compact view of a recommendation sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryDigest {
    pub month: u32,
    pub income: f64,
    pub expenses: f64,
    pub savings_rate: f64,
    pub target_savings_rate: f64,
    pub top_steps: Vec<String>,
}

impl SummaryDigest {
    pub fn from_recommendations(recs: &Recommendations) -> Self {
        let situation = &recs.current_situation;
        Self {
            month: situation.month_num,
            income: situation.monthly_income,
            expenses: situation.monthly_expenses,
            savings_rate: situation.current_savings_rate,
            target_savings_rate: situation.target_savings_rate,
            top_steps: recs
                .actionable_steps
                .iter()
                .take(DIGEST_STEPS)
                .cloned()
                .collect(),
        }
    }
}

/// Prompt asking for a short, encouraging summary for `audience`
pub fn summary_prompt(recs: &Recommendations, audience: &str) -> String {
    let digest = SummaryDigest::from_recommendations(recs);
    let body = serde_json::to_string_pretty(&digest).unwrap_or_default();
    format!(
        "Write a short, friendly summary for a {}. Be encouraging. Avoid jargon. \
         4 bullets max. Include one concrete savings tip.\n\n{}",
        audience, body
    )
}

/// Ask `backend` to paraphrase the recommendations
pub async fn friendly_summary<B>(recs: &Recommendations, backend: &B, audience: &str) -> String
where
    B: SummaryBackend + ?Sized,
{
    let prompt = summary_prompt(recs, audience);
    debug!("Requesting summary from {}", backend.name());
    backend.generate(&prompt).await
}
