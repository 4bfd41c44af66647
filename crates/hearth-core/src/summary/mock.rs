//! Mock summary backend for tests and offline use

use async_trait::async_trait;

use super::{SummaryBackend, SummaryDigest};

/// Deterministic summariser
///
/// Reads the digest embedded in the prompt and echoes its figures back as
/// bullets, so callers can check what was sent without a model running.
#[derive(Debug, Clone, Default)]
pub struct MockSummarizer;

impl MockSummarizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SummaryBackend for MockSummarizer {
    async fn generate(&self, prompt: &str) -> String {
        let digest = prompt
            .split_once("\n\n")
            .and_then(|(_, body)| serde_json::from_str::<SummaryDigest>(body).ok());

        match digest {
            Some(d) => {
                let tip = d
                    .top_steps
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "Keep tracking your spending.".to_string());
                format!(
                    "- You saved {:.0}% of your income in month {}.\n\
                     - Your goal is {:.0}%.\n\
                     - Tip: {}",
                    d.savings_rate * 100.0,
                    d.month,
                    d.target_savings_rate * 100.0,
                    tip
                )
            }
            None => "- Keep tracking your spending.".to_string(),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unstructured_prompt() {
        let text = MockSummarizer::new().generate("hello").await;
        assert_eq!(text, "- Keep tracking your spending.");
    }
}
