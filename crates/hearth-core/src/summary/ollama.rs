//! Ollama summary backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SummarySettings;

use super::SummaryBackend;

pub const NO_RESPONSE: &str = "No response from LLM.";

/// Request timeout when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for Ollama's `/api/generate`
#[derive(Clone)]
pub struct OllamaSummarizer {
    http_client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaSummarizer {
    /// Create a summariser with the default 30 s request timeout
    pub fn new(base_url: &str, model: &str) -> Self {
        Self::with_timeout(base_url, model, DEFAULT_TIMEOUT)
    }

    /// Create from summary settings
    pub fn from_settings(settings: &SummarySettings) -> Self {
        Self::with_timeout(&settings.host, &settings.model, settings.timeout())
    }

    pub fn with_timeout(base_url: &str, model: &str, timeout: Duration) -> Self {
        let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            warn!("Failed to build HTTP client with timeout: {}", e);
            Client::new()
        });
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl SummaryBackend for OllamaSummarizer {
    async fn generate(&self, prompt: &str) -> String {
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = match self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Summary request failed: {}", e);
                return format!("LLM not reachable: {}", e);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Ollama returned {}", status);
            return format!("LLM error: {} {}", status.as_u16(), body);
        }

        match response.json::<OllamaResponse>().await {
            Ok(body) => {
                let text = body.response.trim();
                debug!("Ollama summary: {} chars", text.len());
                if text.is_empty() {
                    NO_RESPONSE.to_string()
                } else {
                    text.to_string()
                }
            }
            Err(e) => {
                warn!("Unreadable Ollama response: {}", e);
                format!("LLM returned an unreadable response: {}", e)
            }
        }
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockBehaviour, MockOllamaServer, STALL};

    #[tokio::test]
    async fn test_generate_echo() {
        // the mock rejects streaming requests, so an echo means stream=false
        let server = MockOllamaServer::start().await;
        let summarizer = OllamaSummarizer::new(&server.url(), "llama3");

        let text = summarizer.generate("Say hi").await;
        assert_eq!(text, "llama3: Say hi");
    }

    #[test]
    fn test_request_disables_streaming() {
        let request = OllamaRequest {
            model: "llama3",
            prompt: "hi",
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], serde_json::Value::Bool(false));
    }

    #[test]
    fn test_default_timeout_applied() {
        let summarizer = OllamaSummarizer::new("http://localhost:11434", "llama3");
        assert_eq!(summarizer.timeout(), DEFAULT_TIMEOUT);

        let settings = SummarySettings {
            timeout_secs: 7,
            ..Default::default()
        };
        let summarizer = OllamaSummarizer::from_settings(&settings);
        assert_eq!(summarizer.timeout(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockOllamaServer::with_behaviour(MockBehaviour::Stall).await;
        let timeout = Duration::from_millis(200);
        assert!(timeout < STALL);
        let summarizer = OllamaSummarizer::with_timeout(&server.url(), "llama3", timeout);

        let started = std::time::Instant::now();
        let text = summarizer.generate("x").await;
        assert!(text.starts_with("LLM not reachable"), "{}", text);
        assert!(started.elapsed() < STALL);
    }

    #[tokio::test]
    async fn test_empty_response_fallback() {
        let server = MockOllamaServer::with_behaviour(MockBehaviour::Empty).await;
        let summarizer = OllamaSummarizer::new(&server.url(), "llama3");
        assert_eq!(summarizer.generate("x").await, NO_RESPONSE);
    }

    #[tokio::test]
    async fn test_server_error_fallback() {
        let server = MockOllamaServer::with_behaviour(MockBehaviour::ServerError).await;
        let summarizer = OllamaSummarizer::new(&server.url(), "llama3");
        let text = summarizer.generate("x").await;
        assert!(text.starts_with("LLM error: 500"), "{}", text);
        assert!(text.contains("model exploded"));
    }

    #[tokio::test]
    async fn test_malformed_body_fallback() {
        let server = MockOllamaServer::with_behaviour(MockBehaviour::Malformed).await;
        let summarizer = OllamaSummarizer::new(&server.url(), "llama3");
        let text = summarizer.generate("x").await;
        assert!(text.starts_with("LLM returned an unreadable response"), "{}", text);
    }

    #[tokio::test]
    async fn test_unreachable_fallback() {
        // grab a free port, then release it so nothing is listening
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();

        let settings = SummarySettings {
            host: format!("http://{}", addr),
            timeout_secs: 2,
            ..Default::default()
        };
        let text = OllamaSummarizer::from_settings(&settings).generate("x").await;
        assert!(text.starts_with("LLM not reachable"), "{}", text);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let summarizer = OllamaSummarizer::new("http://localhost:11434/", "gemma3");
        assert_eq!(summarizer.base_url(), "http://localhost:11434");
        assert_eq!(summarizer.model(), "gemma3");
    }
}
