//! Test utilities for hearth-core
//!
//! A mock Ollama server for summary tests plus builders for the household
//! tables used across unit, integration and CLI tests.

use std::net::SocketAddr;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::import::RawTable;

/// How the mock server answers `/api/generate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockBehaviour {
    /// `{"response": "<model>: <prompt>"}`
    #[default]
    Echo,
    /// `{"response": ""}`
    Empty,
    /// HTTP 500 with a plain-text body
    ServerError,
    /// HTTP 200 with a body that is not JSON
    Malformed,
    /// Sleeps for [`STALL`] before answering like `Echo`
    Stall,
}

/// How long `MockBehaviour::Stall` waits before replying
pub const STALL: std::time::Duration = std::time::Duration::from_secs(5);

/// Mock Ollama server for testing and development
pub struct MockOllamaServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOllamaServer {
    /// Start an echoing mock server on an available port
    pub async fn start() -> Self {
        Self::with_behaviour(MockBehaviour::Echo).await
    }

    /// Start a mock server with the given behaviour
    pub async fn with_behaviour(behaviour: MockBehaviour) -> Self {
        let app = Router::new()
            .route("/api/generate", post(handle_generate))
            .with_state(behaviour);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(default = "default_stream")]
    stream: bool,
}

/// Ollama streams unless told otherwise
fn default_stream() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    model: String,
    response: String,
    done: bool,
}

/// Ollama generate endpoint
async fn handle_generate(
    State(behaviour): State<MockBehaviour>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    let reply = |response: String| {
        Json(GenerateResponse {
            model: request.model.clone(),
            response,
            done: true,
        })
        .into_response()
    };

    // streamed replies are newline-delimited chunks the client cannot parse
    if request.stream {
        return (StatusCode::BAD_REQUEST, "streaming not supported").into_response();
    }

    match behaviour {
        MockBehaviour::Echo => reply(format!("{}: {}", request.model, request.prompt)),
        MockBehaviour::Stall => {
            tokio::time::sleep(STALL).await;
            reply(format!("{}: {}", request.model, request.prompt))
        }
        MockBehaviour::Empty => reply(String::new()),
        MockBehaviour::ServerError => {
            (StatusCode::INTERNAL_SERVER_ERROR, "model exploded").into_response()
        }
        MockBehaviour::Malformed => (StatusCode::OK, "{\"response\": ").into_response(),
    }
}

/// Columns of the single-account sample tables
pub const SINGLE_HEADERS: [&str; 6] = [
    "month_num",
    "income_lkr",
    "rent_lkr",
    "food_lkr",
    "utilities_lkr",
    "entertainment_lkr",
];

/// Columns of the family sample table
pub const FAMILY_HEADERS: [&str; 7] = [
    "month_num",
    "member_id",
    "member_role",
    "income_lkr",
    "rent_lkr",
    "food_lkr",
    "entertainment_lkr",
];

fn table(headers: &[&str], rows: Vec<Vec<String>>) -> RawTable {
    RawTable::new(headers.iter().map(|h| h.to_string()).collect(), rows)
}

/// Three identical months: income 100,000; rent 30,000; food 20,000;
/// utilities 10,000; entertainment 15,000
pub fn scenario_table() -> RawTable {
    let rows = (1..=3)
        .map(|m| {
            [m, 100_000, 30_000, 20_000, 10_000, 15_000]
                .iter()
                .map(|v| v.to_string())
                .collect()
        })
        .collect();
    table(&SINGLE_HEADERS, rows)
}

/// `months` months of single-account data with some month-to-month variation
pub fn varied_table(months: u32) -> RawTable {
    let rows = (1..=months.min(12))
        .map(|m| {
            let wobble = ((m * 7) % 5) as u64 * 1_500;
            [
                m as u64,
                90_000 + (m as u64 % 3) * 5_000,
                30_000,
                18_000 + wobble,
                9_000 + (m as u64 % 2) * 1_000,
                12_000 + wobble * 2,
            ]
            .iter()
            .map(|v| v.to_string())
            .collect()
        })
        .collect();
    table(&SINGLE_HEADERS, rows)
}

/// Two members over three months: an Adult and a Child with equal
/// discretionary spend, spending above a 20% savings target
pub fn family_table() -> RawTable {
    let mut rows = Vec::new();
    for m in 1..=3u32 {
        rows.push(vec![
            m.to_string(),
            "P1".to_string(),
            "Adult".to_string(),
            "80000".to_string(),
            "30000".to_string(),
            "20000".to_string(),
            "15000".to_string(),
        ]);
        rows.push(vec![
            m.to_string(),
            "K1".to_string(),
            "Child".to_string(),
            "0".to_string(),
            "0".to_string(),
            "5000".to_string(),
            "15000".to_string(),
        ]);
    }
    table(&FAMILY_HEADERS, rows)
}

/// Render a table as CSV text (cells must not need quoting)
pub fn to_csv(table: &RawTable) -> String {
    let mut out = table.headers.join(",");
    out.push('\n');
    for row in &table.rows {
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}
