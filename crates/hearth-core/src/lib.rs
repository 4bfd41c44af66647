//! Hearth Core Library
//!
//! Household budget forecasting and reallocation:
//! - CSV / in-memory table import with currency-suffixed money columns
//! - Household-monthly aggregation, outlier flags and spending analysis
//! - Lag/rolling features and seeded random-forest forecasts per target
//! - Single-account and role-weighted family budget plans
//! - Compressed model artifacts, text reports and LLM summaries
//!
//! The usual entry point is [`BudgetSession`]:
//!
//! ```rust,ignore
//! let mut session = BudgetSession::new(RecommenderConfig::load(None)?, AccountMode::Single);
//! session.load_csv(Path::new("household.csv"))?;
//! session.build_predictive_models()?;
//! let next_week = session.predict_budget("week")?;
//! session.generate_recommendations(None, MonthSelector::Latest)?;
//! println!("{}", session.report()?);
//! ```

pub mod aggregate;
pub mod allocate;
pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod forecast;
pub mod import;
pub mod ml;
pub mod models;
pub mod persist;
pub mod report;
pub mod session;
pub mod summary;

/// Test utilities including mock Ollama server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aggregate::{CategoryKind, CategoryRules, HouseholdData};
pub use analysis::SpendingAnalysis;
pub use config::RecommenderConfig;
pub use error::{Error, Result};
pub use forecast::{ForecastTarget, TrainedModels, TrainedTarget};
pub use import::RawTable;
pub use models::{
    AccountMode, BudgetPlan, Forecast, Horizon, MonthSelector, Prediction, Priority,
    Recommendations,
};
pub use persist::ModelArtifact;
pub use report::render_report;
pub use session::BudgetSession;
pub use summary::{MockSummarizer, OllamaSummarizer, SummaryBackend, SummaryClient};
