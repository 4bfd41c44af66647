//! CLI command implementations
//!
//! Commands are organized by task:
//! - `analyze` - Spending analysis summary
//! - `train` - Fit forecast models and save the artifact
//! - `forecast` - Next month / next week predictions
//! - `recommend` - Budget plan report and optional LLM summary
//! - `config` - Effective configuration and shared session setup

pub mod analyze;
pub mod config;
pub mod forecast;
pub mod recommend;
pub mod train;

// Re-export command functions for main.rs
pub use analyze::*;
pub use config::*;
pub use forecast::*;
pub use recommend::*;
pub use train::*;

/// Format a rate in [0, 1] as a percentage
pub fn pct(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}
