//! Numerical building blocks for the forecaster
//!
//! - `RandomForestRegressor`: seeded bagging ensemble of CART regression trees
//! - `StandardScaler`: zero-mean / unit-variance feature scaling
//! - `metrics`: goodness-of-fit and error measures
//!
//! Everything here is serde-serialisable so fitted models can be stored in
//! a model artifact and reloaded without retraining.

pub mod forest;
pub mod metrics;
pub mod scaler;

pub use forest::{ForestParams, RandomForestRegressor};
pub use metrics::{mean_absolute_error, r2_score};
pub use scaler::StandardScaler;
