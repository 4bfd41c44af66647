//! Recommender configuration
//!
//! Controls savings targets, category classification, family allocation,
//! forecasting and the LLM summary collaborator.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a three-layer resolution:
//! 1. Explicit path (e.g. `hearth --config my.toml`)
//! 2. Override in data dir (~/.local/share/hearth/config/hearth.toml)
//! 3. Embedded defaults (compiled into binary)
//!
//! Every key is optional in the file; missing keys keep their defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/hearth.toml");

/// Settings for model training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSettings {
    /// Trees in each regression ensemble
    pub n_estimators: usize,
    /// Seed for bootstrap sampling and the train/test split
    pub seed: u64,
    /// Optional depth cap for individual trees
    pub max_depth: Option<usize>,
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    /// Minimum months before a held-out split is used
    pub min_rows_for_split: usize,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            n_estimators: 120,
            seed: 42,
            max_depth: None,
            test_fraction: 0.25,
            min_rows_for_split: 4,
        }
    }
}

/// Settings for the budget allocator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSettings {
    /// Flat trim applied to essential categories
    pub essential_trim_pct: f64,
    /// Upper bound on the single-account discretionary cut
    pub max_discretionary_cut: f64,
    /// Expense ceiling as a share of current spend when income is zero
    pub fallback_expense_ratio: f64,
    /// How many of the largest categories are scanned for opportunities
    pub opportunity_top_n: usize,
    /// Minimum share of total spend (percent) for an opportunity
    pub opportunity_share_pct: f64,
    /// Suggested cut for a flagged category
    pub opportunity_cut_pct: f64,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            essential_trim_pct: 0.05,
            max_discretionary_cut: 0.30,
            fallback_expense_ratio: 0.90,
            opportunity_top_n: 8,
            opportunity_share_pct: 12.5,
            opportunity_cut_pct: 0.20,
        }
    }
}

/// Settings for the LLM summary collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySettings {
    /// Ollama server URL
    pub host: String,
    /// Model used for the summary
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Who the summary is written for
    pub audience: String,
}

impl SummarySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            timeout_secs: 30,
            audience: "Sri Lankan household".to_string(),
        }
    }
}

/// Full recommender configuration (persisted alongside trained models)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderConfig {
    pub target_savings_rate: f64,
    /// IQR multiplier for outlier flags
    pub outlier_threshold: f64,
    /// Currency code; money columns end in `_<code lowercase>`
    pub currency: String,
    pub min_months_for_training: usize,
    /// Keywords matched against expense column names
    pub essential_categories: Vec<String>,
    /// Keywords for categories that are never reduced
    pub non_adjustable_categories: Vec<String>,
    /// Optional monthly household spending cap
    pub shared_credit_limit: Option<f64>,
    /// Lowest share of a discretionary category a family plan may keep
    pub member_min_floor_pct: f64,
    pub member_role_weights: BTreeMap<String, f64>,
    /// Used for the simple uniform weekly estimates in analysis
    pub weeks_per_month: f64,
    pub forecast: ForecastSettings,
    pub allocation: AllocationSettings,
    pub summary: SummarySettings,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        let member_role_weights = [("Adult", 1.0), ("Dependent", 0.8), ("Child", 0.6)]
            .into_iter()
            .map(|(role, weight)| (role.to_string(), weight))
            .collect();

        Self {
            target_savings_rate: 0.20,
            outlier_threshold: 1.5,
            currency: "LKR".to_string(),
            min_months_for_training: 3,
            essential_categories: to_strings(&["rent", "food", "utilities", "transport"]),
            non_adjustable_categories: to_strings(&[
                "rent",
                "insurance",
                "loan_payment",
                "education",
            ]),
            shared_credit_limit: None,
            member_min_floor_pct: 0.15,
            member_role_weights,
            weeks_per_month: 4.3,
            forecast: ForecastSettings::default(),
            allocation: AllocationSettings::default(),
            summary: SummarySettings::default(),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl RecommenderConfig {
    /// Load from an explicit path, the override location, or embedded defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read config {}: {}", path.display(), e))
            })?,
            None => match default_config_path() {
                Some(default_path) if default_path.exists() => fs::read_to_string(&default_path)
                    .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?,
                _ => DEFAULT_CONFIG.to_string(),
            },
        };

        parse_config(&content)
    }

    /// Column suffix shared by every money column (e.g. `_lkr`)
    pub fn currency_suffix(&self) -> String {
        format!("_{}", self.currency.to_lowercase())
    }

    /// Name of the required income column (e.g. `income_lkr`)
    pub fn income_column(&self) -> String {
        format!("income{}", self.currency_suffix())
    }

    /// Weight for a family member role (unknown roles weigh 1.0)
    pub fn role_weight(&self, role: &str) -> f64 {
        self.member_role_weights.get(role).copied().unwrap_or(1.0)
    }

    /// Reject values that would make the pipeline meaningless
    pub fn validate(&self) -> Result<()> {
        check_rate("target_savings_rate", self.target_savings_rate)?;
        check_unit("member_min_floor_pct", self.member_min_floor_pct)?;
        check_unit("allocation.essential_trim_pct", self.allocation.essential_trim_pct)?;
        check_unit(
            "allocation.max_discretionary_cut",
            self.allocation.max_discretionary_cut,
        )?;
        check_unit(
            "allocation.fallback_expense_ratio",
            self.allocation.fallback_expense_ratio,
        )?;
        check_unit("allocation.opportunity_cut_pct", self.allocation.opportunity_cut_pct)?;

        if self.outlier_threshold < 0.0 {
            return Err(Error::Config("outlier_threshold must be >= 0".into()));
        }
        if self.weeks_per_month <= 0.0 {
            return Err(Error::Config("weeks_per_month must be > 0".into()));
        }
        if self.currency.trim().is_empty() {
            return Err(Error::Config("currency must not be empty".into()));
        }
        if self.forecast.n_estimators == 0 {
            return Err(Error::Config("forecast.n_estimators must be > 0".into()));
        }
        if !(self.forecast.test_fraction > 0.0 && self.forecast.test_fraction < 1.0) {
            return Err(Error::Config(
                "forecast.test_fraction must be between 0 and 1".into(),
            ));
        }
        if let Some(cap) = self.shared_credit_limit {
            if cap < 0.0 {
                return Err(Error::Config("shared_credit_limit must be >= 0".into()));
            }
        }
        if let Some((role, _)) = self.member_role_weights.iter().find(|(_, w)| **w < 0.0) {
            return Err(Error::Config(format!("role weight for {} must be >= 0", role)));
        }
        Ok(())
    }
}

/// Check a savings-style rate: 0 <= rate < 1
pub(crate) fn check_rate(name: &str, value: f64) -> Result<()> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must be in [0, 1), got {}", name, value)))
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must be in [0, 1], got {}", name, value)))
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("hearth").join("config").join("hearth.toml"))
}

/// Embedded default config text
pub fn default_config_toml() -> &'static str {
    DEFAULT_CONFIG
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    defaults: Option<RawDefaults>,
    categories: Option<RawCategories>,
    family: Option<RawFamily>,
    forecast: Option<RawForecast>,
    allocation: Option<RawAllocation>,
    summary: Option<RawSummary>,
}

#[derive(Debug, Deserialize)]
struct RawDefaults {
    target_savings_rate: Option<f64>,
    currency: Option<String>,
    outlier_threshold: Option<f64>,
    min_months_for_training: Option<usize>,
    weeks_per_month: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawCategories {
    essential: Option<Vec<String>>,
    non_adjustable: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawFamily {
    shared_credit_limit: Option<f64>,
    member_min_floor_pct: Option<f64>,
    role_weights: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
struct RawForecast {
    n_estimators: Option<usize>,
    seed: Option<u64>,
    max_depth: Option<usize>,
    test_fraction: Option<f64>,
    min_rows_for_split: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawAllocation {
    essential_trim_pct: Option<f64>,
    max_discretionary_cut: Option<f64>,
    fallback_expense_ratio: Option<f64>,
    opportunity_top_n: Option<usize>,
    opportunity_share_pct: Option<f64>,
    opportunity_cut_pct: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    host: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    audience: Option<String>,
}

/// Parse config from TOML content, layered over the defaults
pub fn parse_config(content: &str) -> Result<RecommenderConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = RecommenderConfig::default();

    if let Some(defaults) = raw.defaults {
        if let Some(rate) = defaults.target_savings_rate {
            config.target_savings_rate = rate;
        }
        if let Some(currency) = defaults.currency {
            config.currency = currency;
        }
        if let Some(threshold) = defaults.outlier_threshold {
            config.outlier_threshold = threshold;
        }
        if let Some(months) = defaults.min_months_for_training {
            config.min_months_for_training = months;
        }
        if let Some(weeks) = defaults.weeks_per_month {
            config.weeks_per_month = weeks;
        }
    }

    if let Some(categories) = raw.categories {
        if let Some(essential) = categories.essential {
            config.essential_categories = essential;
        }
        if let Some(non_adjustable) = categories.non_adjustable {
            config.non_adjustable_categories = non_adjustable;
        }
    }

    if let Some(family) = raw.family {
        if family.shared_credit_limit.is_some() {
            config.shared_credit_limit = family.shared_credit_limit;
        }
        if let Some(floor) = family.member_min_floor_pct {
            config.member_min_floor_pct = floor;
        }
        if let Some(weights) = family.role_weights {
            config.member_role_weights.extend(weights);
        }
    }

    if let Some(forecast) = raw.forecast {
        if let Some(n) = forecast.n_estimators {
            config.forecast.n_estimators = n;
        }
        if let Some(seed) = forecast.seed {
            config.forecast.seed = seed;
        }
        if forecast.max_depth.is_some() {
            config.forecast.max_depth = forecast.max_depth;
        }
        if let Some(fraction) = forecast.test_fraction {
            config.forecast.test_fraction = fraction;
        }
        if let Some(rows) = forecast.min_rows_for_split {
            config.forecast.min_rows_for_split = rows;
        }
    }

    if let Some(allocation) = raw.allocation {
        let a = &mut config.allocation;
        if let Some(v) = allocation.essential_trim_pct {
            a.essential_trim_pct = v;
        }
        if let Some(v) = allocation.max_discretionary_cut {
            a.max_discretionary_cut = v;
        }
        if let Some(v) = allocation.fallback_expense_ratio {
            a.fallback_expense_ratio = v;
        }
        if let Some(v) = allocation.opportunity_top_n {
            a.opportunity_top_n = v;
        }
        if let Some(v) = allocation.opportunity_share_pct {
            a.opportunity_share_pct = v;
        }
        if let Some(v) = allocation.opportunity_cut_pct {
            a.opportunity_cut_pct = v;
        }
    }

    if let Some(summary) = raw.summary {
        if let Some(host) = summary.host {
            config.summary.host = host;
        }
        if let Some(model) = summary.model {
            config.summary.model = model;
        }
        if let Some(timeout) = summary.timeout_secs {
            config.summary.timeout_secs = timeout;
        }
        if let Some(audience) = summary.audience {
            config.summary.audience = audience;
        }
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_config() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, RecommenderConfig::default());
        assert_eq!(config.currency_suffix(), "_lkr");
        assert_eq!(config.income_column(), "income_lkr");
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = parse_config(
            r#"
            [defaults]
            currency = "USD"

            [family]
            shared_credit_limit = 50000.0

            [family.role_weights]
            Teen = 0.7
            "#,
        )
        .unwrap();

        assert_eq!(config.income_column(), "income_usd");
        assert_eq!(config.shared_credit_limit, Some(50000.0));
        assert_eq!(config.role_weight("Teen"), 0.7);
        assert_eq!(config.role_weight("Adult"), 1.0);
        assert_eq!(config.role_weight("Child"), 0.6);
        assert_eq!(config.forecast.n_estimators, 120);
    }

    #[test]
    fn test_unknown_role_weighs_one() {
        let config = RecommenderConfig::default();
        assert_eq!(config.role_weight("Grandparent"), 1.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("[defaults]\ntarget_savings_rate = 1.5\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = parse_config("[defaults]\nweeks_per_month = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("weeks_per_month"));

        let err = parse_config("[forecast]\ntest_fraction = 1.0\n").unwrap_err();
        assert!(err.to_string().contains("test_fraction"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = parse_config("this is not toml = = =").unwrap_err();
        assert!(err.to_string().contains("Invalid config TOML"));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hearth.toml");
        fs::write(&path, "[summary]\nmodel = \"gemma3\"\n").unwrap();

        let config = RecommenderConfig::load(Some(&path)).unwrap();
        assert_eq!(config.summary.model, "gemma3");
        assert_eq!(config.summary.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = RecommenderConfig::load(Some(Path::new("/nonexistent/hearth.toml")));
        assert!(matches!(err, Err(Error::Config(_))));
    }
}
