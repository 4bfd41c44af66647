//! Budget session: owns the loaded data, fitted models and latest plan
//!
//! Loading data replaces the previous dataset wholesale and drops the
//! memoised analysis; training replaces all models at once.
//!
//! Every operation runs inside the session's `tracing` span. The default
//! span is `budget_session{mode, currency}`; embedders can supply their own
//! with [`BudgetSession::with_span`].

use std::cell::OnceCell;
use std::path::Path;

use tracing::{info, info_span, Instrument, Span};

use crate::aggregate::{aggregate, HouseholdData};
use crate::allocate;
use crate::analysis::SpendingAnalysis;
use crate::config::{check_rate, RecommenderConfig};
use crate::error::{Error, Result};
use crate::forecast::{self, TrainedModels};
use crate::import::{parse_records, read_csv_path, RawTable};
use crate::models::{AccountMode, Forecast, Horizon, MonthSelector, Recommendations};
use crate::persist::{load_artifact, save_artifact, ModelArtifact};
use crate::report::render_report;
use crate::summary::{friendly_summary, SummaryBackend};

pub struct BudgetSession {
    config: RecommenderConfig,
    mode: AccountMode,
    span: Span,
    data: Option<HouseholdData>,
    analysis: OnceCell<SpendingAnalysis>,
    models: TrainedModels,
    recommendations: Option<Recommendations>,
}

impl BudgetSession {
    pub fn new(config: RecommenderConfig, mode: AccountMode) -> Self {
        let span = info_span!("budget_session", mode = %mode, currency = %config.currency);
        Self {
            config,
            mode,
            span,
            data: None,
            analysis: OnceCell::new(),
            models: TrainedModels::new(),
            recommendations: None,
        }
    }

    /// Replace the span session operations are recorded under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    pub fn mode(&self) -> AccountMode {
        self.mode
    }

    pub fn data(&self) -> Option<&HouseholdData> {
        self.data.as_ref()
    }

    pub fn models(&self) -> &TrainedModels {
        &self.models
    }

    pub fn recommendations(&self) -> Option<&Recommendations> {
        self.recommendations.as_ref()
    }

    /// Load a CSV file, replacing any loaded data
    pub fn load_csv(&mut self, path: &Path) -> Result<&HouseholdData> {
        let span = self.span.clone();
        let _enter = span.enter();

        let table = read_csv_path(path)?;
        self.load_table(&table)
    }

    /// Load an in-memory table, replacing any loaded data
    pub fn load_table(&mut self, table: &RawTable) -> Result<&HouseholdData> {
        let span = self.span.clone();
        let _enter = span.enter();

        let records = parse_records(table, &self.config, self.mode)?;
        let data = aggregate(records, &self.config);
        info!(
            "Data loaded: {} rows, {} months",
            data.summaries.len(),
            data.monthly.len()
        );

        self.analysis = OnceCell::new();
        self.recommendations = None;
        Ok(self.data.insert(data))
    }

    fn require_data(&self) -> Result<&HouseholdData> {
        self.data
            .as_ref()
            .ok_or_else(|| Error::NoData("load data first".into()))
    }

    /// Spending analysis of the loaded data, computed once per dataset
    pub fn analyze_spending_patterns(&self) -> Result<&SpendingAnalysis> {
        let _enter = self.span.enter();
        let data = self.require_data()?;
        Ok(self
            .analysis
            .get_or_init(|| SpendingAnalysis::compute(data, self.config.weeks_per_month)))
    }

    /// Fit one model per forecast target, replacing any previous models
    pub fn build_predictive_models(&mut self) -> Result<&TrainedModels> {
        let span = self.span.clone();
        let _enter = span.enter();

        let data = self.require_data()?;
        let models = forecast::train(&data.monthly, &self.config)?;
        self.models = models;
        Ok(&self.models)
    }

    pub fn predict(&self, horizon: Horizon) -> Result<Forecast> {
        let _enter = self.span.enter();
        if self.models.is_empty() {
            return Err(Error::ModelNotTrained(
                "call build_predictive_models() first".into(),
            ));
        }
        let data = self.require_data()?;
        forecast::predict(&self.models, &data.monthly, horizon)
    }

    /// Forecast for a horizon given as text (`"month"` or `"week"`)
    pub fn predict_budget(&self, horizon: &str) -> Result<Forecast> {
        let _enter = self.span.enter();
        if self.models.is_empty() {
            return Err(Error::ModelNotTrained(
                "call build_predictive_models() first".into(),
            ));
        }
        self.require_data()?;
        self.predict(horizon.parse()?)
    }

    /// Build a budget plan for one month
    ///
    /// `target_savings_rate` defaults to the configured rate.
    pub fn generate_recommendations(
        &mut self,
        target_savings_rate: Option<f64>,
        month: MonthSelector,
    ) -> Result<&Recommendations> {
        let span = self.span.clone();
        let _enter = span.enter();

        let data = self.require_data()?;
        let target = target_savings_rate.unwrap_or(self.config.target_savings_rate);
        check_rate("target_savings_rate", target).map_err(|_| {
            Error::InvalidArgument(format!(
                "target savings rate must be in [0, 1), got {}",
                target
            ))
        })?;

        let month_num = match month {
            MonthSelector::Month(m) => m,
            MonthSelector::Latest => data
                .latest()
                .map(|m| m.month_num)
                .ok_or_else(|| Error::NoData("no months loaded".into()))?,
        };

        let recs = allocate::recommend(data, month_num, target, self.mode, &self.config)?;
        Ok(self.recommendations.insert(recs))
    }

    /// Text report of the latest recommendations
    pub fn report(&self) -> Result<String> {
        let recs = self.recommendations.as_ref().ok_or_else(|| {
            Error::NoData("no recommendations; call generate_recommendations() first".into())
        })?;
        Ok(render_report(recs, &self.config.currency))
    }

    pub fn save_models(&self, path: &Path) -> Result<()> {
        let _enter = self.span.enter();
        if self.models.is_empty() {
            return Err(Error::ModelNotTrained(
                "no models available; call build_predictive_models() first".into(),
            ));
        }
        let artifact = ModelArtifact::new(self.config.clone(), self.models.clone());
        save_artifact(&artifact, path)
    }

    /// Replace models and config with those stored at `path`
    pub fn load_models(&mut self, path: &Path) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();

        let artifact = load_artifact(path)?;
        self.models = artifact.models;
        self.config = artifact.config;
        Ok(())
    }

    /// Ask `backend` for a friendly paraphrase of the latest recommendations
    pub async fn friendly_summary<B>(&self, backend: &B) -> Result<String>
    where
        B: SummaryBackend + ?Sized,
    {
        let recs = self.recommendations.as_ref().ok_or_else(|| {
            Error::NoData("no recommendations; call generate_recommendations() first".into())
        })?;
        Ok(friendly_summary(recs, backend, &self.config.summary.audience)
            .instrument(self.span.clone())
            .await)
    }
}
