//! Domain models for Hearth

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Member id used when rows carry no member information
pub const HOUSEHOLD_MEMBER_ID: &str = "H1";

/// Role used when rows carry no role information
pub const DEFAULT_MEMBER_ROLE: &str = "Adult";

/// How the household's records are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountMode {
    /// One account; member columns are ignored
    #[default]
    Single,
    /// Several members; reductions are shared by role weight
    Family,
}

impl AccountMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Family => "family",
        }
    }
}

impl std::str::FromStr for AccountMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "family" => Ok(Self::Family),
            _ => Err(format!("Unknown account mode: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One input row: a month (and member) worth of income and expenses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Month number 1..=12
    pub month_num: u32,
    pub member_id: String,
    pub member_role: String,
    pub income: f64,
    /// Expense column name -> amount
    pub expenses: BTreeMap<String, f64>,
}

impl Record {
    pub fn expense(&self, column: &str) -> f64 {
        self.expenses.get(column).copied().unwrap_or(0.0)
    }
}

/// Validated, coerced input records
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTable {
    pub income_column: String,
    /// Expense columns in input order
    pub expense_columns: Vec<String>,
    pub records: Vec<Record>,
}

/// Derived per-row figures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    pub month_num: u32,
    pub member_id: String,
    pub total_expenses: f64,
    pub essential_expenses: f64,
    pub non_essential_expenses: f64,
    pub savings: f64,
    pub savings_rate: f64,
    /// 1.5xIQR flag on total expenses (informational only)
    pub is_outlier: bool,
}

/// Household totals for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub month_num: u32,
    pub income: f64,
    /// Expense column name -> summed amount
    pub categories: BTreeMap<String, f64>,
    pub total_expenses: f64,
    pub essential_expenses: f64,
    pub non_essential_expenses: f64,
    pub essential_ratio: f64,
    pub discretionary_ratio: f64,
}

impl MonthlyAggregate {
    pub fn category(&self, column: &str) -> f64 {
        self.categories.get(column).copied().unwrap_or(0.0)
    }

    /// Savings rate for the month (0 when there is no income)
    pub fn savings_rate(&self) -> f64 {
        if self.income > 0.0 {
            (self.income - self.total_expenses) / self.income
        } else {
            0.0
        }
    }
}

/// Forecast period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizon {
    Month,
    /// Derived from the monthly forecast with a fixed weekly profile
    Week,
}

impl Horizon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Week => "week",
        }
    }
}

impl std::str::FromStr for Horizon {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "month" => Ok(Self::Month),
            "week" => Ok(Self::Week),
            _ => Err(Error::InvalidArgument(format!(
                "horizon must be 'week' or 'month', got '{}'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which month a recommendation is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthSelector {
    /// Highest month number present
    #[default]
    Latest,
    Month(u32),
}

impl std::str::FromStr for MonthSelector {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        s.parse::<u32>().map(Self::Month).map_err(|_| {
            Error::InvalidArgument(format!("month must be 'latest' or a number, got '{}'", s))
        })
    }
}

/// Point estimate with a symmetric MAE band (low clamped at zero)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub point: f64,
    pub low: f64,
    pub high: f64,
}

impl Prediction {
    pub fn with_error(point: f64, error: f64) -> Self {
        let point = point.max(0.0);
        Self {
            point,
            low: (point - error).max(0.0),
            high: (point + error).max(0.0),
        }
    }
}

/// Next-month forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthForecast {
    /// Month being forecast (wraps 12 -> 1)
    pub month_num: u32,
    pub total: Prediction,
    pub essential: Prediction,
    pub discretionary: Prediction,
}

/// Four-week spending profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyBreakdown {
    pub total: [f64; 4],
    pub essential: [f64; 4],
    pub discretionary: [f64; 4],
    pub total_low: [f64; 4],
    pub total_high: [f64; 4],
}

/// Next-week forecast derived from the monthly one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekForecast {
    /// Always true: weeks are profiled, not modelled
    pub estimated: bool,
    pub predicted_expenses: f64,
    pub predicted_essential: f64,
    pub predicted_discretionary: f64,
    pub breakdown: WeeklyBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "horizon", rename_all = "lowercase")]
pub enum Forecast {
    Month(MonthForecast),
    Week(WeekForecast),
}

impl Forecast {
    pub fn horizon(&self) -> Horizon {
        match self {
            Self::Month(_) => Horizon::Month,
            Self::Week(_) => Horizon::Week,
        }
    }

    /// Predicted total spend for the horizon
    pub fn predicted_expenses(&self) -> f64 {
        match self {
            Self::Month(m) => m.total.point,
            Self::Week(w) => w.predicted_expenses,
        }
    }
}

/// How strongly a plan line is cut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "Non-adjustable")]
    NonAdjustable,
    /// Essential: small flat trim
    Low,
    /// Discretionary: absorbs the required reduction
    High,
    /// Household aggregate of member plans
    Mixed,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonAdjustable => "Non-adjustable",
            Self::Low => "Low",
            Self::High => "High",
            Self::Mixed => "Mixed",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current vs recommended amount for one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub current: f64,
    pub recommended: f64,
    /// Always `max(0, current - recommended)`
    pub reduction: f64,
    pub priority: Priority,
}

impl PlanEntry {
    pub fn new(current: f64, recommended: f64, priority: Priority) -> Self {
        Self {
            current,
            recommended,
            reduction: (current - recommended).max(0.0),
            priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanLine {
    /// Display name (e.g. "Loan Payment")
    pub category: String,
    /// Source column (e.g. "loan_payment_lkr")
    pub column: String,
    pub entry: PlanEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberPlan {
    pub member_id: String,
    pub lines: Vec<PlanLine>,
}

impl MemberPlan {
    /// Plan key used in reports (`member:<id>`)
    pub fn key(&self) -> String {
        format!("member:{}", self.member_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub member_id: String,
    pub role: String,
    pub historical_discretionary_monthly: f64,
    pub planned_discretionary_monthly: f64,
    pub allocated_reduction_monthly: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum BudgetPlan {
    Single {
        lines: Vec<PlanLine>,
    },
    Family {
        members: Vec<MemberPlan>,
        /// Per-category sums across all member plans
        household: Vec<PlanLine>,
        member_summaries: Vec<MemberSummary>,
    },
}

impl BudgetPlan {
    /// Every plan line, member lines included
    pub fn all_lines(&self) -> Vec<&PlanLine> {
        match self {
            Self::Single { lines } => lines.iter().collect(),
            Self::Family {
                members, household, ..
            } => members
                .iter()
                .flat_map(|m| m.lines.iter())
                .chain(household.iter())
                .collect(),
        }
    }
}

/// A large discretionary category worth cutting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub category: String,
    pub current_spending: f64,
    pub percentage_of_total: f64,
    pub suggested_reduction: f64,
    pub potential_monthly_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentSituation {
    pub month_num: u32,
    pub monthly_expenses: f64,
    pub monthly_income: f64,
    pub current_savings_rate: f64,
    pub target_savings_rate: f64,
    pub num_months_data: usize,
}

/// Output of one allocator run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub current_situation: CurrentSituation,
    /// Expense ceiling implied by the target savings rate
    pub target_monthly_expenses: f64,
    pub reduction_needed: f64,
    pub opportunities: Vec<Opportunity>,
    pub plan: BudgetPlan,
    pub actionable_steps: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizon_parse() {
        assert_eq!("month".parse::<Horizon>().unwrap(), Horizon::Month);
        assert_eq!(" Week ".parse::<Horizon>().unwrap(), Horizon::Week);
        let err = "day".parse::<Horizon>().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_month_selector_parse() {
        assert_eq!("latest".parse::<MonthSelector>().unwrap(), MonthSelector::Latest);
        assert_eq!("3".parse::<MonthSelector>().unwrap(), MonthSelector::Month(3));
        assert!(matches!(
            "march".parse::<MonthSelector>(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_account_mode_parse() {
        assert_eq!("Family".parse::<AccountMode>().unwrap(), AccountMode::Family);
        assert!("shared".parse::<AccountMode>().is_err());
        assert_eq!(AccountMode::default(), AccountMode::Single);
    }

    #[test]
    fn test_prediction_band_clamped() {
        let p = Prediction::with_error(100.0, 250.0);
        assert_eq!(p.point, 100.0);
        assert_eq!(p.low, 0.0);
        assert_eq!(p.high, 350.0);

        let negative = Prediction::with_error(-5.0, 1.0);
        assert_eq!(negative.point, 0.0);
        assert_eq!(negative.low, 0.0);
    }

    #[test]
    fn test_plan_entry_reduction_never_negative() {
        let entry = PlanEntry::new(100.0, 120.0, Priority::High);
        assert_eq!(entry.reduction, 0.0);
        let entry = PlanEntry::new(100.0, 80.0, Priority::High);
        assert_eq!(entry.reduction, 20.0);
    }

    #[test]
    fn test_priority_serializes_with_label() {
        let json = serde_json::to_string(&Priority::NonAdjustable).unwrap();
        assert_eq!(json, "\"Non-adjustable\"");
    }
}
