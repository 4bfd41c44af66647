//! Household aggregation
//!
//! Turns coerced records into per-row summaries (totals, savings rate,
//! outlier flags) and a household-per-month series sorted by month.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::RecommenderConfig;
use crate::models::{MonthlyAggregate, Record, RecordSummary, RecordTable};

/// How an expense column is treated by the allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    /// Never reduced
    NonAdjustable,
    /// Protected; only a small flat trim
    Essential,
    /// Absorbs required reductions
    Discretionary,
}

/// Keyword rules classifying expense columns
///
/// Keywords match as substrings of the column name. The essential sum
/// used for aggregation matches the name as written; plan classification
/// matches the lowercased name. Non-adjustable wins over essential.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRules {
    essential: Vec<String>,
    non_adjustable: Vec<String>,
}

impl CategoryRules {
    pub fn new(essential: Vec<String>, non_adjustable: Vec<String>) -> Self {
        Self {
            essential,
            non_adjustable,
        }
    }

    pub fn from_config(config: &RecommenderConfig) -> Self {
        Self::new(
            config.essential_categories.clone(),
            config.non_adjustable_categories.clone(),
        )
    }

    pub fn is_essential(&self, column: &str) -> bool {
        self.essential.iter().any(|k| column.contains(k.as_str()))
    }

    pub fn is_non_adjustable(&self, column: &str) -> bool {
        self.non_adjustable.iter().any(|k| column.contains(k.as_str()))
    }

    /// Plan classification, matched against the lowercased column name
    pub fn classify(&self, column: &str) -> CategoryKind {
        let column = column.to_lowercase();
        if self.is_non_adjustable(&column) {
            CategoryKind::NonAdjustable
        } else if self.is_essential(&column) {
            CategoryKind::Essential
        } else {
            CategoryKind::Discretionary
        }
    }
}

/// Human-readable category name: `loan_payment_lkr` -> `Loan Payment`
pub fn category_display_name(column: &str, suffix: &str) -> String {
    column
        .strip_suffix(suffix)
        .unwrap_or(column)
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Loaded dataset: records, per-row summaries and the monthly series
#[derive(Debug, Clone)]
pub struct HouseholdData {
    pub table: RecordTable,
    pub summaries: Vec<RecordSummary>,
    /// One entry per month, sorted ascending, months unique
    pub monthly: Vec<MonthlyAggregate>,
}

impl HouseholdData {
    /// Months present, ascending
    pub fn months(&self) -> Vec<u32> {
        self.monthly.iter().map(|m| m.month_num).collect()
    }

    pub fn month(&self, month_num: u32) -> Option<&MonthlyAggregate> {
        self.monthly.iter().find(|m| m.month_num == month_num)
    }

    pub fn latest(&self) -> Option<&MonthlyAggregate> {
        self.monthly.last()
    }

    /// Records belonging to one month
    pub fn records_for_month(&self, month_num: u32) -> Vec<&Record> {
        self.table
            .records
            .iter()
            .filter(|r| r.month_num == month_num)
            .collect()
    }
}

/// Build per-row summaries and the household monthly aggregate
pub fn aggregate(table: RecordTable, config: &RecommenderConfig) -> HouseholdData {
    let rules = CategoryRules::from_config(config);
    let summaries = summarize_records(&table, &rules, config.outlier_threshold);
    let monthly = aggregate_monthly(&table, &summaries);

    if monthly.len() < config.min_months_for_training {
        warn!(
            "Only {} month(s) present; training is best with >= {} months",
            monthly.len(),
            config.min_months_for_training
        );
    }
    debug!(
        "Aggregated {} rows into {} months",
        summaries.len(),
        monthly.len()
    );

    HouseholdData {
        table,
        summaries,
        monthly,
    }
}

/// Totals, essential split, savings and outlier flag for each record
pub fn summarize_records(
    table: &RecordTable,
    rules: &CategoryRules,
    outlier_threshold: f64,
) -> Vec<RecordSummary> {
    let essential_columns: Vec<&String> = table
        .expense_columns
        .iter()
        .filter(|c| rules.is_essential(c))
        .collect();

    let mut summaries: Vec<RecordSummary> = table
        .records
        .iter()
        .map(|record| {
            let total: f64 = table.expense_columns.iter().map(|c| record.expense(c)).sum();
            let essential: f64 = essential_columns.iter().map(|c| record.expense(c)).sum();
            let savings = record.income - total;
            RecordSummary {
                month_num: record.month_num,
                member_id: record.member_id.clone(),
                total_expenses: total,
                essential_expenses: essential,
                non_essential_expenses: total - essential,
                savings,
                savings_rate: if record.income > 0.0 {
                    savings / record.income
                } else {
                    0.0
                },
                is_outlier: false,
            }
        })
        .collect();

    let totals: Vec<f64> = summaries.iter().map(|s| s.total_expenses).collect();
    if let Some((low, high)) = iqr_fences(&totals, outlier_threshold) {
        for summary in &mut summaries {
            summary.is_outlier = summary.total_expenses < low || summary.total_expenses > high;
        }
    }

    summaries
}

/// Sum records per month and derive ratios
pub fn aggregate_monthly(
    table: &RecordTable,
    summaries: &[RecordSummary],
) -> Vec<MonthlyAggregate> {
    let mut by_month: BTreeMap<u32, MonthlyAggregate> = BTreeMap::new();

    for (record, summary) in table.records.iter().zip(summaries) {
        let entry = by_month
            .entry(record.month_num)
            .or_insert_with(|| MonthlyAggregate {
                month_num: record.month_num,
                income: 0.0,
                categories: table
                    .expense_columns
                    .iter()
                    .map(|c| (c.clone(), 0.0))
                    .collect(),
                total_expenses: 0.0,
                essential_expenses: 0.0,
                non_essential_expenses: 0.0,
                essential_ratio: 0.0,
                discretionary_ratio: 0.0,
            });

        entry.income += record.income;
        entry.total_expenses += summary.total_expenses;
        entry.essential_expenses += summary.essential_expenses;
        entry.non_essential_expenses += summary.non_essential_expenses;
        for (column, amount) in &record.expenses {
            *entry.categories.entry(column.clone()).or_insert(0.0) += amount;
        }
    }

    by_month
        .into_values()
        .map(|mut month| {
            if month.total_expenses > 0.0 {
                month.essential_ratio = month.essential_expenses / month.total_expenses;
                month.discretionary_ratio = month.non_essential_expenses / month.total_expenses;
            }
            month
        })
        .collect()
}

/// Quantile with linear interpolation between closest ranks
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// (Q1 - t*IQR, Q3 + t*IQR)
fn iqr_fences(values: &[f64], threshold: f64) -> Option<(f64, f64)> {
    let q1 = quantile(values, 0.25)?;
    let q3 = quantile(values, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - threshold * iqr, q3 + threshold * iqr))
}
