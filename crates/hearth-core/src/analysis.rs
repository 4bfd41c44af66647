//! Spending pattern analysis over a loaded dataset

use serde::Serialize;

use crate::aggregate::HouseholdData;
use crate::models::MonthlyAggregate;

/// Total spend for one expense column across all rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub column: String,
    pub amount: f64,
}

/// Uniform weekly split of one month (monthly figure / weeks per month)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyEstimate {
    pub month_num: u32,
    pub weekly_income: f64,
    /// (column, weekly amount) in input column order
    pub weekly_expenses: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingAnalysis {
    pub monthly_stats: Vec<MonthlyAggregate>,
    /// Sorted by amount, largest first
    pub category_breakdown: Vec<CategoryTotal>,
    /// Mean of per-row savings rates
    pub mean_savings_rate: f64,
    pub months_negative_savings: usize,
    pub outlier_rows: usize,
    pub weekly_estimates: Vec<WeeklyEstimate>,
}

impl SpendingAnalysis {
    pub fn compute(data: &HouseholdData, weeks_per_month: f64) -> Self {
        let columns = &data.table.expense_columns;

        let mut category_breakdown: Vec<CategoryTotal> = columns
            .iter()
            .map(|column| CategoryTotal {
                column: column.clone(),
                amount: data.table.records.iter().map(|r| r.expense(column)).sum(),
            })
            .collect();
        category_breakdown.sort_by(|a, b| b.amount.total_cmp(&a.amount));

        let rows = data.summaries.len();
        let mean_savings_rate = if rows > 0 {
            data.summaries.iter().map(|s| s.savings_rate).sum::<f64>() / rows as f64
        } else {
            0.0
        };

        let weekly_estimates = data
            .monthly
            .iter()
            .map(|m| WeeklyEstimate {
                month_num: m.month_num,
                weekly_income: m.income / weeks_per_month,
                weekly_expenses: columns
                    .iter()
                    .map(|c| (c.clone(), m.category(c) / weeks_per_month))
                    .collect(),
            })
            .collect();

        Self {
            monthly_stats: data.monthly.clone(),
            category_breakdown,
            mean_savings_rate,
            months_negative_savings: data.summaries.iter().filter(|s| s.savings < 0.0).count(),
            outlier_rows: data.summaries.iter().filter(|s| s.is_outlier).count(),
            weekly_estimates,
        }
    }
}
