//! Lag/rolling features over the monthly series

use serde::Serialize;

use crate::models::MonthlyAggregate;

/// Feature names in model input order
pub const FEATURE_NAMES: [&str; 5] = [
    "month_num",
    "essential_ratio",
    "discretionary_ratio",
    "lag1_total",
    "roll3_total",
];

const ROLLING_WINDOW: usize = 3;

/// Regression inputs for one month
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureRow {
    pub month_num: f64,
    pub essential_ratio: f64,
    pub discretionary_ratio: f64,
    pub lag1_total: f64,
    pub roll3_total: f64,
}

impl FeatureRow {
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "month_num" => Some(self.month_num),
            "essential_ratio" => Some(self.essential_ratio),
            "discretionary_ratio" => Some(self.discretionary_ratio),
            "lag1_total" => Some(self.lag1_total),
            "roll3_total" => Some(self.roll3_total),
            _ => None,
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.month_num,
            self.essential_ratio,
            self.discretionary_ratio,
            self.lag1_total,
            self.roll3_total,
        ]
    }
}

/// One feature row per month of the (sorted) series
///
/// The first month's lag and the first two months' rolling mean have no
/// complete window; they fall back to the series mean.
pub fn build_features(monthly: &[MonthlyAggregate]) -> Vec<FeatureRow> {
    if monthly.is_empty() {
        return Vec::new();
    }
    let totals: Vec<f64> = monthly.iter().map(|m| m.total_expenses).collect();
    let mean = totals.iter().sum::<f64>() / totals.len() as f64;

    monthly
        .iter()
        .enumerate()
        .map(|(i, m)| FeatureRow {
            month_num: m.month_num as f64,
            essential_ratio: m.essential_ratio,
            discretionary_ratio: m.discretionary_ratio,
            lag1_total: if i == 0 { mean } else { totals[i - 1] },
            roll3_total: if i + 1 >= ROLLING_WINDOW {
                totals[i + 1 - ROLLING_WINDOW..=i].iter().sum::<f64>() / ROLLING_WINDOW as f64
            } else {
                mean
            },
        })
        .collect()
}

/// Month number after `month`, wrapping 12 -> 1
pub fn next_month(month: u32) -> u32 {
    if month >= 12 {
        1
    } else {
        month + 1
    }
}

/// Features for the month after the latest one in the series
///
/// Uses the latest month's ratios, its total as the lag, and the mean of
/// the last (up to) three totals as the rolling value.
pub fn next_month_features(monthly: &[MonthlyAggregate]) -> Option<FeatureRow> {
    let last = monthly.last()?;
    let window = &monthly[monthly.len().saturating_sub(ROLLING_WINDOW)..];
    let roll = window.iter().map(|m| m.total_expenses).sum::<f64>() / window.len() as f64;

    Some(FeatureRow {
        month_num: next_month(last.month_num) as f64,
        essential_ratio: last.essential_ratio,
        discretionary_ratio: last.discretionary_ratio,
        lag1_total: last.total_expenses,
        roll3_total: roll,
    })
}
