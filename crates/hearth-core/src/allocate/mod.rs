//! Budget allocation
//!
//! Works out how far a month's spending is above the ceiling implied by a
//! target savings rate, flags large discretionary categories, and spreads
//! the required reduction across categories. Two strategies exist:
//!
//! - `single`: one account, one discretionary cut factor for the month
//! - `family`: reduction shared between members by role-weighted
//!   discretionary spend, with a per-category floor
//!
//! The strategy is picked by [`AccountMode`]; both share the same envelope,
//! opportunity scan and steps.

mod family;
mod single;

use tracing::info;

use crate::aggregate::{category_display_name, CategoryKind, CategoryRules, HouseholdData};
use crate::config::{AllocationSettings, RecommenderConfig};
use crate::error::{Error, Result};
use crate::models::{
    AccountMode, CurrentSituation, MonthlyAggregate, Opportunity, PlanEntry, Priority, Record,
    RecordSummary, Recommendations,
};

/// Rows and totals for the month being planned
pub(crate) struct MonthContext<'a> {
    pub month: &'a MonthlyAggregate,
    /// Expense columns in input order
    pub columns: &'a [String],
    /// Records of the month with their derived figures, input order
    pub rows: Vec<(&'a Record, &'a RecordSummary)>,
    pub rules: CategoryRules,
    pub suffix: String,
}

impl MonthContext<'_> {
    pub fn display_name(&self, column: &str) -> String {
        category_display_name(column, &self.suffix)
    }
}

/// Spending ceiling and the cut needed to reach it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub ceiling: f64,
    pub reduction_needed: f64,
}

/// Ceiling from income and target rate; a shared credit limit can only
/// raise the required reduction.
pub fn envelope(
    income: f64,
    expenses: f64,
    target_savings_rate: f64,
    config: &RecommenderConfig,
) -> Envelope {
    let ceiling = if income > 0.0 {
        income * (1.0 - target_savings_rate)
    } else {
        expenses * config.allocation.fallback_expense_ratio
    };

    let mut reduction_needed = (expenses - ceiling).max(0.0);
    if let Some(cap) = config.shared_credit_limit {
        reduction_needed = reduction_needed.max((expenses - cap).max(0.0));
    }

    Envelope {
        ceiling,
        reduction_needed,
    }
}

/// Plan entry for categories the reduction never reaches
///
/// Non-adjustable lines keep their amount; essential lines get the flat
/// trim. Discretionary columns return `None`.
pub(crate) fn protected_entry(
    kind: CategoryKind,
    amount: f64,
    settings: &AllocationSettings,
) -> Option<PlanEntry> {
    match kind {
        CategoryKind::NonAdjustable => {
            Some(PlanEntry::new(amount, amount, Priority::NonAdjustable))
        }
        CategoryKind::Essential => Some(PlanEntry::new(
            amount,
            amount * (1.0 - settings.essential_trim_pct),
            Priority::Low,
        )),
        CategoryKind::Discretionary => None,
    }
}

/// Large discretionary categories among the month's top spenders
///
/// Flagged independently of whether any reduction is needed.
pub(crate) fn find_opportunities(
    ctx: &MonthContext<'_>,
    settings: &AllocationSettings,
) -> Vec<Opportunity> {
    let total: f64 = ctx.columns.iter().map(|c| ctx.month.category(c)).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut ranked: Vec<(&String, f64)> = ctx
        .columns
        .iter()
        .map(|c| (c, ctx.month.category(c)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    ranked
        .into_iter()
        .take(settings.opportunity_top_n)
        .filter_map(|(column, amount)| {
            let pct = amount / total * 100.0;
            let discretionary = ctx.rules.classify(column) == CategoryKind::Discretionary;
            (pct > settings.opportunity_share_pct && discretionary).then(|| {
                let cut = amount * settings.opportunity_cut_pct;
                Opportunity {
                    category: ctx.display_name(column),
                    current_spending: amount,
                    percentage_of_total: pct,
                    suggested_reduction: cut,
                    potential_monthly_savings: cut,
                }
            })
        })
        .collect()
}

/// Whole-unit amount with thousands separators (`75000.4` -> `75,000`)
pub fn format_amount(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut out = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0.0 && rounded.chars().any(|c| c != '0') {
        out.insert(0, '-');
    }
    out
}

fn actionable_steps(ceiling: f64, opportunities: &[Opportunity], currency: &str) -> Vec<String> {
    let mut steps = vec![
        format!(
            "Set a monthly expense limit of {} {}",
            format_amount(ceiling),
            currency
        ),
        "Track expenses against category limits.".to_string(),
        "Review and optimize top 3 spending categories weekly.".to_string(),
    ];
    steps.extend(opportunities.iter().map(|o| {
        format!(
            "Reduce {} by {} {} this month.",
            o.category,
            format_amount(o.potential_monthly_savings),
            currency
        )
    }));
    steps
}

/// Build recommendations for one month of loaded data
pub fn recommend(
    data: &HouseholdData,
    month_num: u32,
    target_savings_rate: f64,
    mode: AccountMode,
    config: &RecommenderConfig,
) -> Result<Recommendations> {
    let month = data.month(month_num).ok_or_else(|| Error::MonthNotFound {
        month: month_num,
        available: data.months(),
    })?;

    let rows = data
        .table
        .records
        .iter()
        .zip(&data.summaries)
        .filter(|(record, _)| record.month_num == month_num)
        .collect();

    let ctx = MonthContext {
        month,
        columns: &data.table.expense_columns,
        rows,
        rules: CategoryRules::from_config(config),
        suffix: config.currency_suffix(),
    };

    let expenses = month.total_expenses;
    let env = envelope(month.income, expenses, target_savings_rate, config);
    let opportunities = find_opportunities(&ctx, &config.allocation);

    let plan = match mode {
        AccountMode::Single => {
            single::plan(&ctx, expenses, env.reduction_needed, &config.allocation)
        }
        AccountMode::Family => family::plan(&ctx, env.reduction_needed, config),
    };

    info!(
        "Recommendations generated for month {} ({} mode, reduction {:.2})",
        month_num, mode, env.reduction_needed
    );

    Ok(Recommendations {
        current_situation: CurrentSituation {
            month_num,
            monthly_expenses: expenses,
            monthly_income: month.income,
            current_savings_rate: month.savings_rate(),
            target_savings_rate,
            num_months_data: 1,
        },
        target_monthly_expenses: env.ceiling,
        reduction_needed: env.reduction_needed,
        actionable_steps: actionable_steps(env.ceiling, &opportunities, &config.currency),
        opportunities,
        plan,
    })
}
