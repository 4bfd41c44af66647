//! Single-account plan: one cut factor for every discretionary category

use crate::config::AllocationSettings;
use crate::models::{BudgetPlan, PlanEntry, PlanLine, Priority};

use super::{protected_entry, MonthContext};

/// Share cut from each discretionary category
///
/// `min(max_cut, reduction / expenses)`, 0 when nothing was spent.
pub(crate) fn discretionary_factor(expenses: f64, reduction_needed: f64, max_cut: f64) -> f64 {
    if expenses > 0.0 {
        max_cut.min(reduction_needed / (expenses + 1e-6))
    } else {
        0.0
    }
}

pub(crate) fn plan(
    ctx: &MonthContext<'_>,
    expenses: f64,
    reduction_needed: f64,
    settings: &AllocationSettings,
) -> BudgetPlan {
    let factor = discretionary_factor(expenses, reduction_needed, settings.max_discretionary_cut);

    let lines = ctx
        .columns
        .iter()
        .map(|column| {
            let amount = ctx.month.category(column);
            let entry = protected_entry(ctx.rules.classify(column), amount, settings)
                .unwrap_or_else(|| PlanEntry::new(amount, amount * (1.0 - factor), Priority::High));
            PlanLine {
                category: ctx.display_name(column),
                column: column.clone(),
                entry,
            }
        })
        .collect();

    BudgetPlan::Single { lines }
}
