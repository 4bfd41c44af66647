//! Spending analysis command

use std::fmt::Write;
use std::path::Path;

use anyhow::Result;
use hearth_core::aggregate::category_display_name;
use hearth_core::allocate::format_amount;
use hearth_core::SpendingAnalysis;

use super::{open_session, pct, GlobalOptions};

/// Categories listed in the breakdown
const TOP_CATEGORIES: usize = 8;

pub fn cmd_analyze(opts: &GlobalOptions, file: &Path) -> Result<()> {
    let session = open_session(opts, file)?;
    let config = session.config();
    let analysis = session.analyze_spending_patterns()?;

    print!(
        "{}",
        render_analysis(analysis, &config.currency, &config.currency_suffix())
    );
    Ok(())
}

pub fn render_analysis(analysis: &SpendingAnalysis, currency: &str, suffix: &str) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n📊 Spending Analysis");
    let _ = writeln!(out, "   ─────────────────────────────────────────────");
    let _ = writeln!(out, "   Months: {}", analysis.monthly_stats.len());
    let _ = writeln!(out, "   Mean savings rate: {}", pct(analysis.mean_savings_rate));
    let _ = writeln!(
        out,
        "   Months with negative savings: {}",
        analysis.months_negative_savings
    );
    if analysis.outlier_rows > 0 {
        let _ = writeln!(out, "   ⚠️  Outlier rows: {}", analysis.outlier_rows);
    }

    let _ = writeln!(out, "\n📅 Monthly totals ({}):", currency);
    for m in &analysis.monthly_stats {
        let _ = writeln!(
            out,
            "   {:>2}  income {:>12}  spent {:>12}  essential {}",
            m.month_num,
            format_amount(m.income),
            format_amount(m.total_expenses),
            pct(m.essential_ratio)
        );
    }

    let _ = writeln!(out, "\n🏷️  Top categories:");
    for c in analysis.category_breakdown.iter().take(TOP_CATEGORIES) {
        let _ = writeln!(
            out,
            "   {:<20} {:>12}",
            category_display_name(&c.column, suffix),
            format_amount(c.amount)
        );
    }

    if let Some(week) = analysis.weekly_estimates.last() {
        let _ = writeln!(out, "\n🗓️  Weekly estimate (month {}):", week.month_num);
        let _ = writeln!(out, "   Income {:>12}", format_amount(week.weekly_income));
        for (column, amount) in &week.weekly_expenses {
            let _ = writeln!(
                out,
                "   {:<20} {:>12}",
                category_display_name(column, suffix),
                format_amount(*amount)
            );
        }
    }

    out
}
