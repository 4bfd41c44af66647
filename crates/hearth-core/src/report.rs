//! Plain-text recommendations report

use std::fmt::Write;

use crate::allocate::format_amount;
use crate::models::{BudgetPlan, PlanLine, Recommendations};

const RULE_WIDTH: usize = 60;

fn plan_lines(out: &mut String, lines: &[PlanLine], indent: &str) {
    for line in lines {
        let e = &line.entry;
        let _ = writeln!(
            out,
            "{}• {}: {} → {} ({} saved)",
            indent,
            line.category,
            format_amount(e.current),
            format_amount(e.recommended),
            format_amount(e.current - e.recommended)
        );
    }
}

/// Render recommendations as the multi-section text report
pub fn render_report(recs: &Recommendations, currency: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let current = &recs.current_situation;
    let mut out = String::new();

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "PERSONALIZED BUDGET RECOMMENDATIONS REPORT");
    let _ = writeln!(out, "{}", rule);

    let _ = writeln!(out, "\n📊 CURRENT FINANCIAL SITUATION (month {}):", current.month_num);
    let _ = writeln!(
        out,
        "Monthly Expenses: {} {}",
        format_amount(current.monthly_expenses),
        currency
    );
    if current.monthly_income > 0.0 {
        let _ = writeln!(
            out,
            "Monthly Income  : {} {}",
            format_amount(current.monthly_income),
            currency
        );
        let _ = writeln!(
            out,
            "Savings Rate    : {:.1}%",
            current.current_savings_rate * 100.0
        );
        let _ = writeln!(
            out,
            "Target Savings  : {:.1}%",
            current.target_savings_rate * 100.0
        );
    }

    let _ = writeln!(out, "\n🎯 OPTIMIZATION OPPORTUNITIES:");
    if recs.opportunities.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for opp in &recs.opportunities {
        let _ = writeln!(
            out,
            "• {}: {} ({:.1}%) → cut {}",
            opp.category,
            format_amount(opp.current_spending),
            opp.percentage_of_total,
            format_amount(opp.potential_monthly_savings)
        );
    }

    let _ = writeln!(out, "\n💰 RECOMMENDED MONTHLY BUDGET:");
    match &recs.plan {
        BudgetPlan::Single { lines } => plan_lines(&mut out, lines, ""),
        BudgetPlan::Family {
            members,
            household,
            member_summaries,
        } => {
            for member in members {
                let _ = writeln!(out, "{}:", member.key());
                plan_lines(&mut out, &member.lines, "  ");
            }
            let _ = writeln!(out, "household:aggregate:");
            plan_lines(&mut out, household, "  ");

            let _ = writeln!(out, "\n👥 MEMBER SUMMARIES:");
            for s in member_summaries {
                let _ = writeln!(
                    out,
                    "• {} ({}): discretionary {} → {} (share of cut {})",
                    s.member_id,
                    s.role,
                    format_amount(s.historical_discretionary_monthly),
                    format_amount(s.planned_discretionary_monthly),
                    format_amount(s.allocated_reduction_monthly)
                );
            }
        }
    }

    let _ = writeln!(out, "\n✅ ACTIONABLE STEPS:");
    for (i, step) in recs.actionable_steps.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, step);
    }

    let _ = write!(out, "\n{}", rule);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CurrentSituation, MemberPlan, MemberSummary, PlanEntry, Priority};

    fn line(category: &str, current: f64, recommended: f64, priority: Priority) -> PlanLine {
        PlanLine {
            category: category.to_string(),
            column: format!("{}_lkr", category.to_lowercase()),
            entry: PlanEntry::new(current, recommended, priority),
        }
    }

    fn recs(plan: BudgetPlan, income: f64) -> Recommendations {
        Recommendations {
            current_situation: CurrentSituation {
                month_num: 3,
                monthly_expenses: 75_000.0,
                monthly_income: income,
                current_savings_rate: 0.25,
                target_savings_rate: 0.2,
                num_months_data: 1,
            },
            target_monthly_expenses: 80_000.0,
            reduction_needed: 0.0,
            opportunities: vec![],
            plan,
            actionable_steps: vec!["Set a monthly expense limit of 80,000 LKR".into()],
        }
    }

    #[test]
    fn test_single_report() {
        let plan = BudgetPlan::Single {
            lines: vec![line("Food", 20_000.0, 19_000.0, Priority::Low)],
        };
        let text = render_report(&recs(plan, 100_000.0), "LKR");

        assert!(text.starts_with(&"=".repeat(60)));
        assert!(text.contains("Monthly Income  : 100,000 LKR"));
        assert!(text.contains("Savings Rate    : 25.0%"));
        assert!(text.contains("• Food: 20,000 → 19,000 (1,000 saved)"));
        assert!(text.contains("1. Set a monthly expense limit of 80,000 LKR"));
    }

    #[test]
    fn test_income_lines_hidden_without_income() {
        let plan = BudgetPlan::Single { lines: vec![] };
        let text = render_report(&recs(plan, 0.0), "LKR");
        assert!(text.contains("Monthly Expenses: 75,000 LKR"));
        assert!(!text.contains("Monthly Income"));
    }

    #[test]
    fn test_family_report_sections() {
        let plan = BudgetPlan::Family {
            members: vec![MemberPlan {
                member_id: "P1".into(),
                lines: vec![line("Fun", 1_000.0, 800.0, Priority::High)],
            }],
            household: vec![line("Fun", 1_000.0, 800.0, Priority::Mixed)],
            member_summaries: vec![MemberSummary {
                member_id: "P1".into(),
                role: "Adult".into(),
                historical_discretionary_monthly: 1_000.0,
                planned_discretionary_monthly: 800.0,
                allocated_reduction_monthly: 200.0,
            }],
        };
        let text = render_report(&recs(plan, 100_000.0), "LKR");
        assert!(text.contains("member:P1:\n  • Fun: 1,000 → 800 (200 saved)"));
        assert!(text.contains("household:aggregate:"));
        assert!(text.contains("• P1 (Adult): discretionary 1,000 → 800"));
    }
}
