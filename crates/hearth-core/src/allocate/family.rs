//! Family plan: the reduction is shared between members
//!
//! Each member's share is proportional to their discretionary spend times
//! the weight of their most frequent role in the month. Inside a member,
//! discretionary categories absorb the member's share pro rata, but never
//! drop below `member_min_floor_pct` of their current amount.

use std::collections::BTreeMap;

use crate::aggregate::CategoryKind;
use crate::config::RecommenderConfig;
use crate::models::{BudgetPlan, MemberPlan, MemberSummary, PlanEntry, PlanLine, Priority};

use super::{protected_entry, MonthContext};

#[derive(Default)]
struct MemberStats {
    role_counts: BTreeMap<String, usize>,
    /// Total minus essential spend
    discretionary: f64,
    categories: BTreeMap<String, f64>,
}

impl MemberStats {
    /// Most frequent role; ties go to the alphabetically first
    fn role(&self) -> &str {
        let mut best: Option<(&str, usize)> = None;
        for (role, &count) in &self.role_counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((role, count));
            }
        }
        best.map(|(role, _)| role)
            .unwrap_or(crate::models::DEFAULT_MEMBER_ROLE)
    }
}

pub(crate) fn plan(
    ctx: &MonthContext<'_>,
    reduction_needed: f64,
    config: &RecommenderConfig,
) -> BudgetPlan {
    let mut stats: BTreeMap<&str, MemberStats> = BTreeMap::new();
    let mut first_seen: Vec<&str> = Vec::new();

    for (record, summary) in &ctx.rows {
        let id = record.member_id.as_str();
        if !stats.contains_key(id) {
            first_seen.push(id);
        }
        let member = stats.entry(id).or_default();
        *member.role_counts.entry(record.member_role.clone()).or_insert(0) += 1;
        member.discretionary += summary.non_essential_expenses;
        for column in ctx.columns {
            *member.categories.entry(column.clone()).or_insert(0.0) += record.expense(column);
        }
    }

    let weights: BTreeMap<&str, f64> = stats
        .iter()
        .map(|(&id, member)| (id, member.discretionary * config.role_weight(member.role())))
        .collect();
    let weight_sum: f64 = weights.values().sum();
    let total_weight = if weight_sum > 0.0 { weight_sum } else { 1.0 };
    let allocated: BTreeMap<&str, f64> = weights
        .iter()
        .map(|(&id, w)| (id, reduction_needed * (w / total_weight)))
        .collect();

    let floor_pct = config.member_min_floor_pct;
    let members: Vec<MemberPlan> = stats
        .iter()
        .map(|(&id, member)| {
            let member_cut = allocated.get(id).copied().unwrap_or(0.0);
            let member_disc = if member.discretionary != 0.0 {
                member.discretionary
            } else {
                1e-6
            };

            let lines = ctx
                .columns
                .iter()
                .map(|column| {
                    let amount = member.categories.get(column).copied().unwrap_or(0.0);
                    let kind = ctx.rules.classify(column);
                    let entry = protected_entry(kind, amount, &config.allocation)
                        .unwrap_or_else(|| {
                            let cut = (member_cut * (amount / member_disc)).max(0.0);
                            let recommended = (amount * floor_pct).max(amount - cut);
                            PlanEntry::new(amount, recommended, Priority::High)
                        });
                    PlanLine {
                        category: ctx.display_name(column),
                        column: column.clone(),
                        entry,
                    }
                })
                .collect();

            MemberPlan {
                member_id: id.to_string(),
                lines,
            }
        })
        .collect();

    let household = ctx
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let (current, recommended) = members.iter().fold((0.0, 0.0), |(cur, rec), m| {
                let entry = &m.lines[i].entry;
                (cur + entry.current, rec + entry.recommended)
            });
            PlanLine {
                category: ctx.display_name(column),
                column: column.clone(),
                entry: PlanEntry::new(current, recommended, Priority::Mixed),
            }
        })
        .collect();

    let member_summaries = first_seen
        .iter()
        .filter_map(|&id| {
            let member = stats.get(id)?;
            let plan = members.iter().find(|m| m.member_id == id)?;
            let planned = plan
                .lines
                .iter()
                .filter(|l| ctx.rules.classify(&l.column) == CategoryKind::Discretionary)
                .map(|l| l.entry.recommended)
                .sum::<f64>();
            Some(MemberSummary {
                member_id: id.to_string(),
                role: member.role().to_string(),
                historical_discretionary_monthly: member.discretionary,
                planned_discretionary_monthly: planned,
                allocated_reduction_monthly: allocated.get(id).copied().unwrap_or(0.0),
            })
        })
        .collect();

    BudgetPlan::Family {
        members,
        household,
        member_summaries,
    }
}

#[cfg(test)]
mod tests {
    use crate::aggregate::aggregate;
    use crate::allocate::recommend;
    use crate::config::RecommenderConfig;
    use crate::import::{parse_records, RawTable};
    use crate::models::{AccountMode, BudgetPlan, Priority, Recommendations};

    const HEADERS: [&str; 7] = [
        "month_num",
        "member_id",
        "member_role",
        "income_lkr",
        "rent_lkr",
        "food_lkr",
        "entertainment_lkr",
    ];

    fn run(rows: &[Vec<&str>], target: f64) -> Recommendations {
        let config = RecommenderConfig::default();
        let raw = RawTable::from_rows(&HEADERS, rows);
        let table = parse_records(&raw, &config, AccountMode::Family).unwrap();
        let data = aggregate(table, &config);
        recommend(&data, 1, target, AccountMode::Family, &config).unwrap()
    }

    #[test]
    fn test_role_weighted_shares() {
        let recs = run(
            &[
                vec!["1", "A1", "Adult", "50000", "20000", "10000", "20000"],
                vec!["1", "C1", "Child", "0", "0", "0", "20000"],
            ],
            0.2,
        );
        // income 50000 -> ceiling 40000, expenses 70000
        assert!((recs.reduction_needed - 30_000.0).abs() < 1e-6);

        let BudgetPlan::Family {
            member_summaries, ..
        } = &recs.plan
        else {
            panic!("expected family plan");
        };
        let adult = &member_summaries[0];
        let child = &member_summaries[1];
        assert_eq!(adult.member_id, "A1");
        assert_eq!(child.role, "Child");
        let (a, c) = (
            adult.allocated_reduction_monthly,
            child.allocated_reduction_monthly,
        );
        assert!((a / c - 1.0 / 0.6).abs() < 1e-9);
        assert!((a + c - 30_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_floor_and_protected_lines() {
        let recs = run(
            &[
                vec!["1", "A1", "Adult", "10000", "20000", "10000", "20000"],
                vec!["1", "A2", "Adult", "0", "5000", "0", "1000"],
            ],
            0.5,
        );
        let BudgetPlan::Family {
            members, household, ..
        } = &recs.plan
        else {
            panic!("expected family plan");
        };

        for member in members {
            for line in &member.lines {
                let e = &line.entry;
                assert!(e.reduction >= 0.0);
                assert!((e.current - e.recommended - e.reduction).abs() < 1e-9);
                match e.priority {
                    Priority::High => assert!(e.recommended >= e.current * 0.15 - 1e-9),
                    Priority::NonAdjustable => assert_eq!(e.reduction, 0.0),
                    _ => {}
                }
            }
        }

        // huge reduction: entertainment pinned at the floor
        let a1_fun = &members[0].lines[2].entry;
        assert!((a1_fun.recommended - 3_000.0).abs() < 1e-6);

        let rent = &household[0].entry;
        assert_eq!(rent.current, 25_000.0);
        assert_eq!(rent.reduction, 0.0);
        assert_eq!(rent.priority, Priority::Mixed);
    }

    #[test]
    fn test_role_mode_tie_breaks_alphabetically() {
        let recs = run(
            &[
                vec!["1", "M1", "Dependent", "1000", "0", "0", "100"],
                vec!["1", "M1", "Child", "1000", "0", "0", "100"],
            ],
            0.2,
        );
        let BudgetPlan::Family {
            member_summaries, ..
        } = &recs.plan
        else {
            panic!("expected family plan");
        };
        assert_eq!(member_summaries[0].role, "Child");
    }

    #[test]
    fn test_summaries_follow_input_order() {
        let recs = run(
            &[
                vec!["1", "Z9", "Adult", "1000", "0", "0", "100"],
                vec!["1", "B2", "Adult", "1000", "0", "0", "100"],
            ],
            0.2,
        );
        let BudgetPlan::Family {
            members,
            member_summaries,
            ..
        } = &recs.plan
        else {
            panic!("expected family plan");
        };
        assert_eq!(members[0].member_id, "B2");
        assert_eq!(member_summaries[0].member_id, "Z9");
    }
}
