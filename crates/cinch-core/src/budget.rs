//! Budget and spending-target computation
//!
//! Category budgets are monthly. Spending targets cover whatever cohort their
//! saved filter selects, over a monthly, quarterly or annual period. Both net
//! debit spend against credit offsets:
//!
//! ```text
//! spent     = sum of |amount| over in-window, in-scope debits
//! offsets   = sum of credit offsets recorded against those debits
//! net_spent = spent - offsets
//! remaining = budgeted - net_spent
//! ```
//!
//! Offsets are not clamped to their debit, so net spend can go negative.

use std::collections::HashMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{AccountScope, Catalog};
use crate::error::{Error, Result};
use crate::filter::{self, FilterNode};
use crate::models::{
    BudgetOverride, CategoryBudget, CreditOffset, PeriodType, SavedFilterMap, SpendingTarget,
    TagMap, TargetOverride, Transaction,
};

/// Total offset amount per debit transaction id
pub type OffsetMap = HashMap<i64, f64>;

/// Fold offset records into a debit id -> total map
pub fn offsets_by_debit(offsets: &[CreditOffset]) -> OffsetMap {
    let mut map = OffsetMap::new();
    for offset in offsets {
        *map.entry(offset.debit_transaction_id).or_insert(0.0) += offset.amount;
    }
    map
}

/// A budget period with its override key and `[start, end)` window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    pub kind: PeriodType,
    /// `YYYY-MM`, `YYYY-Qn` or `YYYY`
    pub key: String,
    pub start: NaiveDate,
    /// Exclusive
    pub end: NaiveDate,
}

impl Period {
    /// The period of `kind` that contains `date`
    pub fn containing(kind: PeriodType, date: NaiveDate) -> Self {
        let year = date.year();
        match kind {
            PeriodType::Monthly => Self::build(kind, year, date.month(), 1),
            PeriodType::Quarterly => {
                let quarter = (date.month() - 1) / 3 + 1;
                Self::build(kind, year, (quarter - 1) * 3 + 1, 3)
            }
            PeriodType::Annual => Self::build(kind, year, 1, 12),
        }
    }

    /// Parse a period key: `2024-03`, `2024-Q1` or `2024`
    pub fn parse_key(key: &str) -> Result<Self> {
        let invalid = || Error::InvalidData(format!("Invalid period key: '{}'", key));
        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        let key = key.trim();

        let (year, rest) = match key.split_once('-') {
            Some((y, rest)) => (y, Some(rest)),
            None => (key, None),
        };
        if year.len() != 4 || !all_digits(year) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;

        let (kind, first_month) = match rest {
            None => (PeriodType::Annual, 1),
            Some(q) if q.starts_with(['Q', 'q']) => {
                if !all_digits(&q[1..]) {
                    return Err(invalid());
                }
                let n: u32 = q[1..].parse().map_err(|_| invalid())?;
                if !(1..=4).contains(&n) {
                    return Err(invalid());
                }
                (PeriodType::Quarterly, (n - 1) * 3 + 1)
            }
            Some(m) => {
                if m.len() != 2 || !all_digits(m) {
                    return Err(invalid());
                }
                let month: u32 = m.parse().map_err(|_| invalid())?;
                if !(1..=12).contains(&month) {
                    return Err(invalid());
                }
                (PeriodType::Monthly, month)
            }
        };

        let date = NaiveDate::from_ymd_opt(year, first_month, 1).ok_or_else(invalid)?;
        Ok(Self::containing(kind, date))
    }

    /// Parse a `YYYY-MM` month key
    pub fn parse_month(key: &str) -> Result<Self> {
        let period = Self::parse_key(key)?;
        if period.kind != PeriodType::Monthly {
            return Err(Error::InvalidData(format!(
                "Invalid month '{}' (expected YYYY-MM)",
                key
            )));
        }
        Ok(period)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    fn build(kind: PeriodType, year: i32, first_month: u32, months: u32) -> Self {
        let start = first_of_month(year, first_month);
        let next = first_month + months;
        let end = if next > 12 {
            first_of_month(year + 1, next - 12)
        } else {
            first_of_month(year, next)
        };
        let key = match kind {
            PeriodType::Monthly => format!("{:04}-{:02}", year, first_month),
            PeriodType::Quarterly => format!("{:04}-Q{}", year, (first_month - 1) / 3 + 1),
            PeriodType::Annual => format!("{:04}", year),
        };
        Self {
            kind,
            key,
            start,
            end,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    // month is always 1..=12 here; the fallback only guards chrono's year range
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

/// The transaction data a budget report aggregates over
#[derive(Debug, Clone, Copy)]
pub struct Ledger<'a> {
    pub transactions: &'a [Transaction],
    pub tag_map: &'a TagMap,
    pub catalog: &'a Catalog,
    pub offsets_by_debit: &'a OffsetMap,
    pub scope: &'a AccountScope,
}

#[derive(Debug, Default)]
struct Spend {
    spent: f64,
    offsets: f64,
}

impl Ledger<'_> {
    /// Sum in-scope debits within `period` that satisfy `select`
    fn spend(&self, period: &Period, mut select: impl FnMut(&Transaction) -> bool) -> Spend {
        let mut total = Spend::default();
        for txn in self.transactions {
            if !txn.is_debit() || !period.contains(txn.date) || !self.scope.contains(txn) {
                continue;
            }
            if !select(txn) {
                continue;
            }
            let magnitude = txn.amount.abs();
            total.spent += magnitude;
            if let Some(offset) = self.offsets_by_debit.get(&txn.id) {
                if *offset > magnitude {
                    warn!(
                        "Offsets on transaction {} ({:.2}) exceed its debit ({:.2})",
                        txn.id, offset, magnitude
                    );
                }
                total.offsets += offset;
            }
        }
        total
    }
}

/// One row of the monthly category budget report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetLine {
    pub budget_id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub month: String,
    pub budgeted: f64,
    /// Whether `budgeted` came from a month override
    pub overridden: bool,
    pub spent: f64,
    pub offsets: f64,
    pub net_spent: f64,
    pub remaining: f64,
    pub over_budget: bool,
}

/// Compute budget lines for `month_key` (`YYYY-MM`), ordered by category
/// display order then category id
pub fn compute_budget_lines(
    budgets: &[CategoryBudget],
    overrides: &[BudgetOverride],
    ledger: &Ledger<'_>,
    month_key: &str,
) -> Result<Vec<BudgetLine>> {
    let period = Period::parse_month(month_key)?;

    let month_overrides: HashMap<i64, f64> = overrides
        .iter()
        .filter(|o| o.month == period.key)
        .map(|o| (o.budget_id, o.amount))
        .collect();

    let mut ordered: Vec<&CategoryBudget> = budgets.iter().collect();
    ordered.sort_by_key(|b| {
        let order = ledger
            .catalog
            .categories
            .get(&b.category_id)
            .map_or(i64::MAX, |c| c.sort_order);
        (order, b.category_id)
    });

    let lines = ordered
        .into_iter()
        .map(|budget| {
            let override_amount = month_overrides.get(&budget.id).copied();
            let budgeted = override_amount.unwrap_or(budget.amount);
            let spend = ledger.spend(&period, |t| t.category_id == Some(budget.category_id));
            let net_spent = spend.spent - spend.offsets;
            let remaining = budgeted - net_spent;

            BudgetLine {
                budget_id: budget.id,
                category_id: budget.category_id,
                category_name: ledger
                    .catalog
                    .categories
                    .get(&budget.category_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| format!("#{}", budget.category_id)),
                month: period.key.clone(),
                budgeted,
                overridden: override_amount.is_some(),
                spent: spend.spent,
                offsets: spend.offsets,
                net_spent,
                remaining,
                over_budget: remaining < 0.0,
            }
        })
        .collect();

    Ok(lines)
}

/// One row of the spending target report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetLine {
    pub target_id: i64,
    pub name: String,
    pub period: Period,
    pub budgeted: f64,
    /// Whether `budgeted` came from a period override
    pub overridden: bool,
    pub spent: f64,
    pub offsets: f64,
    pub net_spent: f64,
    pub remaining: f64,
    pub over_budget: bool,
}

fn bind_target_filter(target: &SpendingTarget, saved_filters: &SavedFilterMap) -> Result<FilterNode> {
    let saved = saved_filters.get(&target.filter_id).ok_or_else(|| {
        Error::NotFound(format!(
            "saved filter {} for target '{}'",
            target.filter_id, target.name
        ))
    })?;
    Ok(filter::parse_bound(&saved.expression)?)
}

/// Compute the line for one target in the period containing `today`
pub fn compute_target_line(
    target: &SpendingTarget,
    overrides: &[TargetOverride],
    saved_filters: &SavedFilterMap,
    ledger: &Ledger<'_>,
    today: NaiveDate,
) -> Result<TargetLine> {
    let filter = bind_target_filter(target, saved_filters)?;
    let period = Period::containing(target.period, today);

    let override_amount = overrides
        .iter()
        .find(|o| o.target_id == target.id && o.period_key == period.key)
        .map(|o| o.amount);
    let budgeted = override_amount.unwrap_or(target.amount);

    let spend = ledger.spend(&period, |t| {
        let tags = ledger
            .tag_map
            .get(&t.id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        filter.matches(&ledger.catalog.view(t, tags))
    });
    let net_spent = spend.spent - spend.offsets;
    let remaining = budgeted - net_spent;

    debug!(
        "Target '{}' {}: spent {:.2}, offsets {:.2}",
        target.name, period.key, spend.spent, spend.offsets
    );

    Ok(TargetLine {
        target_id: target.id,
        name: target.name.clone(),
        period,
        budgeted,
        overridden: override_amount.is_some(),
        spent: spend.spent,
        offsets: spend.offsets,
        net_spent,
        remaining,
        over_budget: remaining < 0.0,
    })
}

/// A target whose line could not be computed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetFailure {
    pub target_id: i64,
    pub name: String,
    pub reason: String,
}

/// Lines for every computable target, plus the targets that failed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TargetReport {
    pub lines: Vec<TargetLine>,
    pub failures: Vec<TargetFailure>,
}

/// Compute lines for every target. A target whose filter cannot be bound is
/// reported as a failure without affecting the others.
pub fn compute_target_lines(
    targets: &[SpendingTarget],
    overrides: &[TargetOverride],
    saved_filters: &SavedFilterMap,
    ledger: &Ledger<'_>,
    today: NaiveDate,
) -> TargetReport {
    let mut report = TargetReport::default();
    for target in targets {
        match compute_target_line(target, overrides, saved_filters, ledger, today) {
            Ok(line) => report.lines.push(line),
            Err(e) => {
                warn!("Skipping target '{}' ({}): {}", target.name, target.id, e);
                report.failures.push(TargetFailure {
                    target_id: target.id,
                    name: target.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterError;
    use crate::models::{saved_filter_map, Category, SavedFilter, Tag};
    use chrono::Utc;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn txn(id: i64, date: NaiveDate, amount: f64, category_id: Option<i64>) -> Transaction {
        Transaction {
            id,
            account_id: Some(1),
            date,
            date_raw: None,
            description: format!("TXN {}", id),
            amount,
            category_id,
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                Category {
                    id: 1,
                    name: "Groceries".to_string(),
                    sort_order: 2,
                    color: None,
                },
                Category {
                    id: 2,
                    name: "Dining".to_string(),
                    sort_order: 1,
                    color: None,
                },
                Category {
                    id: 3,
                    name: "Travel".to_string(),
                    sort_order: 1,
                    color: None,
                },
            ],
            Vec::new(),
            Vec::new(),
        )
    }

    #[test]
    fn test_period_keys() {
        let q = Period::containing(PeriodType::Quarterly, ymd(2024, 2, 10));
        assert_eq!(q.key, "2024-Q1");
        assert_eq!(q.start, ymd(2024, 1, 1));
        assert_eq!(q.end, ymd(2024, 4, 1));

        let q4 = Period::containing(PeriodType::Quarterly, ymd(2024, 12, 31));
        assert_eq!(q4.key, "2024-Q4");
        assert_eq!(q4.end, ymd(2025, 1, 1));

        let m = Period::containing(PeriodType::Monthly, ymd(2024, 12, 5));
        assert_eq!(m.key, "2024-12");
        assert!(m.contains(ymd(2024, 12, 31)));
        assert!(!m.contains(ymd(2025, 1, 1)));

        let y = Period::containing(PeriodType::Annual, ymd(2023, 6, 1));
        assert_eq!(y.to_string(), "2023");
        assert_eq!(y.end, ymd(2024, 1, 1));
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(
            Period::parse_key("2024-07").unwrap(),
            Period::containing(PeriodType::Monthly, ymd(2024, 7, 1))
        );
        assert_eq!(Period::parse_key("2024-q3").unwrap().key, "2024-Q3");
        assert_eq!(Period::parse_key("2024").unwrap().kind, PeriodType::Annual);

        for bad in [
            "2024-13", "2024-Q5", "24-01", "2024-1", "march", "", "+024-01", "2024-+1", "2024-Q+1",
            "-024",
        ] {
            assert!(Period::parse_key(bad).is_err(), "accepted {}", bad);
        }
        assert!(Period::parse_month("2024").is_err());
    }

    #[test]
    fn test_offsets_by_debit_sums() {
        let offsets = vec![
            CreditOffset {
                id: 1,
                credit_transaction_id: 10,
                debit_transaction_id: 1,
                amount: 5.0,
            },
            CreditOffset {
                id: 2,
                credit_transaction_id: 11,
                debit_transaction_id: 1,
                amount: 2.5,
            },
        ];
        let map = offsets_by_debit(&offsets);
        assert_eq!(map.get(&1), Some(&7.5));
        assert_eq!(map.get(&10), None);
    }

    #[test]
    fn test_budget_netting_with_override() {
        let transactions = vec![
            txn(1, ymd(2024, 3, 3), -40.0, Some(1)),
            txn(2, ymd(2024, 3, 9), -20.0, Some(1)),
            txn(3, ymd(2024, 3, 12), 20.0, Some(1)),
            txn(4, ymd(2024, 4, 2), -10.0, Some(1)),
        ];
        let offsets = offsets_by_debit(&[CreditOffset {
            id: 1,
            credit_transaction_id: 3,
            debit_transaction_id: 2,
            amount: 20.0,
        }]);
        let catalog = catalog();
        let tag_map = TagMap::new();
        let scope = AccountScope::all();
        let ledger = Ledger {
            transactions: &transactions,
            tag_map: &tag_map,
            catalog: &catalog,
            offsets_by_debit: &offsets,
            scope: &scope,
        };
        let budgets = vec![CategoryBudget {
            id: 1,
            category_id: 1,
            amount: 100.0,
        }];
        let overrides = vec![
            BudgetOverride {
                budget_id: 1,
                month: "2024-03".to_string(),
                amount: 80.0,
            },
            BudgetOverride {
                budget_id: 1,
                month: "2024-04".to_string(),
                amount: 10.0,
            },
        ];

        let lines = compute_budget_lines(&budgets, &overrides, &ledger, "2024-03").unwrap();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.budgeted, 80.0);
        assert!(line.overridden);
        assert_eq!(line.spent, 60.0);
        assert_eq!(line.offsets, 20.0);
        assert_eq!(line.net_spent, 40.0);
        assert_eq!(line.remaining, 40.0);
        assert!(!line.over_budget);

        let lines = compute_budget_lines(&budgets, &[], &ledger, "2024-04").unwrap();
        assert_eq!(lines[0].budgeted, 100.0);
        assert_eq!(lines[0].spent, 10.0);
    }

    #[test]
    fn test_budget_lines_order_and_scope() {
        let mut transactions = vec![txn(1, ymd(2024, 1, 5), -30.0, Some(2))];
        let mut other_account = txn(2, ymd(2024, 1, 6), -500.0, Some(2));
        other_account.account_id = Some(2);
        transactions.push(other_account);

        let catalog = catalog();
        let tag_map = TagMap::new();
        let offsets = OffsetMap::new();
        let scope = AccountScope::only([1]);
        let ledger = Ledger {
            transactions: &transactions,
            tag_map: &tag_map,
            catalog: &catalog,
            offsets_by_debit: &offsets,
            scope: &scope,
        };
        let budgets = vec![
            CategoryBudget {
                id: 1,
                category_id: 1,
                amount: 50.0,
            },
            CategoryBudget {
                id: 2,
                category_id: 3,
                amount: 50.0,
            },
            CategoryBudget {
                id: 3,
                category_id: 2,
                amount: 20.0,
            },
        ];

        let lines = compute_budget_lines(&budgets, &[], &ledger, "2024-01").unwrap();
        assert_eq!(
            lines.iter().map(|l| l.category_name.as_str()).collect::<Vec<_>>(),
            vec!["Dining", "Travel", "Groceries"]
        );
        let dining = &lines[0];
        assert_eq!(dining.spent, 30.0);
        assert_eq!(dining.remaining, -10.0);
        assert!(dining.over_budget);

        assert!(compute_budget_lines(&budgets, &[], &ledger, "2024-1").is_err());
    }

    #[test]
    fn test_offsets_are_not_clamped() {
        let transactions = vec![txn(1, ymd(2024, 1, 5), -10.0, Some(1))];
        let offsets: OffsetMap = [(1, 15.0)].into_iter().collect();
        let catalog = catalog();
        let tag_map = TagMap::new();
        let scope = AccountScope::all();
        let ledger = Ledger {
            transactions: &transactions,
            tag_map: &tag_map,
            catalog: &catalog,
            offsets_by_debit: &offsets,
            scope: &scope,
        };
        let budgets = vec![CategoryBudget {
            id: 1,
            category_id: 1,
            amount: 0.0,
        }];
        let lines = compute_budget_lines(&budgets, &[], &ledger, "2024-01").unwrap();
        assert_eq!(lines[0].net_spent, -5.0);
        assert_eq!(lines[0].remaining, 5.0);
    }

    fn saved(entries: &[(i64, &str)]) -> SavedFilterMap {
        saved_filter_map(entries.iter().map(|(id, expr)| SavedFilter {
            id: *id,
            name: format!("filter {}", id),
            expression: expr.to_string(),
            created_at: Utc::now(),
        }))
    }

    #[test]
    fn test_quarterly_target_line() {
        let transactions = vec![
            txn(1, ymd(2024, 1, 15), -100.0, Some(3)),
            txn(2, ymd(2024, 3, 20), -50.0, None),
            txn(3, ymd(2024, 4, 1), -70.0, Some(3)),
            txn(4, ymd(2024, 2, 1), 30.0, Some(3)),
            txn(5, ymd(2024, 2, 2), -5.0, Some(2)),
        ];
        let mut tag_map = TagMap::new();
        tag_map.insert(
            2,
            vec![Tag {
                id: 1,
                name: "vacation".to_string(),
                color: None,
            }],
        );
        let offsets = offsets_by_debit(&[CreditOffset {
            id: 1,
            credit_transaction_id: 4,
            debit_transaction_id: 1,
            amount: 30.0,
        }]);
        let catalog = catalog();
        let scope = AccountScope::all();
        let ledger = Ledger {
            transactions: &transactions,
            tag_map: &tag_map,
            catalog: &catalog,
            offsets_by_debit: &offsets,
            scope: &scope,
        };
        let target = SpendingTarget {
            id: 7,
            name: "Trips".to_string(),
            filter_id: 1,
            period: PeriodType::Quarterly,
            amount: 150.0,
        };
        let overrides = vec![TargetOverride {
            target_id: 7,
            period_key: "2024-Q1".to_string(),
            amount: 100.0,
        }];
        let filters = saved(&[(1, "cat:Travel OR tag:vacation")]);

        let line =
            compute_target_line(&target, &overrides, &filters, &ledger, ymd(2024, 2, 29)).unwrap();
        assert_eq!(line.period.key, "2024-Q1");
        assert_eq!(line.budgeted, 100.0);
        assert!(line.overridden);
        assert_eq!(line.spent, 150.0);
        assert_eq!(line.offsets, 30.0);
        assert_eq!(line.net_spent, 120.0);
        assert_eq!(line.remaining, -20.0);
        assert!(line.over_budget);

        let q2 = compute_target_line(&target, &overrides, &filters, &ledger, ymd(2024, 5, 1)).unwrap();
        assert_eq!(q2.period.key, "2024-Q2");
        assert_eq!(q2.budgeted, 150.0);
        assert_eq!(q2.spent, 70.0);
    }

    #[test]
    fn test_target_with_unbound_filter_is_an_error() {
        let catalog = catalog();
        let tag_map = TagMap::new();
        let offsets = OffsetMap::new();
        let scope = AccountScope::all();
        let ledger = Ledger {
            transactions: &[],
            tag_map: &tag_map,
            catalog: &catalog,
            offsets_by_debit: &offsets,
            scope: &scope,
        };
        let mut target = SpendingTarget {
            id: 1,
            name: "Trips".to_string(),
            filter_id: 42,
            period: PeriodType::Monthly,
            amount: 10.0,
        };
        let today = ymd(2024, 1, 1);

        let missing = compute_target_line(&target, &[], &saved(&[]), &ledger, today);
        assert!(matches!(missing, Err(Error::NotFound(_))));

        target.filter_id = 1;
        let malformed =
            compute_target_line(&target, &[], &saved(&[(1, "date:never")]), &ledger, today);
        assert!(matches!(
            malformed,
            Err(Error::Filter(FilterError::InvalidDate(_)))
        ));
    }

    #[test]
    fn test_failed_target_does_not_hide_others() {
        let transactions = vec![txn(1, ymd(2024, 1, 5), -80.0, Some(3))];
        let catalog = catalog();
        let tag_map = TagMap::new();
        let offsets = OffsetMap::new();
        let scope = AccountScope::all();
        let ledger = Ledger {
            transactions: &transactions,
            tag_map: &tag_map,
            catalog: &catalog,
            offsets_by_debit: &offsets,
            scope: &scope,
        };
        let targets = vec![
            SpendingTarget {
                id: 1,
                name: "Stale".to_string(),
                filter_id: 99,
                period: PeriodType::Monthly,
                amount: 10.0,
            },
            SpendingTarget {
                id: 2,
                name: "Trips".to_string(),
                filter_id: 1,
                period: PeriodType::Monthly,
                amount: 100.0,
            },
        ];

        let report = compute_target_lines(
            &targets,
            &[],
            &saved(&[(1, "cat:Travel")]),
            &ledger,
            ymd(2024, 1, 20),
        );
        assert_eq!(report.lines.len(), 1);
        assert_eq!(report.lines[0].target_id, 2);
        assert_eq!(report.lines[0].spent, 80.0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].target_id, 1);
        assert!(report.failures[0].reason.contains("saved filter 99"));
    }
}
