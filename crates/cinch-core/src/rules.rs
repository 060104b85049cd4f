//! Categorization rule engine
//!
//! Rules run in `sort_order` (ties by id). Each enabled rule is bound to a saved
//! filter; every transaction in scope that the filter matches gets the rule's
//! category (last matching rule wins) and has the rule's tags unioned in.
//!
//! All rules see the transactions as they were passed in, not as earlier rules
//! left them. [`plan_rules`] is the single pass shared by [`apply_rules_to_scope`]
//! and [`dry_run_rules`], so a dry run reports exactly what apply would do.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{AccountScope, Catalog};
use crate::error::Result;
use crate::filter::{self, FilterNode};
use crate::models::{Rule, SavedFilterMap, TagMap, Transaction};

/// A rule that could not be bound to its saved filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleFailure {
    pub rule_id: i64,
    pub rule_name: String,
    pub reason: String,
}

/// How many in-scope transactions a rule's filter matched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleMatchCount {
    pub rule_id: i64,
    pub rule_name: String,
    pub match_count: usize,
}

/// Category reassignment for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryChange {
    pub from: Option<i64>,
    pub to: i64,
}

/// Everything rule application changes on one transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionMutation {
    pub transaction_id: i64,
    /// Set when the final category differs from the original one
    pub category: Option<CategoryChange>,
    /// Tags the transaction did not already carry, ascending
    pub added_tag_ids: Vec<i64>,
}

/// Outcome of one rule pass, before anything is written
#[derive(Debug, Clone, Default, Serialize)]
pub struct RulePlan {
    pub mutations: Vec<TransactionMutation>,
    /// Enabled, bound rules in application order
    pub rule_matches: Vec<RuleMatchCount>,
    pub failures: Vec<RuleFailure>,
}

impl RulePlan {
    /// Distinct transactions with any change
    pub fn updated(&self) -> usize {
        self.mutations.len()
    }

    pub fn category_changes(&self) -> usize {
        self.mutations.iter().filter(|m| m.category.is_some()).count()
    }

    pub fn tag_changes(&self) -> usize {
        self.mutations
            .iter()
            .filter(|m| !m.added_tag_ids.is_empty())
            .count()
    }
}

/// Where rule mutations are written
///
/// Implementations must write the whole batch atomically: on error nothing
/// from the batch may remain.
pub trait MutationSink {
    fn persist_rule_mutations(&self, mutations: &[TransactionMutation]) -> Result<()>;
}

/// Counts from a real rule application
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyResult {
    pub updated: usize,
    pub category_changes: usize,
    pub tag_changes: usize,
    pub failed_rules: usize,
    pub failures: Vec<RuleFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DryRunSummary {
    pub total_modified: usize,
    pub total_cat_change: usize,
    pub total_tag_change: usize,
}

/// Preview of a rule application
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DryRunResult {
    /// Enabled rules that bound successfully, in application order
    pub per_rule: Vec<RuleMatchCount>,
    pub summary: DryRunSummary,
    pub failed_rules: usize,
    pub failures: Vec<RuleFailure>,
}

struct BoundRule<'r> {
    rule: &'r Rule,
    filter: FilterNode,
}

/// Resolve and strictly parse each enabled rule's saved filter, in
/// application order. Rules that fail to bind are returned separately.
fn bind_rules<'r>(
    rules: &'r [Rule],
    saved_filters: &SavedFilterMap,
) -> (Vec<BoundRule<'r>>, Vec<RuleFailure>) {
    let mut ordered: Vec<&Rule> = rules.iter().filter(|r| r.enabled).collect();
    ordered.sort_by_key(|r| (r.sort_order, r.id));

    let mut bound = Vec::with_capacity(ordered.len());
    let mut failures = Vec::new();

    for rule in ordered {
        let result = match saved_filters.get(&rule.filter_id) {
            None => Err(format!("saved filter {} not found", rule.filter_id)),
            Some(saved) => filter::parse_bound(&saved.expression)
                .map_err(|e| format!("saved filter '{}': {}", saved.name, e)),
        };

        match result {
            Ok(filter) => bound.push(BoundRule { rule, filter }),
            Err(reason) => {
                warn!("Skipping rule '{}' ({}): {}", rule.name, rule.id, reason);
                failures.push(RuleFailure {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    reason,
                });
            }
        }
    }

    (bound, failures)
}

/// Working state of one candidate transaction during a pass
struct Working<'t> {
    transaction: &'t Transaction,
    original_tags: BTreeSet<i64>,
    category: Option<i64>,
    added_tags: BTreeSet<i64>,
}

/// Compute what applying `rules` to the in-scope transactions would change
pub fn plan_rules(
    rules: &[Rule],
    transactions: &[Transaction],
    tag_map: &TagMap,
    catalog: &Catalog,
    saved_filters: &SavedFilterMap,
    scope: &AccountScope,
) -> RulePlan {
    let (bound, failures) = bind_rules(rules, saved_filters);

    let mut working: Vec<Working<'_>> = transactions
        .iter()
        .filter(|t| scope.contains(t))
        .map(|t| Working {
            transaction: t,
            original_tags: tag_map
                .get(&t.id)
                .map(|tags| tags.iter().map(|tag| tag.id).collect())
                .unwrap_or_default(),
            category: t.category_id,
            added_tags: BTreeSet::new(),
        })
        .collect();

    let mut rule_matches = Vec::with_capacity(bound.len());

    for BoundRule { rule, filter } in &bound {
        let mut match_count = 0;

        for w in working.iter_mut() {
            let tags = tag_map
                .get(&w.transaction.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            if !filter.matches(&catalog.view(w.transaction, tags)) {
                continue;
            }
            match_count += 1;

            if let Some(category_id) = rule.set_category_id {
                w.category = Some(category_id);
            }
            for tag_id in &rule.add_tag_ids {
                if !w.original_tags.contains(tag_id) {
                    w.added_tags.insert(*tag_id);
                }
            }
        }

        debug!(
            "Rule '{}' ({}) matched {} transactions",
            rule.name, rule.id, match_count
        );
        rule_matches.push(RuleMatchCount {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            match_count,
        });
    }

    let mutations = working
        .into_iter()
        .filter_map(|w| {
            let category = match w.category {
                Some(to) if w.category != w.transaction.category_id => Some(CategoryChange {
                    from: w.transaction.category_id,
                    to,
                }),
                _ => None,
            };
            if category.is_none() && w.added_tags.is_empty() {
                return None;
            }
            Some(TransactionMutation {
                transaction_id: w.transaction.id,
                category,
                added_tag_ids: w.added_tags.into_iter().collect(),
            })
        })
        .collect();

    RulePlan {
        mutations,
        rule_matches,
        failures,
    }
}

/// Apply rules to the in-scope transactions and persist the changes through
/// `sink` as one batch
pub fn apply_rules_to_scope<S: MutationSink + ?Sized>(
    rules: &[Rule],
    transactions: &[Transaction],
    tag_map: &TagMap,
    catalog: &Catalog,
    saved_filters: &SavedFilterMap,
    scope: &AccountScope,
    sink: &S,
) -> Result<ApplyResult> {
    let plan = plan_rules(rules, transactions, tag_map, catalog, saved_filters, scope);

    if !plan.mutations.is_empty() {
        sink.persist_rule_mutations(&plan.mutations)?;
    }

    let result = ApplyResult {
        updated: plan.updated(),
        category_changes: plan.category_changes(),
        tag_changes: plan.tag_changes(),
        failed_rules: plan.failures.len(),
        failures: plan.failures,
    };

    info!(
        "Applied rules: {} updated ({} category, {} tag), {} failed",
        result.updated, result.category_changes, result.tag_changes, result.failed_rules
    );

    Ok(result)
}

/// Preview a rule application without persisting anything
pub fn dry_run_rules(
    rules: &[Rule],
    transactions: &[Transaction],
    tag_map: &TagMap,
    catalog: &Catalog,
    saved_filters: &SavedFilterMap,
    scope: &AccountScope,
) -> DryRunResult {
    let plan = plan_rules(rules, transactions, tag_map, catalog, saved_filters, scope);

    DryRunResult {
        summary: DryRunSummary {
            total_modified: plan.updated(),
            total_cat_change: plan.category_changes(),
            total_tag_change: plan.tag_changes(),
        },
        failed_rules: plan.failures.len(),
        per_rule: plan.rule_matches,
        failures: plan.failures,
    }
}
