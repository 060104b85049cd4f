//! Everything the rule and budget engines read, loaded in one pass

use chrono::NaiveDate;
use tracing::debug;

use super::Database;
use crate::budget::{
    self, compute_budget_lines, compute_target_lines, BudgetLine, Ledger, OffsetMap, TargetReport,
};
use crate::catalog::{AccountScope, Catalog};
use crate::error::{Error, Result};
use crate::models::{
    saved_filter_map, BudgetOverride, CategoryBudget, CreditOffset, Rule, SavedFilterMap,
    SpendingTarget, TagMap, TargetOverride, Transaction,
};
use crate::rules::{apply_rules_to_scope, dry_run_rules, ApplyResult, DryRunResult, MutationSink};

/// Engine inputs as of one moment
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub transactions: Vec<Transaction>,
    pub tag_map: TagMap,
    pub catalog: Catalog,
    pub saved_filters: SavedFilterMap,
    pub rules: Vec<Rule>,
    pub budgets: Vec<CategoryBudget>,
    pub budget_overrides: Vec<BudgetOverride>,
    pub targets: Vec<SpendingTarget>,
    pub target_overrides: Vec<TargetOverride>,
    pub credit_offsets: Vec<CreditOffset>,
    pub offsets_by_debit: OffsetMap,
}

impl Snapshot {
    pub fn ledger<'a>(&'a self, scope: &'a AccountScope) -> Ledger<'a> {
        Ledger {
            transactions: &self.transactions,
            tag_map: &self.tag_map,
            catalog: &self.catalog,
            offsets_by_debit: &self.offsets_by_debit,
            scope,
        }
    }

    /// Apply all enabled rules within `scope`, persisting through `sink`
    pub fn apply_rules<S: MutationSink + ?Sized>(
        &self,
        scope: &AccountScope,
        sink: &S,
    ) -> Result<ApplyResult> {
        apply_rules_to_scope(
            &self.rules,
            &self.transactions,
            &self.tag_map,
            &self.catalog,
            &self.saved_filters,
            scope,
            sink,
        )
    }

    /// Preview [`Snapshot::apply_rules`] for the same scope
    pub fn dry_run_rules(&self, scope: &AccountScope) -> DryRunResult {
        dry_run_rules(
            &self.rules,
            &self.transactions,
            &self.tag_map,
            &self.catalog,
            &self.saved_filters,
            scope,
        )
    }

    pub fn budget_lines(&self, month_key: &str, scope: &AccountScope) -> Result<Vec<BudgetLine>> {
        compute_budget_lines(
            &self.budgets,
            &self.budget_overrides,
            &self.ledger(scope),
            month_key,
        )
    }

    pub fn target_lines(&self, scope: &AccountScope, today: NaiveDate) -> TargetReport {
        compute_target_lines(
            &self.targets,
            &self.target_overrides,
            &self.saved_filters,
            &self.ledger(scope),
            today,
        )
    }
}

impl Database {
    /// Load every engine input
    pub fn load_snapshot(&self) -> Result<Snapshot> {
        let transactions = self.list_transactions()?;
        let catalog = Catalog::new(
            self.list_categories()?,
            self.list_accounts()?,
            self.list_tags()?,
        );
        let credit_offsets = self.list_credit_offsets()?;
        let offsets_by_debit = budget::offsets_by_debit(&credit_offsets);

        let snapshot = Snapshot {
            transactions,
            tag_map: self.load_tag_map()?,
            catalog,
            saved_filters: saved_filter_map(self.list_saved_filters()?),
            rules: self.list_rules()?,
            budgets: self.list_category_budgets()?,
            budget_overrides: self.list_budget_overrides()?,
            targets: self.list_spending_targets()?,
            target_overrides: self.list_target_overrides()?,
            credit_offsets,
            offsets_by_debit,
        };

        debug!(
            "Loaded snapshot: {} transactions, {} rules, {} targets",
            snapshot.transactions.len(),
            snapshot.rules.len(),
            snapshot.targets.len()
        );
        Ok(snapshot)
    }

    /// Map account names to a scope. No names means all accounts; an unknown
    /// name is an error.
    pub fn resolve_account_scope<S: AsRef<str>>(&self, names: &[S]) -> Result<AccountScope> {
        if names.is_empty() {
            return Ok(AccountScope::all());
        }

        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let account = self
                .get_account_by_name(name)?
                .ok_or_else(|| Error::NotFound(format!("Account '{}'", name)))?;
            ids.push(account.id);
        }
        Ok(AccountScope::only(ids))
    }
}
