//! Lookup tables the engines need alongside the transactions themselves
//!
//! Transactions only carry category and account ids. Filter evaluation works on
//! names, so a [`Catalog`] resolves a transaction into a [`TransactionView`]
//! before it is matched.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{Account, Category, Tag, Transaction};

/// Categories, accounts and tags indexed by id
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub categories: HashMap<i64, Category>,
    pub accounts: HashMap<i64, Account>,
    pub tags: HashMap<i64, Tag>,
}

impl Catalog {
    pub fn new(
        categories: impl IntoIterator<Item = Category>,
        accounts: impl IntoIterator<Item = Account>,
        tags: impl IntoIterator<Item = Tag>,
    ) -> Self {
        Self {
            categories: categories.into_iter().map(|c| (c.id, c)).collect(),
            accounts: accounts.into_iter().map(|a| (a.id, a)).collect(),
            tags: tags.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    pub fn category(&self, id: Option<i64>) -> Option<&Category> {
        id.and_then(|id| self.categories.get(&id))
    }

    pub fn account(&self, id: Option<i64>) -> Option<&Account> {
        id.and_then(|id| self.accounts.get(&id))
    }

    /// Resolve a transaction and its tags into a view the evaluator can match
    pub fn view<'a>(&'a self, transaction: &'a Transaction, tags: &'a [Tag]) -> TransactionView<'a> {
        TransactionView {
            transaction,
            tags,
            category: self
                .category(transaction.category_id)
                .map(|c| c.name.as_str()),
            account: self.account(transaction.account_id).map(|a| a.name.as_str()),
        }
    }
}

/// A transaction together with everything a filter can reference
#[derive(Debug, Clone, Copy)]
pub struct TransactionView<'a> {
    pub transaction: &'a Transaction,
    pub tags: &'a [Tag],
    pub category: Option<&'a str>,
    pub account: Option<&'a str>,
}

/// The set of accounts an operation is restricted to
///
/// An empty scope places no account restriction. A non-empty scope excludes
/// transactions that have no account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountScope {
    account_ids: BTreeSet<i64>,
}

impl AccountScope {
    /// No account restriction
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to the given accounts
    pub fn only(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            account_ids: ids.into_iter().collect(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.account_ids.is_empty()
    }

    pub fn account_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.account_ids.iter().copied()
    }

    pub fn contains(&self, transaction: &Transaction) -> bool {
        if self.account_ids.is_empty() {
            return true;
        }
        transaction
            .account_id
            .is_some_and(|id| self.account_ids.contains(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn txn(account_id: Option<i64>) -> Transaction {
        Transaction {
            id: 1,
            account_id,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            date_raw: None,
            description: "COFFEE".to_string(),
            amount: -4.5,
            category_id: Some(7),
        }
    }

    #[test]
    fn test_empty_scope_contains_everything() {
        let scope = AccountScope::all();
        assert!(scope.is_unrestricted());
        assert!(scope.contains(&txn(Some(1))));
        assert!(scope.contains(&txn(None)));
    }

    #[test]
    fn test_scope_excludes_other_and_missing_accounts() {
        let scope = AccountScope::only([1, 2]);
        assert!(scope.contains(&txn(Some(2))));
        assert!(!scope.contains(&txn(Some(3))));
        assert!(!scope.contains(&txn(None)));
    }

    #[test]
    fn test_view_resolves_names() {
        let catalog = Catalog::new(
            vec![Category {
                id: 7,
                name: "Dining".to_string(),
                sort_order: 0,
                color: None,
            }],
            vec![Account {
                id: 1,
                name: "Checking".to_string(),
            }],
            Vec::new(),
        );
        let t = txn(Some(1));
        let view = catalog.view(&t, &[]);
        assert_eq!(view.category, Some("Dining"));
        assert_eq!(view.account, Some("Checking"));

        let orphan = txn(Some(99));
        assert_eq!(catalog.view(&orphan, &[]).account, None);
    }
}
