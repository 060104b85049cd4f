//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AccountScope;
    use crate::rules::{CategoryChange, MutationSink, TransactionMutation};
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn add_txn(db: &Database, account_id: Option<i64>, date: NaiveDate, desc: &str, amount: f64) -> i64 {
        db.insert_transaction(&NewTransaction {
            account_id,
            date,
            date_raw: None,
            description: desc.to_string(),
            amount,
            category_id: None,
        })
        .unwrap()
    }

    fn new_rule(name: &str, filter_id: i64, category: Option<i64>, tags: Vec<i64>, order: i64) -> NewRule {
        NewRule {
            name: name.to_string(),
            filter_id,
            set_category_id: category,
            add_tag_ids: tags,
            sort_order: order,
        }
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        assert!(db.list_accounts().unwrap().is_empty());
        assert!(db.list_transactions().unwrap().is_empty());
    }

    #[test]
    fn test_schema_tables_exist() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        let count: i64 = conn
            .query_row(
                r#"
                SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN (
                    'accounts', 'categories', 'tags', 'transactions', 'transaction_tags',
                    'saved_filters', 'rules', 'rule_tags', 'category_budgets',
                    'budget_overrides', 'spending_targets', 'target_overrides', 'credit_offsets'
                )
                "#,
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 13);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = Database::in_memory().unwrap();
        db.upsert_account("Checking").unwrap();
        db.run_migrations().unwrap();
        assert_eq!(db.list_accounts().unwrap().len(), 1);
    }

    #[test]
    fn test_account_and_category_upsert() {
        let db = Database::in_memory().unwrap();

        let id = db.upsert_account("Checking").unwrap();
        assert_eq!(db.upsert_account("Checking").unwrap(), id);
        assert_eq!(db.get_account_by_name("Checking").unwrap().unwrap().id, id);
        assert!(db.get_account_by_name("Savings").unwrap().is_none());

        let groceries = db.upsert_category("Groceries", 5, Some("#10b981")).unwrap();
        let dining = db.upsert_category("Dining", 1, None).unwrap();
        // case-insensitive lookup, existing order kept
        assert_eq!(db.upsert_category("groceries", 0, None).unwrap(), groceries);

        let categories = db.list_categories().unwrap();
        assert_eq!(
            categories.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![dining, groceries]
        );
        assert_eq!(categories[1].color.as_deref(), Some("#10b981"));
        assert_eq!(
            db.get_category_by_name("DINING").unwrap().unwrap().name,
            "Dining"
        );
    }

    #[test]
    fn test_transaction_roundtrip() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("Card").unwrap();
        let category = db.upsert_category("Coffee", 0, None).unwrap();

        let id = db
            .insert_transaction(&NewTransaction {
                account_id: Some(account),
                date: ymd(2024, 2, 29),
                date_raw: Some("02/29/2024".to_string()),
                description: "BLUE BOTTLE".to_string(),
                amount: -6.25,
                category_id: Some(category),
            })
            .unwrap();

        let tx = db.get_transaction(id).unwrap().unwrap();
        assert_eq!(tx.date, ymd(2024, 2, 29));
        assert_eq!(tx.date_raw.as_deref(), Some("02/29/2024"));
        assert_eq!(tx.amount, -6.25);
        assert_eq!(tx.category_id, Some(category));

        db.set_transaction_category(id, None).unwrap();
        assert_eq!(db.get_transaction(id).unwrap().unwrap().category_id, None);
        assert!(db.get_transaction(id + 100).unwrap().is_none());
    }

    #[test]
    fn test_list_transactions_newest_first() {
        let db = Database::in_memory().unwrap();
        add_txn(&db, None, ymd(2024, 1, 1), "A", -1.0);
        add_txn(&db, None, ymd(2024, 3, 1), "B", -1.0);
        add_txn(&db, None, ymd(2024, 2, 1), "C", -1.0);

        let descriptions: Vec<String> = db
            .list_transactions()
            .unwrap()
            .into_iter()
            .map(|t| t.description)
            .collect();
        assert_eq!(descriptions, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_transaction_tags_and_tag_map() {
        let db = Database::in_memory().unwrap();
        let t1 = add_txn(&db, None, ymd(2024, 1, 1), "A", -1.0);
        let t2 = add_txn(&db, None, ymd(2024, 1, 2), "B", -1.0);
        let work = db.upsert_tag("work", None).unwrap();
        let travel = db.upsert_tag("Travel", Some("#3b82f6")).unwrap();
        assert_eq!(db.upsert_tag("WORK", None).unwrap(), work);

        db.add_transaction_tag(t1, work, TagSource::Manual).unwrap();
        db.add_transaction_tag(t1, travel, TagSource::Rule).unwrap();
        // duplicate attach keeps the original source
        db.add_transaction_tag(t1, work, TagSource::Rule).unwrap();

        let tags = db.get_transaction_tags(t1).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].0.name, "Travel");
        assert_eq!(tags[0].1, TagSource::Rule);
        assert_eq!(tags[1].1, TagSource::Manual);

        let map = db.load_tag_map().unwrap();
        assert_eq!(map.get(&t1).map(Vec::len), Some(2));
        assert!(!map.contains_key(&t2));
    }

    #[test]
    fn test_saved_filters_stored_verbatim() {
        let db = Database::in_memory().unwrap();
        let good = db.create_saved_filter("Coffee", "desc:coffee  OR cat:Coffee").unwrap();
        let bad = db.create_saved_filter("Broken", "cat:").unwrap();

        let filter = db.get_saved_filter(good).unwrap().unwrap();
        assert_eq!(filter.expression, "desc:coffee  OR cat:Coffee");
        assert_eq!(db.get_saved_filter(bad).unwrap().unwrap().expression, "cat:");

        // names are unique
        assert!(db.create_saved_filter("Coffee", "x").is_err());

        assert!(db.delete_saved_filter(bad).unwrap());
        assert!(!db.delete_saved_filter(bad).unwrap());
        assert_eq!(db.list_saved_filters().unwrap().len(), 1);
    }

    #[test]
    fn test_rule_crud() {
        let db = Database::in_memory().unwrap();
        let filter = db.create_saved_filter("Coffee", "coffee").unwrap();
        let category = db.upsert_category("Coffee", 0, None).unwrap();
        let b = db.upsert_tag("b", None).unwrap();
        let a = db.upsert_tag("a", None).unwrap();

        let second = db
            .create_rule(&new_rule("second", filter, None, vec![a, b, a], 10))
            .unwrap();
        let first = db
            .create_rule(&new_rule("first", filter, Some(category), vec![], 1))
            .unwrap();

        let rules = db.list_rules().unwrap();
        assert_eq!(rules.iter().map(|r| r.id).collect::<Vec<_>>(), vec![first, second]);
        assert!(rules.iter().all(|r| r.enabled));
        assert_eq!(rules[0].set_category_id, Some(category));
        assert_eq!(rules[1].add_tag_ids, vec![b, a]);

        assert!(db.set_rule_enabled(second, false).unwrap());
        assert!(!db.list_rules().unwrap()[1].enabled);
        assert!(!db.set_rule_enabled(999, true).unwrap());

        assert!(db.delete_rule(first).unwrap());
        assert_eq!(db.list_rules().unwrap().len(), 1);
    }

    #[test]
    fn test_persist_rule_mutations() {
        let db = Database::in_memory().unwrap();
        let t1 = add_txn(&db, None, ymd(2024, 1, 1), "A", -1.0);
        let category = db.upsert_category("Coffee", 0, None).unwrap();
        let tag = db.upsert_tag("caffeine", None).unwrap();

        db.persist_rule_mutations(&[TransactionMutation {
            transaction_id: t1,
            category: Some(CategoryChange {
                from: None,
                to: category,
            }),
            added_tag_ids: vec![tag],
        }])
        .unwrap();

        assert_eq!(db.get_transaction(t1).unwrap().unwrap().category_id, Some(category));
        let tags = db.get_transaction_tags(t1).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].1, TagSource::Rule);
    }

    #[test]
    fn test_persist_rule_mutations_is_atomic() {
        let db = Database::in_memory().unwrap();
        let t1 = add_txn(&db, None, ymd(2024, 1, 1), "A", -1.0);
        let t2 = add_txn(&db, None, ymd(2024, 1, 2), "B", -1.0);
        let category = db.upsert_category("Coffee", 0, None).unwrap();

        let result = db.persist_rule_mutations(&[
            TransactionMutation {
                transaction_id: t1,
                category: Some(CategoryChange {
                    from: None,
                    to: category,
                }),
                added_tag_ids: vec![],
            },
            TransactionMutation {
                transaction_id: t2,
                category: None,
                // no such tag: violates the foreign key
                added_tag_ids: vec![4242],
            },
        ]);

        assert!(result.is_err());
        assert_eq!(db.get_transaction(t1).unwrap().unwrap().category_id, None);
        assert!(db.load_tag_map().unwrap().is_empty());
    }

    #[test]
    fn test_budget_and_override_upserts() {
        let db = Database::in_memory().unwrap();
        let category = db.upsert_category("Groceries", 0, None).unwrap();

        let id = db.set_category_budget(category, 400.0).unwrap();
        assert_eq!(db.set_category_budget(category, 450.0).unwrap(), id);
        assert_eq!(db.get_category_budget(category).unwrap().unwrap().amount, 450.0);

        db.set_budget_override(id, "2024-12", 600.0).unwrap();
        db.set_budget_override(id, "2024-12", 650.0).unwrap();
        db.set_budget_override(id, "2025-01", 300.0).unwrap();

        let overrides = db.list_budget_overrides().unwrap();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides[0].month, "2024-12");
        assert_eq!(overrides[0].amount, 650.0);
    }

    #[test]
    fn test_targets_and_offsets() {
        let db = Database::in_memory().unwrap();
        let filter = db.create_saved_filter("Trips", "tag:travel").unwrap();
        let target = db
            .create_spending_target("Travel", filter, PeriodType::Quarterly, 900.0)
            .unwrap();
        db.set_target_override(target, "2024-Q3", 1500.0).unwrap();
        db.set_target_override(target, "2024-Q3", 1200.0).unwrap();

        let targets = db.list_spending_targets().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].period, PeriodType::Quarterly);
        let overrides = db.list_target_overrides().unwrap();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].amount, 1200.0);

        let debit = add_txn(&db, None, ymd(2024, 7, 1), "HOTEL", -300.0);
        let credit = add_txn(&db, None, ymd(2024, 7, 9), "HOTEL REFUND", 100.0);
        db.add_credit_offset(credit, debit, 100.0).unwrap();
        let offsets = db.list_credit_offsets().unwrap();
        assert_eq!(offsets[0].debit_transaction_id, debit);

        // referenced transactions must exist
        assert!(db.add_credit_offset(credit, 9999, 1.0).is_err());
    }

    #[test]
    fn test_load_snapshot() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("Checking").unwrap();
        let t1 = add_txn(&db, Some(account), ymd(2024, 1, 1), "A", -10.0);
        let t2 = add_txn(&db, Some(account), ymd(2024, 1, 2), "B", 4.0);
        let tag = db.upsert_tag("work", None).unwrap();
        db.add_transaction_tag(t1, tag, TagSource::Manual).unwrap();
        db.add_credit_offset(t2, t1, 4.0).unwrap();
        let filter = db.create_saved_filter("All A", "desc:a").unwrap();
        db.create_rule(&new_rule("r", filter, None, vec![tag], 0)).unwrap();

        let snapshot = db.load_snapshot().unwrap();
        assert_eq!(snapshot.transactions.len(), 2);
        assert_eq!(snapshot.tag_map.get(&t1).map(Vec::len), Some(1));
        assert!(snapshot.catalog.accounts.contains_key(&account));
        assert!(snapshot.saved_filters.contains_key(&filter));
        assert_eq!(snapshot.rules.len(), 1);
        assert_eq!(snapshot.offsets_by_debit.get(&t1), Some(&4.0));
    }

    #[test]
    fn test_resolve_account_scope() {
        let db = Database::in_memory().unwrap();
        let checking = db.upsert_account("Checking").unwrap();
        db.upsert_account("Card").unwrap();

        assert_eq!(
            db.resolve_account_scope::<&str>(&[]).unwrap(),
            AccountScope::all()
        );
        assert_eq!(
            db.resolve_account_scope(&["Checking"]).unwrap(),
            AccountScope::only([checking])
        );
        assert!(matches!(
            db.resolve_account_scope(&["Brokerage".to_string()]),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_deleted_filter_leaves_rule_failing() {
        let db = Database::in_memory().unwrap();
        add_txn(&db, None, ymd(2024, 1, 1), "COFFEE", -3.0);
        let filter = db.create_saved_filter("Coffee", "coffee").unwrap();
        let category = db.upsert_category("Coffee", 0, None).unwrap();
        db.create_rule(&new_rule("coffee", filter, Some(category), vec![], 0))
            .unwrap();
        db.delete_saved_filter(filter).unwrap();

        let snapshot = db.load_snapshot().unwrap();
        let result = snapshot.apply_rules(&AccountScope::all(), &db).unwrap();
        assert_eq!(result.failed_rules, 1);
        assert_eq!(result.updated, 0);
    }
}
