//! Evaluate filter trees against transactions

use chrono::NaiveDate;

use super::ast::{push_flattened, Comparison, Field, FieldPredicate, FieldValue, FilterNode, TextScope};
use crate::catalog::TransactionView;

/// Amounts closer than this compare equal under `amount:`
const AMOUNT_EPSILON: f64 = 0.005;

/// Evaluate an optional filter. No filter matches everything.
pub fn evaluate(filter: Option<&FilterNode>, view: &TransactionView<'_>) -> bool {
    filter.map_or(true, |node| node.matches(view))
}

impl FilterNode {
    pub fn matches(&self, view: &TransactionView<'_>) -> bool {
        match self {
            Self::And(children) => children.iter().all(|c| c.matches(view)),
            Self::Or(children) => children.iter().any(|c| c.matches(view)),
            Self::Field(predicate) => predicate.matches(view),
            Self::Text { text, scope } => {
                let needle = text.to_lowercase();
                match scope {
                    TextScope::Description => contains_ci(&view.transaction.description, &needle),
                    TextScope::Metadata => matches_metadata(view, &needle),
                }
            }
        }
    }
}

impl FieldPredicate {
    pub fn matches(&self, view: &TransactionView<'_>) -> bool {
        let txn = view.transaction;
        match (self.field, &self.value) {
            (Field::Description, FieldValue::Text(s)) => {
                contains_ci(&txn.description, &s.to_lowercase())
            }
            (Field::Category, FieldValue::Text(s)) => view.category.is_some_and(|c| eq_ci(c, s)),
            (Field::Account, FieldValue::Text(s)) => view.account.is_some_and(|a| eq_ci(a, s)),
            (Field::Tag, FieldValue::Text(s)) => view.tags.iter().any(|t| eq_ci(&t.name, s)),
            (Field::Date, FieldValue::Date(span)) => {
                let (start, end) = (span.start, span.end());
                compare_date(txn.date, self.op, start, end)
            }
            (Field::Date, FieldValue::DateRange(lo, hi)) => {
                txn.date >= lo.start && txn.date <= hi.end()
            }
            (Field::Amount, FieldValue::Amount(v)) => compare_amount(txn.amount, self.op, *v),
            (Field::Amount, FieldValue::AmountRange(lo, hi)) => {
                txn.amount >= *lo && txn.amount <= *hi
            }
            // A value of the wrong shape for its field never matches
            _ => false,
        }
    }
}

fn compare_date(date: NaiveDate, op: Comparison, start: NaiveDate, end: NaiveDate) -> bool {
    match op {
        Comparison::Eq => date >= start && date <= end,
        Comparison::Gt => date > end,
        Comparison::Gte => date >= start,
        Comparison::Lt => date < start,
        Comparison::Lte => date <= end,
    }
}

fn compare_amount(amount: f64, op: Comparison, value: f64) -> bool {
    match op {
        Comparison::Eq => (amount - value).abs() < AMOUNT_EPSILON,
        Comparison::Gt => amount > value,
        Comparison::Gte => amount >= value,
        Comparison::Lt => amount < value,
        Comparison::Lte => amount <= value,
    }
}

fn matches_metadata(view: &TransactionView<'_>, needle: &str) -> bool {
    let txn = view.transaction;
    contains_ci(&txn.description, needle)
        || view.category.is_some_and(|c| contains_ci(c, needle))
        || view.tags.iter().any(|t| contains_ci(&t.name, needle))
        || txn.date_raw.as_deref().is_some_and(|d| contains_ci(d, needle))
        || txn.date.format("%Y-%m-%d").to_string().contains(needle)
}

/// `needle` must already be lowercase
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn eq_ci(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// AND two optional filters together. Returns the populated side when only
/// one is present.
pub fn and_filters(a: Option<FilterNode>, b: Option<FilterNode>) -> Option<FilterNode> {
    combine([a, b], true)
}

/// OR any number of optional filters together
pub fn or_filters(filters: impl IntoIterator<Item = Option<FilterNode>>) -> Option<FilterNode> {
    combine(filters, false)
}

fn combine(
    filters: impl IntoIterator<Item = Option<FilterNode>>,
    as_and: bool,
) -> Option<FilterNode> {
    let mut children = Vec::new();
    for node in filters.into_iter().flatten() {
        push_flattened(&mut children, node, as_and);
    }
    match children.len() {
        0 => None,
        1 => children.pop(),
        _ if as_and => Some(FilterNode::And(children)),
        _ => Some(FilterNode::Or(children)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::filter::{parse, parse_strict};
    use crate::models::{Account, Category, Tag, Transaction};

    fn catalog() -> Catalog {
        Catalog::new(
            vec![Category {
                id: 1,
                name: "Dining & Drinks".to_string(),
                sort_order: 0,
                color: None,
            }],
            vec![Account {
                id: 1,
                name: "Checking".to_string(),
            }],
            Vec::new(),
        )
    }

    fn txn() -> Transaction {
        Transaction {
            id: 1,
            account_id: Some(1),
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            date_raw: Some("03/15/2024".to_string()),
            description: "BLUE BOTTLE COFFEE".to_string(),
            amount: -12.5,
            category_id: Some(1),
        }
    }

    fn tags() -> Vec<Tag> {
        vec![Tag {
            id: 1,
            name: "WorkTrip".to_string(),
            color: None,
        }]
    }

    fn check(expr: &str) -> bool {
        let catalog = catalog();
        let t = txn();
        let tags = tags();
        let view = catalog.view(&t, &tags);
        evaluate(parse(expr).as_ref(), &view)
    }

    #[test]
    fn test_no_filter_matches_everything() {
        let catalog = catalog();
        let t = txn();
        assert!(evaluate(None, &catalog.view(&t, &[])));
        assert!(check(""));
    }

    #[test]
    fn test_metadata_fallback_without_fields() {
        assert!(check("coffee"));
        assert!(check("dining"));
        assert!(check("worktrip"));
        assert!(check("03/15"));
        assert!(check("2024-03-15"));
        assert!(!check("groceries"));
    }

    #[test]
    fn test_text_is_description_only_with_field_present() {
        assert!(check("coffee acc:checking"));
        assert!(!check("dining acc:checking"));
        assert!(!check("worktrip acc:checking"));
        assert!(!check("2024-03-15 acc:checking"));
    }

    #[test]
    fn test_text_fields() {
        assert!(check(r#"cat:"dining & drinks""#));
        assert!(!check("cat:Dining"));
        assert!(check("desc:bottle"));
        assert!(check("tag:worktrip"));
        assert!(!check("tag:work"));
        assert!(check("acc:CHECKING"));
    }

    #[test]
    fn test_date_spans() {
        assert!(check("date:2024"));
        assert!(check("date:2024-03"));
        assert!(!check("date:2024-04"));
        assert!(check("date:>2024-02"));
        assert!(!check("date:>2024-03"));
        assert!(check("date:>=2024-03"));
        assert!(check("date:<2024-04"));
        assert!(!check("date:<2024-03"));
        assert!(check("date:<=2024-03"));
        assert!(check("date:2024-01..2024-03"));
        assert!(check("date:2024-03-15..2024-03-15"));
        assert!(!check("date:2024-03-16..2024-12"));
    }

    #[test]
    fn test_amount_is_signed() {
        assert!(check("amount:-12.5"));
        assert!(check("amount:-12.501"));
        assert!(!check("amount:12.5"));
        assert!(check("amount:<0"));
        assert!(check("amount:-20..-10"));
        assert!(!check("amount:10..20"));
    }

    #[test]
    fn test_boolean_composition() {
        assert!(check("coffee OR groceries"));
        assert!(!check("coffee groceries"));
        assert!(check("(tag:none OR cat:\"Dining & Drinks\") desc:coffee"));
    }

    #[test]
    fn test_and_or_helpers() {
        let user = parse_strict("coffee").unwrap();
        let scope = Some(FilterNode::account("Checking"));

        assert_eq!(and_filters(None, None), None);
        assert_eq!(and_filters(user.clone(), None), user);
        assert_eq!(and_filters(None, scope.clone()), scope);

        let both = and_filters(user.clone(), scope.clone()).unwrap();
        assert_eq!(both.leaf_count(), 2);
        assert!(matches!(both, FilterNode::And(_)));

        // nested ANDs are spliced in
        let three = and_filters(Some(both), Some(FilterNode::text("x"))).unwrap();
        match three {
            FilterNode::And(children) => assert_eq!(children.len(), 3),
            other => panic!("unexpected node: {:?}", other),
        }

        let any = or_filters([user, None, scope]).unwrap();
        assert!(matches!(any, FilterNode::Or(ref c) if c.len() == 2));
        assert_eq!(or_filters(Vec::new()), None);
    }

    #[test]
    fn test_layered_scope_keeps_metadata_text() {
        // Composition does not reclassify; the user's text keeps its scope
        let catalog = catalog();
        let t = txn();
        let view = catalog.view(&t, &[]);
        let combined = and_filters(parse("dining"), Some(FilterNode::account("Checking")));
        assert!(evaluate(combined.as_ref(), &view));
    }
}
