//! Domain models for Cinch

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A bank account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
}

/// A spending category. A transaction holds at most one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Display order in budget reports (ties broken by id)
    pub sort_order: i64,
    /// Optional color for UI display (e.g., "#10b981")
    pub color: Option<String>,
}

/// A tag that can be attached to any number of transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
}

/// Tags attached to each transaction, keyed by transaction id
pub type TagMap = HashMap<i64, Vec<Tag>>;

/// A financial transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: Option<i64>,
    pub date: NaiveDate,
    /// Date exactly as it appeared in the source statement (e.g. "01/15/2024")
    pub date_raw: Option<String>,
    pub description: String,
    /// Negative = debit/spend, positive = credit
    pub amount: f64,
    pub category_id: Option<i64>,
}

impl Transaction {
    pub fn is_debit(&self) -> bool {
        self.amount < 0.0
    }
}

/// A new transaction (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: Option<i64>,
    pub date: NaiveDate,
    pub date_raw: Option<String>,
    pub description: String,
    pub amount: f64,
    pub category_id: Option<i64>,
}

/// How a tag was attached to a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    /// Attached by the user
    Manual,
    /// Attached by a categorization rule
    Rule,
}

impl TagSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Rule => "rule",
        }
    }
}

impl std::str::FromStr for TagSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "rule" => Ok(Self::Rule),
            _ => Err(format!("Unknown tag source: {}", s)),
        }
    }
}

/// A named filter expression, referenced by rules and spending targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFilter {
    pub id: i64,
    pub name: String,
    /// Filter expression text, stored verbatim as the user typed it
    pub expression: String,
    pub created_at: DateTime<Utc>,
}

/// Saved filters keyed by id
pub type SavedFilterMap = HashMap<i64, SavedFilter>;

/// Index saved filters by id
pub fn saved_filter_map(filters: impl IntoIterator<Item = SavedFilter>) -> SavedFilterMap {
    filters.into_iter().map(|f| (f.id, f)).collect()
}

/// A categorization rule bound to a saved filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub name: String,
    pub filter_id: i64,
    /// Category assigned to every matching transaction
    pub set_category_id: Option<i64>,
    /// Tags attached to every matching transaction
    pub add_tag_ids: Vec<i64>,
    pub enabled: bool,
    /// Application order, ascending. Ties are broken by id.
    pub sort_order: i64,
}

/// A new rule (before DB insertion). Rules are created enabled.
#[derive(Debug, Clone)]
pub struct NewRule {
    pub name: String,
    pub filter_id: i64,
    pub set_category_id: Option<i64>,
    pub add_tag_ids: Vec<i64>,
    pub sort_order: i64,
}

/// A monthly budget amount for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBudget {
    pub id: i64,
    pub category_id: i64,
    pub amount: f64,
}

/// Replaces a category budget's amount for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetOverride {
    pub budget_id: i64,
    /// Month key, `YYYY-MM`
    pub month: String,
    pub amount: f64,
}

/// Length of a spending target's budget period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Monthly,
    Quarterly,
    Annual,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
        }
    }
}

impl std::str::FromStr for PeriodType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" | "month" => Ok(Self::Monthly),
            "quarterly" | "quarter" => Ok(Self::Quarterly),
            "annual" | "yearly" | "year" => Ok(Self::Annual),
            _ => Err(format!("Unknown period type: {}", s)),
        }
    }
}

impl std::fmt::Display for PeriodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A budget for an arbitrary cohort of transactions selected by a saved filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingTarget {
    pub id: i64,
    pub name: String,
    pub filter_id: i64,
    pub period: PeriodType,
    pub amount: f64,
}

/// Replaces a spending target's amount for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOverride {
    pub target_id: i64,
    /// Period key, `YYYY-MM`, `YYYY-Qn` or `YYYY`
    pub period_key: String,
    pub amount: f64,
}

/// A refund or reimbursement that reduces the net spend of one debit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditOffset {
    pub id: i64,
    pub credit_transaction_id: i64,
    pub debit_transaction_id: i64,
    pub amount: f64,
}
