//! Filter expression tree and its canonical text form

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A parsed filter expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "node", rename_all = "snake_case")]
pub enum FilterNode {
    /// `field:value` predicate
    Field(FieldPredicate),
    /// All children must match
    And(Vec<FilterNode>),
    /// At least one child must match
    Or(Vec<FilterNode>),
    /// Bare word or quoted string
    Text { text: String, scope: TextScope },
}

/// What a free-text leaf is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextScope {
    /// Description only
    Description,
    /// Description, category name, tag names, raw date and ISO date
    Metadata,
}

/// A transaction attribute a predicate can test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Category,
    Description,
    Account,
    Tag,
    Date,
    Amount,
}

impl Field {
    /// Canonical (short) name used when rendering
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "cat",
            Self::Description => "desc",
            Self::Account => "acc",
            Self::Tag => "tag",
            Self::Date => "date",
            Self::Amount => "amount",
        }
    }

    /// Look up a field by any of its accepted names (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "cat" | "category" => Some(Self::Category),
            "desc" | "description" => Some(Self::Description),
            "acc" | "account" => Some(Self::Account),
            "tag" | "tags" => Some(Self::Tag),
            "date" => Some(Self::Date),
            "amount" | "amt" => Some(Self::Amount),
            _ => None,
        }
    }

    /// Whether `>`/`<` comparisons and `..` ranges apply to this field
    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::Date | Self::Amount)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator between a field and its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// `:` on its own. Substring for descriptions, equality otherwise.
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// How much of a date the user wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePrecision {
    Year,
    Month,
    Day,
}

/// A calendar span written as `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub precision: DatePrecision,
}

impl DateSpan {
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            precision: DatePrecision::Day,
        }
    }

    /// Last day covered by the span (inclusive)
    pub fn end(&self) -> NaiveDate {
        match self.precision {
            DatePrecision::Day => self.start,
            DatePrecision::Month => {
                let (y, m) = if self.start.month() == 12 {
                    (self.start.year() + 1, 1)
                } else {
                    (self.start.year(), self.start.month() + 1)
                };
                NaiveDate::from_ymd_opt(y, m, 1)
                    .and_then(|d| d.pred_opt())
                    .unwrap_or(self.start)
            }
            DatePrecision::Year => {
                NaiveDate::from_ymd_opt(self.start.year(), 12, 31).unwrap_or(self.start)
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end()
    }
}

impl fmt::Display for DateSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.precision {
            DatePrecision::Year => write!(f, "{}", self.start.format("%Y")),
            DatePrecision::Month => write!(f, "{}", self.start.format("%Y-%m")),
            DatePrecision::Day => write!(f, "{}", self.start.format("%Y-%m-%d")),
        }
    }
}

/// Right-hand side of a field predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Date(DateSpan),
    Amount(f64),
    /// Inclusive: start of the low span through end of the high span
    DateRange(DateSpan, DateSpan),
    /// Inclusive on both ends
    AmountRange(f64, f64),
}

/// `field:value`, `field:>value` or `field:lo..hi`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPredicate {
    pub field: Field,
    pub op: Comparison,
    pub value: FieldValue,
}

impl FilterNode {
    /// Free-text leaf matched against the description
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            scope: TextScope::Description,
        }
    }

    /// `field:value` equality/substring predicate on a text field
    pub fn field_text(field: Field, value: impl Into<String>) -> Self {
        Self::Field(FieldPredicate {
            field,
            op: Comparison::Eq,
            value: FieldValue::Text(value.into()),
        })
    }

    /// `acc:"name"`
    pub fn account(name: impl Into<String>) -> Self {
        Self::field_text(Field::Account, name)
    }

    /// Inclusive day-precision date window, e.g. a dashboard period
    pub fn date_between(start: NaiveDate, end: NaiveDate) -> Self {
        Self::Field(FieldPredicate {
            field: Field::Date,
            op: Comparison::Eq,
            value: FieldValue::DateRange(DateSpan::day(start), DateSpan::day(end)),
        })
    }

    /// Whether any node in the tree is a field predicate
    pub fn has_field_predicate(&self) -> bool {
        match self {
            Self::Field(_) => true,
            Self::And(children) | Self::Or(children) => {
                children.iter().any(Self::has_field_predicate)
            }
            Self::Text { .. } => false,
        }
    }

    /// Number of leaves (field predicates and text terms) in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Field(_) | Self::Text { .. } => 1,
            Self::And(children) | Self::Or(children) => {
                children.iter().map(Self::leaf_count).sum()
            }
        }
    }

    fn with_text_scope(self, scope: TextScope) -> Self {
        match self {
            Self::Text { text, .. } => Self::Text { text, scope },
            Self::And(children) => Self::And(
                children
                    .into_iter()
                    .map(|c| c.with_text_scope(scope))
                    .collect(),
            ),
            Self::Or(children) => Self::Or(
                children
                    .into_iter()
                    .map(|c| c.with_text_scope(scope))
                    .collect(),
            ),
            field @ Self::Field(_) => field,
        }
    }
}

/// Metadata fallback: a tree with no field predicate matches its free-text
/// leaves against all transaction metadata, otherwise only the description.
///
/// Applied once, right after parsing.
pub fn reclassify(node: FilterNode) -> FilterNode {
    let scope = if node.has_field_predicate() {
        TextScope::Description
    } else {
        TextScope::Metadata
    };
    node.with_text_scope(scope)
}

/// Append `node` to `out`, splicing its children in when it is the same kind
/// of boolean node.
pub(crate) fn push_flattened(out: &mut Vec<FilterNode>, node: FilterNode, as_and: bool) {
    match node {
        FilterNode::And(children) if as_and => out.extend(children),
        FilterNode::Or(children) if !as_and => out.extend(children),
        other => out.push(other),
    }
}

const RESERVED: &[char] = &['"', '(', ')', '\\'];

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c))
        || s.eq_ignore_ascii_case("or")
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    f.write_str("\"")
}

impl fmt::Display for FieldPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.op.as_str())?;
        match &self.value {
            FieldValue::Text(s) => {
                // An unquoted leading comparison character would be read as an operator
                if needs_quotes(s) || s.starts_with(['>', '<']) {
                    write_quoted(f, s)
                } else {
                    f.write_str(s)
                }
            }
            FieldValue::Date(span) => write!(f, "{}", span),
            FieldValue::Amount(v) => write!(f, "{}", v),
            FieldValue::DateRange(lo, hi) => write!(f, "{}..{}", lo, hi),
            FieldValue::AmountRange(lo, hi) => write!(f, "{}..{}", lo, hi),
        }
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(predicate) => write!(f, "{}", predicate),
            Self::Text { text, .. } => {
                // A bare word containing ':' could be read back as a field predicate
                if needs_quotes(text) || text.contains(':') {
                    write_quoted(f, text)
                } else {
                    f.write_str(text)
                }
            }
            Self::And(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    match child {
                        Self::Or(_) => write!(f, "({})", child)?,
                        _ => write!(f, "{}", child)?,
                    }
                }
                Ok(())
            }
            Self::Or(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" OR ")?;
                    }
                    match child {
                        Self::Or(_) => write!(f, "({})", child)?,
                        _ => write!(f, "{}", child)?,
                    }
                }
                Ok(())
            }
        }
    }
}
