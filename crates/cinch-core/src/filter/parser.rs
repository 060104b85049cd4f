//! Recursive-descent parser from tokens to [`FilterNode`]
//!
//! ```text
//! expr  := and ( OR and )*
//! and   := term+
//! term  := "(" expr ")" | field ":" [op] value | field ":" value ".." value | word | "quoted"
//! ```

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::ast::{
    push_flattened, Comparison, DatePrecision, DateSpan, Field, FieldPredicate, FieldValue,
    FilterNode,
};
use super::lexer::Token;
use super::FilterError;

static DATE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})(?:-(\d{1,2})(?:-(\d{1,2}))?)?$").expect("valid regex")
});

static AMOUNT_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])?\$?(\d+(?:\.\d*)?|\.\d+)$").expect("valid regex")
});

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse the full token stream. `Ok(None)` when there are no tokens.
    pub fn parse(mut self) -> Result<Option<FilterNode>, FilterError> {
        if self.tokens.is_empty() {
            return Ok(None);
        }
        let node = self.parse_or()?;
        match self.peek() {
            None => Ok(Some(node)),
            Some(Token::RParen) => Err(FilterError::UnbalancedParens),
            Some(_) => Err(FilterError::DanglingOr),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<FilterNode, FilterError> {
        let mut branches = Vec::new();
        push_flattened(&mut branches, self.parse_and()?, false);

        while self.peek() == Some(&Token::Or) {
            self.advance();
            match self.peek() {
                None | Some(Token::Or) | Some(Token::RParen) => {
                    return Err(FilterError::DanglingOr)
                }
                _ => {}
            }
            push_flattened(&mut branches, self.parse_and()?, false);
        }

        Ok(collapse(branches, false))
    }

    fn parse_and(&mut self) -> Result<FilterNode, FilterError> {
        let mut terms = Vec::new();
        loop {
            match self.peek() {
                None | Some(Token::Or) | Some(Token::RParen) => break,
                _ => {
                    let term = self.parse_term()?;
                    push_flattened(&mut terms, term, true);
                }
            }
        }

        if terms.is_empty() {
            return match self.peek() {
                Some(Token::RParen) => Err(FilterError::UnbalancedParens),
                _ => Err(FilterError::DanglingOr),
            };
        }
        Ok(collapse(terms, true))
    }

    fn parse_term(&mut self) -> Result<FilterNode, FilterError> {
        match self.advance() {
            Some(Token::LParen) => {
                if self.peek() == Some(&Token::RParen) {
                    return Err(FilterError::EmptyGroup);
                }
                if self.peek().is_none() {
                    return Err(FilterError::UnbalancedParens);
                }
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(FilterError::UnbalancedParens),
                }
            }
            Some(Token::Word(word)) => Ok(FilterNode::text(word)),
            Some(Token::Quoted(text)) => Ok(FilterNode::text(text)),
            Some(Token::Field {
                name,
                value,
                quoted,
            }) => parse_field(&name, &value, quoted).map(FilterNode::Field),
            Some(Token::RParen) => Err(FilterError::UnbalancedParens),
            Some(Token::Or) | None => Err(FilterError::DanglingOr),
        }
    }
}

fn collapse(mut nodes: Vec<FilterNode>, as_and: bool) -> FilterNode {
    if nodes.len() == 1 {
        return nodes.remove(0);
    }
    if as_and {
        FilterNode::And(nodes)
    } else {
        FilterNode::Or(nodes)
    }
}

fn parse_field(name: &str, raw: &str, quoted: bool) -> Result<FieldPredicate, FilterError> {
    let field = Field::from_name(name).ok_or_else(|| FilterError::UnknownField(name.to_string()))?;

    let (op, value) = if quoted {
        (Comparison::Eq, raw)
    } else {
        split_operator(raw)
    };

    if value.is_empty() {
        return Err(FilterError::EmptyValue(field.as_str().to_string()));
    }

    if !field.is_ordered() {
        if op != Comparison::Eq {
            return Err(FilterError::UnsupportedOperator {
                field: field.as_str().to_string(),
                op: op.as_str().to_string(),
            });
        }
        return Ok(FieldPredicate {
            field,
            op,
            value: FieldValue::Text(value.to_string()),
        });
    }

    let range = if quoted { None } else { value.split_once("..") };

    let value = match (field, range) {
        (_, Some(_)) if op != Comparison::Eq => {
            return Err(FilterError::UnsupportedOperator {
                field: field.as_str().to_string(),
                op: format!("{}..", op.as_str()),
            })
        }
        (Field::Date, Some((lo, hi))) => {
            let lo = parse_date_span(lo)?;
            let hi = parse_date_span(hi)?;
            if lo.start > hi.end() {
                return Err(FilterError::InvertedRange(format!("{}..{}", lo, hi)));
            }
            FieldValue::DateRange(lo, hi)
        }
        (Field::Amount, Some((lo, hi))) => {
            let lo = parse_amount(lo)?;
            let hi = parse_amount(hi)?;
            if lo > hi {
                return Err(FilterError::InvertedRange(format!("{}..{}", lo, hi)));
            }
            FieldValue::AmountRange(lo, hi)
        }
        (Field::Date, None) => FieldValue::Date(parse_date_span(value)?),
        (_, None) => FieldValue::Amount(parse_amount(value)?),
        (_, Some(_)) => unreachable!("only date and amount fields are ordered"),
    };

    Ok(FieldPredicate { field, op, value })
}

fn split_operator(raw: &str) -> (Comparison, &str) {
    if let Some(rest) = raw.strip_prefix(">=") {
        (Comparison::Gte, rest)
    } else if let Some(rest) = raw.strip_prefix("<=") {
        (Comparison::Lte, rest)
    } else if let Some(rest) = raw.strip_prefix('>') {
        (Comparison::Gt, rest)
    } else if let Some(rest) = raw.strip_prefix('<') {
        (Comparison::Lt, rest)
    } else {
        (Comparison::Eq, raw)
    }
}

/// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
pub(crate) fn parse_date_span(s: &str) -> Result<DateSpan, FilterError> {
    let invalid = || FilterError::InvalidDate(s.to_string());
    let caps = DATE_SHAPE.captures(s).ok_or_else(invalid)?;

    let year: i32 = caps[1].parse().map_err(|_| invalid())?;
    let month: Option<u32> = match caps.get(2) {
        Some(m) => Some(m.as_str().parse().map_err(|_| invalid())?),
        None => None,
    };
    let day: Option<u32> = match caps.get(3) {
        Some(d) => Some(d.as_str().parse().map_err(|_| invalid())?),
        None => None,
    };

    let (start, precision) = match (month, day) {
        (None, _) => (NaiveDate::from_ymd_opt(year, 1, 1), DatePrecision::Year),
        (Some(m), None) => (NaiveDate::from_ymd_opt(year, m, 1), DatePrecision::Month),
        (Some(m), Some(d)) => (NaiveDate::from_ymd_opt(year, m, d), DatePrecision::Day),
    };

    Ok(DateSpan {
        start: start.ok_or_else(invalid)?,
        precision,
    })
}

fn parse_amount(s: &str) -> Result<f64, FilterError> {
    let invalid = || FilterError::InvalidAmount(s.to_string());
    let caps = AMOUNT_SHAPE.captures(s).ok_or_else(invalid)?;
    let magnitude: f64 = caps[2].parse().map_err(|_| invalid())?;
    if !magnitude.is_finite() {
        return Err(invalid());
    }
    match caps.get(1).map(|m| m.as_str()) {
        Some("-") => Ok(-magnitude),
        _ => Ok(magnitude),
    }
}
