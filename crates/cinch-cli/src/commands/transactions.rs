//! Transaction command implementations

use anyhow::{Context, Result};
use chrono::NaiveDate;
use cinch_core::db::Database;
use cinch_core::models::{NewTransaction, TagSource, Transaction};
use cinch_core::AccountScope;

use super::{matching_transactions, print_json, resolve_category_arg, resolve_tag_arg, truncate, Output};

pub fn cmd_transactions_list(
    db: &Database,
    out: &Output<'_>,
    filter: Option<&str>,
    limit: usize,
) -> Result<()> {
    let snapshot = db.load_snapshot()?;
    let transactions: Vec<&Transaction> = match filter {
        Some(expr) => matching_transactions(&snapshot, expr, &AccountScope::all()),
        None => snapshot.transactions.iter().collect(),
    };
    let shown: Vec<&Transaction> = transactions.into_iter().take(limit).collect();

    if out.json {
        return print_json(&shown);
    }

    if shown.is_empty() {
        println!("{}", empty_list_message(filter));
        return Ok(());
    }

    println!();
    println!("📝 Recent Transactions");
    println!("   ─────────────────────────────────────────────────────────────");
    print_transactions(&snapshot.catalog, &shown, out);

    Ok(())
}

pub(crate) fn empty_list_message(filter: Option<&str>) -> String {
    match filter {
        Some(expr) => format!("No transactions match '{}'.", expr),
        None => "No transactions found. Add one with:\n  \
                 cinch transactions add --date 2024-05-01 --amount -4.50 --desc COFFEE"
            .to_string(),
    }
}

pub(crate) fn print_transactions(
    catalog: &cinch_core::Catalog,
    transactions: &[&Transaction],
    out: &Output<'_>,
) {
    for tx in transactions {
        let amount_str = if tx.is_debit() {
            format!("\x1b[31m{}\x1b[0m", out.amount(tx.amount)) // Red for expenses
        } else {
            format!("\x1b[32m+{}\x1b[0m", out.amount(tx.amount)) // Green for income
        };
        let category = catalog
            .category(tx.category_id)
            .map(|c| c.name.as_str())
            .unwrap_or("-");

        println!(
            "   [{}] {} │ {:>10} │ {:<14} │ {}",
            tx.id,
            tx.date,
            amount_str,
            truncate(category, 14),
            truncate(&tx.description, 40)
        );
    }
}

/// Parse a date given as YYYY-MM-DD or MM/DD/YYYY. The second form is kept
/// as the raw date text.
fn parse_date_arg(date: &str) -> Result<(NaiveDate, Option<String>)> {
    if let Ok(d) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Ok((d, None));
    }
    let d = NaiveDate::parse_from_str(date, "%m/%d/%Y")
        .context("Invalid --date format (use YYYY-MM-DD or MM/DD/YYYY)")?;
    Ok((d, Some(date.to_string())))
}

pub fn cmd_transactions_add(
    db: &Database,
    date: &str,
    amount: f64,
    description: &str,
    account: Option<&str>,
    category: Option<&str>,
    tags: &[String],
) -> Result<()> {
    let (date, date_raw) = parse_date_arg(date)?;

    let account_id = account.map(|name| db.upsert_account(name)).transpose()?;
    let category_id = category
        .map(|name| db.upsert_category(name, 0, None))
        .transpose()?;

    let id = db.insert_transaction(&NewTransaction {
        account_id,
        date,
        date_raw,
        description: description.to_string(),
        amount,
        category_id,
    })?;

    for name in tags {
        let tag_id = db.upsert_tag(name, None)?;
        db.add_transaction_tag(id, tag_id, TagSource::Manual)?;
    }

    println!("✅ Added transaction {}: {} │ {:.2} │ {}", id, date, amount, description);

    Ok(())
}

pub fn cmd_transactions_tag(db: &Database, id: i64, tag_name: &str) -> Result<()> {
    let tx = db
        .get_transaction(id)?
        .ok_or_else(|| anyhow::anyhow!("Transaction {} not found", id))?;
    let tag = resolve_tag_arg(db, tag_name)?;

    db.add_transaction_tag(tx.id, tag.id, TagSource::Manual)?;
    println!("✅ Tagged transaction {} with '{}'", id, tag.name);

    Ok(())
}

pub fn cmd_transactions_categorize(db: &Database, id: i64, category: Option<&str>) -> Result<()> {
    let tx = db
        .get_transaction(id)?
        .ok_or_else(|| anyhow::anyhow!("Transaction {} not found", id))?;

    match category {
        Some(name) => {
            let category = resolve_category_arg(db, name)?;
            db.set_transaction_category(tx.id, Some(category.id))?;
            println!("✅ Transaction {} → {}", id, category.name);
        }
        None => {
            db.set_transaction_category(tx.id, None)?;
            println!("✅ Cleared category on transaction {}", id);
        }
    }

    Ok(())
}
