//! Budget, spending target and credit offset commands

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use cinch_core::db::Database;
use cinch_core::models::PeriodType;
use cinch_core::Period;

use super::{print_json, resolve_category_arg, resolve_filter_arg, resolve_scope, truncate, Output};

fn current_month() -> String {
    Utc::now().date_naive().format("%Y-%m").to_string()
}

pub fn cmd_budget_show(
    db: &Database,
    out: &Output<'_>,
    month: Option<&str>,
    accounts: &[String],
) -> Result<()> {
    let month = month.map(str::to_string).unwrap_or_else(current_month);
    let scope = resolve_scope(db, out, accounts)?;
    let lines = db
        .load_snapshot()?
        .budget_lines(&month, &scope)
        .with_context(|| format!("Failed to compute budget for {}", month))?;

    if out.json {
        return print_json(&lines);
    }

    if lines.is_empty() {
        println!("No budgets yet. Set one with:");
        println!("  cinch budget set Groceries 400");
        return Ok(());
    }

    println!();
    println!("💰 Budget for {}", month);
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:<20} {:>11} {:>11} {:>11} {:>11}",
        "Category", "Budgeted", "Spent", "Offsets", "Remaining"
    );

    let mut budgeted = 0.0;
    let mut net_spent = 0.0;
    for line in &lines {
        let marker = if line.over_budget { " ⚠️" } else { "" };
        let overridden = if line.overridden { "*" } else { " " };
        println!(
            "   {:<20} {:>10}{} {:>11} {:>11} {:>11}{}",
            truncate(&line.category_name, 20),
            out.amount(line.budgeted),
            overridden,
            out.amount(line.spent),
            out.amount(line.offsets),
            out.amount(line.remaining),
            marker
        );
        budgeted += line.budgeted;
        net_spent += line.net_spent;
    }

    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Total: {} budgeted, {} net spent, {} remaining",
        out.amount(budgeted),
        out.amount(net_spent),
        out.amount(budgeted - net_spent)
    );
    if lines.iter().any(|l| l.overridden) {
        println!("   * overridden for this month");
    }

    Ok(())
}

pub fn cmd_budget_set(
    db: &Database,
    out: &Output<'_>,
    category: &str,
    amount: f64,
    month: Option<&str>,
) -> Result<()> {
    let category = resolve_category_arg(db, category)?;

    match month {
        Some(month) => {
            let period = Period::parse_month(month)?;
            let budget = db
                .get_category_budget(category.id)?
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "'{}' has no budget to override. Set one first: cinch budget set {} AMOUNT",
                        category.name,
                        category.name
                    )
                })?;
            db.set_budget_override(budget.id, &period.key, amount)?;
            println!(
                "✅ {} budget for {} set to {}",
                category.name,
                period.key,
                out.amount(amount)
            );
        }
        None => {
            db.set_category_budget(category.id, amount)?;
            println!(
                "✅ {} monthly budget set to {}",
                category.name,
                out.amount(amount)
            );
        }
    }

    Ok(())
}

pub fn cmd_targets_list(
    db: &Database,
    out: &Output<'_>,
    date: Option<&str>,
    accounts: &[String],
) -> Result<()> {
    let today = date
        .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
        .transpose()
        .context("Invalid --date format (use YYYY-MM-DD)")?
        .unwrap_or_else(|| Utc::now().date_naive());
    let scope = resolve_scope(db, out, accounts)?;
    let report = db.load_snapshot()?.target_lines(&scope, today);
    tracing::debug!(
        "Computed {} target lines ({} failed) for {}",
        report.lines.len(),
        report.failures.len(),
        today
    );

    if out.json {
        return print_json(&report);
    }

    if report.lines.is_empty() && report.failures.is_empty() {
        println!("No spending targets yet. Add one with:");
        println!("  cinch targets add Travel --filter Trips --period quarterly 1500");
        return Ok(());
    }

    println!();
    println!("🎯 Spending Targets");
    println!("   ─────────────────────────────────────────────────────────────");
    for line in &report.lines {
        let marker = if line.over_budget { " ⚠️" } else { "" };
        let overridden = if line.overridden { " (override)" } else { "" };
        println!(
            "   [{}] {:<20} {:<8} {} of {}{}, {} left{}",
            line.target_id,
            truncate(&line.name, 20),
            line.period.key,
            out.amount(line.net_spent),
            out.amount(line.budgeted),
            overridden,
            out.amount(line.remaining),
            marker
        );
    }
    for failure in &report.failures {
        println!(
            "   [{}] {:<20} ❌ {}",
            failure.target_id,
            truncate(&failure.name, 20),
            failure.reason
        );
    }

    Ok(())
}

pub fn cmd_targets_add(
    db: &Database,
    name: &str,
    filter: &str,
    period: &str,
    amount: f64,
) -> Result<()> {
    let period: PeriodType = period.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let saved = resolve_filter_arg(db, filter)?;

    let id = db.create_spending_target(name, saved.id, period, amount)?;
    println!(
        "✅ Created {} target '{}' (id: {}) using filter '{}'",
        period.as_str(),
        name,
        id,
        saved.name
    );

    Ok(())
}

pub fn cmd_targets_override(db: &Database, id: i64, key: &str, amount: f64) -> Result<()> {
    let target = db
        .list_spending_targets()?
        .into_iter()
        .find(|t| t.id == id)
        .ok_or_else(|| anyhow::anyhow!("Target {} not found", id))?;
    let period = Period::parse_key(key)?;

    if period.kind != target.period {
        anyhow::bail!(
            "'{}' is a {} key but target '{}' is {}",
            key,
            period.kind.as_str(),
            target.name,
            target.period.as_str()
        );
    }

    db.set_target_override(id, &period.key, amount)?;
    println!("✅ Target '{}' for {} set to {:.2}", target.name, period.key, amount);

    Ok(())
}

pub fn cmd_offsets_add(db: &Database, credit: i64, debit: i64, amount: f64) -> Result<()> {
    let credit_tx = db
        .get_transaction(credit)?
        .ok_or_else(|| anyhow::anyhow!("Transaction {} not found", credit))?;
    let debit_tx = db
        .get_transaction(debit)?
        .ok_or_else(|| anyhow::anyhow!("Transaction {} not found", debit))?;

    if credit_tx.is_debit() {
        anyhow::bail!("Transaction {} is not a credit", credit);
    }
    if !debit_tx.is_debit() {
        anyhow::bail!("Transaction {} is not a debit", debit);
    }
    if amount <= 0.0 {
        anyhow::bail!("Offset amount must be positive");
    }

    let id = db.add_credit_offset(credit, debit, amount)?;
    println!(
        "✅ Offset {}: {:.2} of '{}' against '{}'",
        id, amount, credit_tx.description, debit_tx.description
    );

    Ok(())
}
