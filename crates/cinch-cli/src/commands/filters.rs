//! Filter expression and saved filter commands

use anyhow::Result;
use cinch_core::db::{Database, Snapshot};
use cinch_core::filter::{self, FilterNode};
use cinch_core::models::Transaction;
use cinch_core::AccountScope;
use serde::Serialize;

use super::{print_json, print_transactions, resolve_scope, truncate, Output};

/// In-scope transactions matching `expression`, newest first. The expression
/// is parsed leniently, so malformed input searches as free text.
pub fn matching_transactions<'a>(
    snapshot: &'a Snapshot,
    expression: &str,
    scope: &AccountScope,
) -> Vec<&'a Transaction> {
    let node = filter::parse(expression);
    snapshot
        .transactions
        .iter()
        .filter(|t| scope.contains(t))
        .filter(|t| {
            let tags = snapshot
                .tag_map
                .get(&t.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            filter::evaluate(node.as_ref(), &snapshot.catalog.view(t, tags))
        })
        .collect()
}

#[derive(Serialize)]
struct FilterCheck<'a> {
    expression: &'a str,
    canonical: String,
    has_field_predicate: bool,
    leaf_count: usize,
    tree: &'a FilterNode,
}

pub fn cmd_filter_check(out: &Output<'_>, expression: &str) -> Result<()> {
    let node = match filter::parse_strict(expression) {
        Ok(Some(node)) => node,
        Ok(None) => {
            println!("Empty expression: matches every transaction.");
            return Ok(());
        }
        Err(e) => {
            println!("❌ {}", e);
            if let Some(fallback) = filter::parse(expression) {
                println!("   Searches would treat it as free text: {}", fallback);
            }
            anyhow::bail!("Invalid filter expression: {}", e);
        }
    };

    let check = FilterCheck {
        expression,
        canonical: node.to_string(),
        has_field_predicate: node.has_field_predicate(),
        leaf_count: node.leaf_count(),
        tree: &node,
    };

    if out.json {
        return print_json(&check);
    }

    println!("✅ Valid filter");
    println!("   Canonical: {}", check.canonical);
    println!("   Terms:     {}", check.leaf_count);
    if check.has_field_predicate {
        println!("   Free text matches descriptions only (field predicates present)");
    } else {
        println!("   Free text matches description, category, tags and dates");
    }

    Ok(())
}

pub fn cmd_filter_search(
    db: &Database,
    out: &Output<'_>,
    expression: &str,
    accounts: &[String],
    limit: usize,
) -> Result<()> {
    let scope = resolve_scope(db, out, accounts)?;
    let snapshot = db.load_snapshot()?;
    let matches = matching_transactions(&snapshot, expression, &scope);
    let total = matches.len();
    let shown: Vec<&Transaction> = matches.into_iter().take(limit).collect();

    if out.json {
        return print_json(&shown);
    }

    println!();
    println!("🔍 {} matching transactions", total);
    println!("   ─────────────────────────────────────────────────────────────");
    print_transactions(&snapshot.catalog, &shown, out);

    if total > shown.len() {
        println!("   ... {} more (raise --limit to see them)", total - shown.len());
    }

    Ok(())
}

pub fn cmd_filters_list(db: &Database) -> Result<()> {
    let filters = db.list_saved_filters()?;

    if filters.is_empty() {
        println!("No saved filters. Add one with:");
        println!("  cinch filters add Coffee 'desc:coffee OR cat:Coffee'");
        return Ok(());
    }

    println!();
    println!("💾 Saved Filters");
    println!("   ─────────────────────────────────────────────────────────────");
    for f in filters {
        let status = match filter::parse_bound(&f.expression) {
            Ok(_) => String::new(),
            Err(e) => format!("  ⚠️  {}", e),
        };
        println!(
            "   [{}] {:<20} {}{}",
            f.id,
            truncate(&f.name, 20),
            f.expression,
            status
        );
    }

    Ok(())
}

pub fn cmd_filters_add(db: &Database, name: &str, expression: &str) -> Result<()> {
    let id = db.create_saved_filter(name, expression)?;
    println!("✅ Saved filter '{}' (id: {})", name, id);

    if let Err(e) = filter::parse_bound(expression) {
        println!("   ⚠️  Expression does not parse: {}", e);
        println!("   Rules and targets using it will be reported as failed until it is fixed.");
    }

    Ok(())
}

pub fn cmd_filters_delete(db: &Database, id: i64) -> Result<()> {
    if !db.delete_saved_filter(id)? {
        anyhow::bail!("Saved filter {} not found", id);
    }
    println!("✅ Deleted saved filter {}", id);
    Ok(())
}
