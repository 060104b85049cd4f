//! Rule command implementations

use anyhow::Result;
use cinch_core::db::Database;
use cinch_core::models::NewRule;
use cinch_core::RuleFailure;

use super::{
    print_json, resolve_category_arg, resolve_filter_arg, resolve_scope, resolve_tag_arg, Output,
};

pub fn cmd_rules_list(db: &Database) -> Result<()> {
    let rules = db.list_rules()?;

    if rules.is_empty() {
        println!("No rules yet. Add one with:");
        println!("  cinch rules add coffee --filter Coffee --category Coffee");
        return Ok(());
    }

    let snapshot = db.load_snapshot()?;

    println!();
    println!("📋 Rules (applied in order)");
    println!("   ─────────────────────────────────────────────────────────────");

    for rule in rules {
        let filter = snapshot
            .saved_filters
            .get(&rule.filter_id)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| format!("missing filter {}", rule.filter_id));
        let category = snapshot
            .catalog
            .category(rule.set_category_id)
            .map(|c| format!(" → {}", c.name))
            .unwrap_or_default();
        let tags: Vec<&str> = rule
            .add_tag_ids
            .iter()
            .filter_map(|id| snapshot.catalog.tags.get(id))
            .map(|t| t.name.as_str())
            .collect();
        let tags = if tags.is_empty() {
            String::new()
        } else {
            format!(" +[{}]", tags.join(", "))
        };
        let status = if rule.enabled { "" } else { " (disabled)" };

        println!(
            "   [{}] #{} {}: {}{}{}{}",
            rule.id, rule.sort_order, rule.name, filter, category, tags, status
        );
    }

    Ok(())
}

pub fn cmd_rules_add(
    db: &Database,
    name: &str,
    filter: &str,
    category: Option<&str>,
    tags: &[String],
    order: i64,
) -> Result<()> {
    if category.is_none() && tags.is_empty() {
        anyhow::bail!("A rule needs --category, --tag, or both");
    }

    let saved = resolve_filter_arg(db, filter)?;
    let set_category_id = category
        .map(|name| resolve_category_arg(db, name).map(|c| c.id))
        .transpose()?;
    let add_tag_ids = tags
        .iter()
        .map(|name| resolve_tag_arg(db, name).map(|t| t.id))
        .collect::<Result<Vec<_>>>()?;

    let id = db.create_rule(&NewRule {
        name: name.to_string(),
        filter_id: saved.id,
        set_category_id,
        add_tag_ids,
        sort_order: order,
    })?;

    println!("✅ Created rule '{}' (id: {}) using filter '{}'", name, id, saved.name);

    Ok(())
}

pub fn cmd_rules_enable(db: &Database, id: i64, enabled: bool) -> Result<()> {
    if !db.set_rule_enabled(id, enabled)? {
        anyhow::bail!("Rule {} not found", id);
    }
    let state = if enabled { "Enabled" } else { "Disabled" };
    println!("✅ {} rule {}", state, id);
    Ok(())
}

pub fn cmd_rules_delete(db: &Database, id: i64) -> Result<()> {
    if !db.delete_rule(id)? {
        anyhow::bail!("Rule {} not found", id);
    }
    println!("✅ Deleted rule {}", id);
    Ok(())
}

fn print_failures(failures: &[RuleFailure]) {
    if failures.is_empty() {
        return;
    }
    println!();
    println!("   ⚠️  {} rules could not run:", failures.len());
    for f in failures {
        println!("      [{}] {}: {}", f.rule_id, f.rule_name, f.reason);
    }
}

pub fn cmd_rules_dry_run(db: &Database, out: &Output<'_>, accounts: &[String]) -> Result<()> {
    let scope = resolve_scope(db, out, accounts)?;
    let result = db.load_snapshot()?.dry_run_rules(&scope);

    if out.json {
        return print_json(&result);
    }

    println!();
    println!("🧪 Rule Dry Run");
    println!("   ─────────────────────────────");
    for rule in &result.per_rule {
        println!("   {:<24} {:>5} matches", rule.rule_name, rule.match_count);
    }
    println!();
    println!("   Would update:      {}", result.summary.total_modified);
    println!("   Category changes:  {}", result.summary.total_cat_change);
    println!("   Tag changes:       {}", result.summary.total_tag_change);
    print_failures(&result.failures);

    Ok(())
}

pub fn cmd_rules_apply(db: &Database, out: &Output<'_>, accounts: &[String]) -> Result<()> {
    let scope = resolve_scope(db, out, accounts)?;
    let result = db.load_snapshot()?.apply_rules(&scope, db)?;
    if result.failed_rules > 0 {
        tracing::warn!("{} rules skipped during apply", result.failed_rules);
    }

    if out.json {
        return print_json(&result);
    }

    println!();
    println!("⚙️  Applied Rules");
    println!("   ─────────────────────────────");
    println!("   Updated:           {}", result.updated);
    println!("   Category changes:  {}", result.category_changes);
    println!("   Tag changes:       {}", result.tag_changes);
    print_failures(&result.failures);

    if result.updated == 0 && result.failed_rules == 0 {
        println!();
        println!("✅ Everything already matches your rules.");
    }

    Ok(())
}
