//! Account, category and tag commands

use anyhow::Result;
use cinch_core::db::Database;
use cinch_core::models::{Category, SavedFilter, Tag};

pub fn cmd_accounts_list(db: &Database) -> Result<()> {
    let accounts = db.list_accounts()?;

    if accounts.is_empty() {
        println!("No accounts yet. Add one with:");
        println!("  cinch accounts add Checking");
        return Ok(());
    }

    println!();
    println!("🏦 Accounts");
    println!("   ─────────────────────────────");
    for account in accounts {
        println!("   [{}] {}", account.id, account.name);
    }

    Ok(())
}

pub fn cmd_accounts_add(db: &Database, name: &str) -> Result<()> {
    let id = db.upsert_account(name)?;
    println!("✅ Account '{}' (id: {})", name, id);
    Ok(())
}

pub fn cmd_categories_list(db: &Database) -> Result<()> {
    let categories = db.list_categories()?;

    if categories.is_empty() {
        println!("No categories yet. Add one with:");
        println!("  cinch categories add Groceries");
        return Ok(());
    }

    println!();
    println!("📂 Categories");
    println!("   ─────────────────────────────");
    for category in categories {
        let color = category
            .color
            .as_ref()
            .map(|c| format!(" [{}]", c))
            .unwrap_or_default();
        println!(
            "   [{}] {}{} (order {})",
            category.id, category.name, color, category.sort_order
        );
    }

    Ok(())
}

pub fn cmd_categories_add(
    db: &Database,
    name: &str,
    order: i64,
    color: Option<&str>,
) -> Result<()> {
    let id = db.upsert_category(name, order, color)?;
    println!("✅ Category '{}' (id: {})", name, id);
    Ok(())
}

pub fn cmd_tags_list(db: &Database) -> Result<()> {
    let tags = db.list_tags()?;

    if tags.is_empty() {
        println!("No tags yet. Add one with:");
        println!("  cinch tags add travel");
        return Ok(());
    }

    println!();
    println!("🏷️  Tags");
    println!("   ─────────────────────────────");
    for tag in tags {
        let color = tag
            .color
            .as_ref()
            .map(|c| format!(" [{}]", c))
            .unwrap_or_default();
        println!("   [{}] {}{}", tag.id, tag.name, color);
    }

    Ok(())
}

pub fn cmd_tags_add(db: &Database, name: &str, color: Option<&str>) -> Result<()> {
    let id = db.upsert_tag(name, color)?;
    println!("✅ Tag '{}' (id: {})", name, id);
    Ok(())
}

/// Resolve an existing category by name (case-insensitive)
pub fn resolve_category_arg(db: &Database, name: &str) -> Result<Category> {
    db.get_category_by_name(name)?
        .ok_or_else(|| anyhow::anyhow!("Category not found: {}", name))
}

/// Resolve an existing tag by name (case-insensitive)
pub fn resolve_tag_arg(db: &Database, name: &str) -> Result<Tag> {
    db.get_tag_by_name(name)?
        .ok_or_else(|| anyhow::anyhow!("Tag not found: {}", name))
}

/// Resolve a saved filter by ID, or by name if the argument is not numeric
pub fn resolve_filter_arg(db: &Database, arg: &str) -> Result<SavedFilter> {
    if let Ok(id) = arg.parse::<i64>() {
        return db
            .get_saved_filter(id)?
            .ok_or_else(|| anyhow::anyhow!("Saved filter not found: {}", id));
    }

    db.list_saved_filters()?
        .into_iter()
        .find(|f| f.name.eq_ignore_ascii_case(arg))
        .ok_or_else(|| anyhow::anyhow!("Saved filter not found: {}", arg))
}
