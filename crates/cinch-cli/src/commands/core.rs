//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `resolve_scope` - Account scope from `--account` flags or settings
//! - `print_json` - JSON report output
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use cinch_core::{db::Database, AccountScope};
use serde::Serialize;

use super::Output;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Resolve `--account` flags to a scope, falling back to the configured
/// default scope when none are given
pub fn resolve_scope(db: &Database, out: &Output<'_>, accounts: &[String]) -> Result<AccountScope> {
    let names: &[String] = if accounts.is_empty() {
        &out.settings.scope.accounts
    } else {
        accounts
    };
    db.resolve_account_scope(names)
        .context("Failed to resolve account scope")
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add transactions: cinch transactions add --date 2024-05-01 --amount -4.50 --desc COFFEE");
    println!("  2. Save a filter:    cinch filters add Coffee 'desc:coffee'");
    println!("  3. Add a rule:       cinch rules add coffee --filter Coffee --category Coffee");

    Ok(())
}
