//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cinch - Filter, categorize and budget your transactions
#[derive(Parser)]
#[command(name = "cinch")]
#[command(about = "Transaction filters, categorization rules and budgets", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (overrides `database.path` in settings)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Settings file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for real data)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set CINCH_DB_KEY environment variable with your passphrase.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// List or add accounts
    Accounts {
        #[command(subcommand)]
        action: Option<AccountsAction>,
    },

    /// List or add categories
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// List or add tags
    Tags {
        #[command(subcommand)]
        action: Option<TagsAction>,
    },

    /// List, add, tag or categorize transactions
    Transactions {
        #[command(subcommand)]
        action: Option<TransactionsAction>,
    },

    /// Check or run a filter expression
    Filter {
        #[command(subcommand)]
        action: FilterAction,
    },

    /// Manage saved filters
    Filters {
        #[command(subcommand)]
        action: Option<FiltersAction>,
    },

    /// Manage categorization rules (list, add, enable, disable, delete, dry-run, apply)
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// Show the monthly category budget, or set a budget
    Budget {
        /// Month to report (YYYY-MM, defaults to the current month)
        #[arg(long)]
        month: Option<String>,

        /// Restrict to these accounts (repeatable)
        #[arg(long)]
        account: Vec<String>,

        #[command(subcommand)]
        action: Option<BudgetAction>,
    },

    /// Manage spending targets
    Targets {
        #[command(subcommand)]
        action: Option<TargetsAction>,
    },

    /// Link credits to the debits they offset
    Offsets {
        #[command(subcommand)]
        action: OffsetsAction,
    },
}

#[derive(Subcommand)]
pub enum AccountsAction {
    /// Add an account
    Add {
        /// Account name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// Add a category
    Add {
        /// Category name
        name: String,

        /// Display order (lower first)
        #[arg(long, default_value = "0")]
        order: i64,

        /// Color (hex, e.g., #10b981)
        #[arg(long)]
        color: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TagsAction {
    /// Add a tag
    Add {
        /// Tag name
        name: String,

        /// Color (hex, e.g., #3b82f6)
        #[arg(long)]
        color: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TransactionsAction {
    /// List recent transactions
    List {
        /// Only show transactions matching this filter expression
        #[arg(short, long)]
        filter: Option<String>,

        /// Maximum number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Add a transaction
    Add {
        /// Posting date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Signed amount (negative for debits)
        #[arg(long, allow_hyphen_values = true)]
        amount: f64,

        /// Description as it appears on the statement
        #[arg(long)]
        desc: String,

        /// Account name (created if missing)
        #[arg(long)]
        account: Option<String>,

        /// Category name (created if missing)
        #[arg(long)]
        category: Option<String>,

        /// Tag names (created if missing, repeatable)
        #[arg(long)]
        tag: Vec<String>,
    },

    /// Attach a tag to a transaction
    Tag {
        /// Transaction ID
        id: i64,

        /// Tag name
        tag: String,
    },

    /// Set or clear a transaction's category
    Categorize {
        /// Transaction ID
        id: i64,

        /// Category name (omit to clear)
        category: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum FilterAction {
    /// Strictly parse an expression and show its canonical form
    Check {
        /// Filter expression
        expression: String,
    },

    /// Show transactions matching an expression
    Search {
        /// Filter expression
        expression: String,

        /// Restrict to these accounts (repeatable)
        #[arg(long)]
        account: Vec<String>,

        /// Maximum number of transactions to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum FiltersAction {
    /// Save a named filter expression
    Add {
        /// Filter name
        name: String,

        /// Filter expression (stored exactly as given)
        expression: String,
    },

    /// Delete a saved filter (rules and targets using it will fail to bind)
    Delete {
        /// Saved filter ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// Add a rule
    Add {
        /// Rule name
        name: String,

        /// Saved filter ID or name
        #[arg(long)]
        filter: String,

        /// Category to assign
        #[arg(long)]
        category: Option<String>,

        /// Tags to add (repeatable)
        #[arg(long)]
        tag: Vec<String>,

        /// Application order (lower first)
        #[arg(long, default_value = "0")]
        order: i64,
    },

    /// Enable a rule
    Enable {
        /// Rule ID
        id: i64,
    },

    /// Disable a rule
    Disable {
        /// Rule ID
        id: i64,
    },

    /// Delete a rule
    Delete {
        /// Rule ID
        id: i64,
    },

    /// Preview what `apply` would change
    DryRun {
        /// Restrict to these accounts (repeatable)
        #[arg(long)]
        account: Vec<String>,
    },

    /// Apply enabled rules and save the changes
    Apply {
        /// Restrict to these accounts (repeatable)
        #[arg(long)]
        account: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum BudgetAction {
    /// Set a category's monthly budget, or override it for one month
    Set {
        /// Category name
        category: String,

        /// Budgeted amount
        amount: f64,

        /// Override only this month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TargetsAction {
    /// Show each target for its current period
    List {
        /// Report as of this date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Restrict to these accounts (repeatable)
        #[arg(long)]
        account: Vec<String>,
    },

    /// Add a spending target
    Add {
        /// Target name
        name: String,

        /// Saved filter ID or name
        #[arg(long)]
        filter: String,

        /// Period: monthly, quarterly, annual
        #[arg(long, default_value = "monthly")]
        period: String,

        /// Budgeted amount per period
        amount: f64,
    },

    /// Override a target for one period (YYYY-MM, YYYY-Qn or YYYY)
    Override {
        /// Target ID
        id: i64,

        /// Period key
        key: String,

        /// Budgeted amount for that period
        amount: f64,
    },
}

#[derive(Subcommand)]
pub enum OffsetsAction {
    /// Offset part of a debit with a credit
    Add {
        /// Credit transaction ID
        credit: i64,

        /// Debit transaction ID
        debit: i64,

        /// Amount of the credit applied to the debit
        amount: f64,
    },
}
