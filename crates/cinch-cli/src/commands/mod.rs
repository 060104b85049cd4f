//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, scope resolution, JSON output)
//! - `catalog` - Accounts, categories and tags
//! - `transactions` - Transaction commands (list, add, tag, categorize)
//! - `filters` - Filter checking and searching, saved filters
//! - `rules` - Rule management, dry run and apply
//! - `budget` - Category budgets, spending targets and credit offsets

pub mod budget;
pub mod catalog;
pub mod core;
pub mod filters;
pub mod rules;
pub mod transactions;

// Re-export command functions for main.rs
pub use budget::*;
pub use catalog::*;
pub use core::*;
pub use filters::*;
pub use rules::*;
pub use transactions::*;

use cinch_core::Settings;

/// How report commands present their results
pub struct Output<'a> {
    pub json: bool,
    pub settings: &'a Settings,
}

impl Output<'_> {
    pub fn amount(&self, amount: f64) -> String {
        self.settings.format_amount(amount)
    }
}

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
