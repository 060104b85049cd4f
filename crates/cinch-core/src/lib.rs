//! Cinch Core Library
//!
//! Transaction selection, categorization and budgeting for the Cinch personal
//! finance tool:
//! - Filter expression language (parser, canonical rendering, evaluator)
//! - Categorization rule engine with an exact dry-run preview
//! - Category budgets and filter-defined spending targets with credit offsets
//! - SQLite storage (optionally SQLCipher-encrypted) feeding the engines
//! - TOML settings

pub mod budget;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod models;
pub mod rules;

pub use budget::{BudgetLine, Ledger, OffsetMap, Period, TargetFailure, TargetLine, TargetReport};
pub use catalog::{AccountScope, Catalog, TransactionView};
pub use config::Settings;
pub use db::{Database, Snapshot};
pub use error::{Error, Result};
pub use filter::{FilterError, FilterNode};
pub use rules::{
    ApplyResult, DryRunResult, DryRunSummary, MutationSink, RuleFailure, RuleMatchCount,
    RulePlan, TransactionMutation,
};
