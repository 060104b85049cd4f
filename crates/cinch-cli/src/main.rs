//! Cinch CLI - Transaction filters, rules and budgets
//!
//! Usage:
//!   cinch init                              Initialize database
//!   cinch filter check 'cat:Dining coffee'  Validate a filter expression
//!   cinch rules dry-run                     Preview rule changes
//!   cinch budget --month 2024-05            Monthly category budget

mod cli;
mod commands;


use anyhow::{Context, Result};
use clap::Parser;
use cinch_core::Settings;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| settings.database.path.clone());
    let no_encrypt = cli.no_encrypt || !settings.database.encrypt;
    let out = commands::Output {
        json: cli.json,
        settings: &settings,
    };

    match cli.command {
        Commands::Init => commands::cmd_init(&db_path, no_encrypt),
        Commands::Accounts { action } => {
            let db = commands::open_db(&db_path, no_encrypt)?;
            match action {
                None => commands::cmd_accounts_list(&db),
                Some(AccountsAction::Add { name }) => commands::cmd_accounts_add(&db, &name),
            }
        }
        Commands::Categories { action } => {
            let db = commands::open_db(&db_path, no_encrypt)?;
            match action {
                None => commands::cmd_categories_list(&db),
                Some(CategoriesAction::Add { name, order, color }) => {
                    commands::cmd_categories_add(&db, &name, order, color.as_deref())
                }
            }
        }
        Commands::Tags { action } => {
            let db = commands::open_db(&db_path, no_encrypt)?;
            match action {
                None => commands::cmd_tags_list(&db),
                Some(TagsAction::Add { name, color }) => {
                    commands::cmd_tags_add(&db, &name, color.as_deref())
                }
            }
        }
        Commands::Transactions { action } => {
            let db = commands::open_db(&db_path, no_encrypt)?;
            match action {
                None => commands::cmd_transactions_list(&db, &out, None, 20),
                Some(TransactionsAction::List { filter, limit }) => {
                    commands::cmd_transactions_list(&db, &out, filter.as_deref(), limit)
                }
                Some(TransactionsAction::Add {
                    date,
                    amount,
                    desc,
                    account,
                    category,
                    tag,
                }) => commands::cmd_transactions_add(
                    &db,
                    &date,
                    amount,
                    &desc,
                    account.as_deref(),
                    category.as_deref(),
                    &tag,
                ),
                Some(TransactionsAction::Tag { id, tag }) => {
                    commands::cmd_transactions_tag(&db, id, &tag)
                }
                Some(TransactionsAction::Categorize { id, category }) => {
                    commands::cmd_transactions_categorize(&db, id, category.as_deref())
                }
            }
        }
        Commands::Filter { action } => match action {
            FilterAction::Check { expression } => commands::cmd_filter_check(&out, &expression),
            FilterAction::Search {
                expression,
                account,
                limit,
            } => {
                let db = commands::open_db(&db_path, no_encrypt)?;
                commands::cmd_filter_search(&db, &out, &expression, &account, limit)
            }
        },
        Commands::Filters { action } => {
            let db = commands::open_db(&db_path, no_encrypt)?;
            match action {
                None => commands::cmd_filters_list(&db),
                Some(FiltersAction::Add { name, expression }) => {
                    commands::cmd_filters_add(&db, &name, &expression)
                }
                Some(FiltersAction::Delete { id }) => commands::cmd_filters_delete(&db, id),
            }
        }
        Commands::Rules { action } => {
            let db = commands::open_db(&db_path, no_encrypt)?;
            match action {
                None => commands::cmd_rules_list(&db),
                Some(RulesAction::Add {
                    name,
                    filter,
                    category,
                    tag,
                    order,
                }) => commands::cmd_rules_add(&db, &name, &filter, category.as_deref(), &tag, order),
                Some(RulesAction::Enable { id }) => commands::cmd_rules_enable(&db, id, true),
                Some(RulesAction::Disable { id }) => commands::cmd_rules_enable(&db, id, false),
                Some(RulesAction::Delete { id }) => commands::cmd_rules_delete(&db, id),
                Some(RulesAction::DryRun { account }) => {
                    commands::cmd_rules_dry_run(&db, &out, &account)
                }
                Some(RulesAction::Apply { account }) => {
                    commands::cmd_rules_apply(&db, &out, &account)
                }
            }
        }
        Commands::Budget {
            month,
            account,
            action,
        } => {
            let db = commands::open_db(&db_path, no_encrypt)?;
            match action {
                None => commands::cmd_budget_show(&db, &out, month.as_deref(), &account),
                Some(BudgetAction::Set {
                    category,
                    amount,
                    month,
                }) => commands::cmd_budget_set(&db, &out, &category, amount, month.as_deref()),
            }
        }
        Commands::Targets { action } => {
            let db = commands::open_db(&db_path, no_encrypt)?;
            match action {
                None => commands::cmd_targets_list(&db, &out, None, &[]),
                Some(TargetsAction::List { date, account }) => {
                    commands::cmd_targets_list(&db, &out, date.as_deref(), &account)
                }
                Some(TargetsAction::Add {
                    name,
                    filter,
                    period,
                    amount,
                }) => commands::cmd_targets_add(&db, &name, &filter, &period, amount),
                Some(TargetsAction::Override { id, key, amount }) => {
                    commands::cmd_targets_override(&db, id, &key, amount)
                }
            }
        }
        Commands::Offsets { action } => {
            let db = commands::open_db(&db_path, no_encrypt)?;
            match action {
                OffsetsAction::Add {
                    credit,
                    debit,
                    amount,
                } => commands::cmd_offsets_add(&db, credit, debit, amount),
            }
        }
    }
}
