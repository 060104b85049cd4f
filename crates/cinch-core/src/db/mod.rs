//! SQLite storage with connection pooling and schema setup
//!
//! This module is organized by domain:
//! - `accounts` - Accounts and categories
//! - `transactions` - Transaction CRUD
//! - `tags` - Tags and transaction-tag links
//! - `filters` - Saved filter expressions
//! - `rules` - Categorization rules and rule mutation persistence
//! - `budgets` - Category budgets, spending targets, overrides, credit offsets
//! - `snapshot` - Loading everything the engines need in one go

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod accounts;
mod budgets;
mod filters;
mod rules;
mod snapshot;
mod tags;
mod transactions;

pub use snapshot::Snapshot;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable holding the database passphrase
pub const DB_KEY_ENV: &str = "CINCH_DB_KEY";

/// Derive a SQLCipher key from a passphrase with Argon2id
///
/// The salt is fixed so a passphrase maps to the same key wherever the
/// database file lives.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this makes every existing encrypted database unreadable
    const APP_SALT: &[u8; 16] = b"cinch-kdf-salt01";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let output = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(output.as_bytes()))
}

/// Parse a SQLite `CURRENT_TIMESTAMP` string
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a stored `YYYY-MM-DD` date column
pub(crate) fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
}

impl Database {
    /// Open (or create) an encrypted database
    ///
    /// The passphrase is read from `CINCH_DB_KEY`. Returns an error when it is
    /// not set; use `new_unencrypted()` for throwaway databases.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} with your passphrase, \
                or pass --no-encrypt for an unencrypted database.",
                DB_KEY_ENV
            ))),
        }
    }

    /// Open (or create) an unencrypted database
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open (or create) a database with an explicit passphrase
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let key_pragma = match passphrase {
            Some(pass) => format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?),
            None => String::new(),
        };

        // Runs on every pooled connection; foreign keys are per-connection in SQLite
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if !key_pragma.is_empty() {
                conn.execute_batch(&key_pragma)?;
            }
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });

        let pool = Pool::builder().max_size(8).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a scratch database for tests
    ///
    /// Backed by a temp file rather than `:memory:` so every pooled connection
    /// sees the same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "cinch_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Create tables and indexes that do not exist yet
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                sort_order INTEGER NOT NULL DEFAULT 0,
                color TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                color TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                account_id INTEGER REFERENCES accounts(id) ON DELETE SET NULL,
                date DATE NOT NULL,
                date_raw TEXT,                           -- date as written on the statement
                description TEXT NOT NULL,
                amount REAL NOT NULL,                    -- negative = debit
                category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
            CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category_id);

            CREATE TABLE IF NOT EXISTS transaction_tags (
                transaction_id INTEGER NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                source TEXT NOT NULL DEFAULT 'manual',   -- manual, rule
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (transaction_id, tag_id)
            );

            CREATE INDEX IF NOT EXISTS idx_transaction_tags_tag ON transaction_tags(tag_id);

            CREATE TABLE IF NOT EXISTS saved_filters (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                expression TEXT NOT NULL,                -- stored verbatim
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- filter_id has no foreign key; it may outlive the filter it names
            CREATE TABLE IF NOT EXISTS rules (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                filter_id INTEGER NOT NULL,
                set_category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
                enabled BOOLEAN NOT NULL DEFAULT 1,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS rule_tags (
                rule_id INTEGER NOT NULL REFERENCES rules(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (rule_id, tag_id)
            );

            CREATE TABLE IF NOT EXISTS category_budgets (
                id INTEGER PRIMARY KEY,
                category_id INTEGER NOT NULL UNIQUE REFERENCES categories(id) ON DELETE CASCADE,
                amount REAL NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS budget_overrides (
                budget_id INTEGER NOT NULL REFERENCES category_budgets(id) ON DELETE CASCADE,
                month TEXT NOT NULL,                     -- YYYY-MM
                amount REAL NOT NULL,
                UNIQUE (budget_id, month)
            );

            CREATE TABLE IF NOT EXISTS spending_targets (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                filter_id INTEGER NOT NULL,              -- no foreign key, see rules
                period TEXT NOT NULL,                    -- monthly, quarterly, annual
                amount REAL NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS target_overrides (
                target_id INTEGER NOT NULL REFERENCES spending_targets(id) ON DELETE CASCADE,
                period_key TEXT NOT NULL,                -- YYYY-MM, YYYY-Qn or YYYY
                amount REAL NOT NULL,
                UNIQUE (target_id, period_key)
            );

            CREATE TABLE IF NOT EXISTS credit_offsets (
                id INTEGER PRIMARY KEY,
                credit_transaction_id INTEGER NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
                debit_transaction_id INTEGER NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
                amount REAL NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_credit_offsets_debit ON credit_offsets(debit_transaction_id);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
