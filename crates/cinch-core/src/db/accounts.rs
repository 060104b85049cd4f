//! Account and category operations

use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::Result;
use crate::models::{Account, Category};

impl Database {
    /// Create an account, or return the id of the one with this name
    pub fn upsert_account(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM accounts WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute("INSERT INTO accounts (name) VALUES (?)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    /// List all accounts
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM accounts ORDER BY name")?;

        let accounts = stmt
            .query_map([], |row| {
                Ok(Account {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Find an account by exact name
    pub fn get_account_by_name(&self, name: &str) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, name FROM accounts WHERE name = ?",
                params![name],
                |row| {
                    Ok(Account {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    /// Create a category, or return the id of the one with this name
    /// (case-insensitive). An existing category keeps its order and color.
    pub fn upsert_category(&self, name: &str, sort_order: i64, color: Option<&str>) -> Result<i64> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM categories WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO categories (name, sort_order, color) VALUES (?, ?, ?)",
            params![name, sort_order, color],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List categories in display order
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, sort_order, color FROM categories ORDER BY sort_order, id",
        )?;

        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    sort_order: row.get(2)?,
                    color: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Find a category by name (case-insensitive)
    pub fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, name, sort_order, color FROM categories WHERE name = ?",
                params![name],
                |row| {
                    Ok(Category {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        sort_order: row.get(2)?,
                        color: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(category)
    }
}
