//! Category budgets, spending targets, their overrides, and credit offsets

use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{
    BudgetOverride, CategoryBudget, CreditOffset, PeriodType, SpendingTarget, TargetOverride,
};

impl Database {
    /// Set a category's monthly budget, creating it if needed. Returns the
    /// budget id.
    pub fn set_category_budget(&self, category_id: i64, amount: f64) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO category_budgets (category_id, amount) VALUES (?, ?)
            ON CONFLICT(category_id) DO UPDATE SET amount = excluded.amount
            "#,
            params![category_id, amount],
        )?;
        let id = conn.query_row(
            "SELECT id FROM category_budgets WHERE category_id = ?",
            params![category_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Budget for one category, if any
    pub fn get_category_budget(&self, category_id: i64) -> Result<Option<CategoryBudget>> {
        let conn = self.conn()?;
        let budget = conn
            .query_row(
                "SELECT id, category_id, amount FROM category_budgets WHERE category_id = ?",
                params![category_id],
                |row| {
                    Ok(CategoryBudget {
                        id: row.get(0)?,
                        category_id: row.get(1)?,
                        amount: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(budget)
    }

    pub fn list_category_budgets(&self) -> Result<Vec<CategoryBudget>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, category_id, amount FROM category_budgets ORDER BY id")?;

        let budgets = stmt
            .query_map([], |row| {
                Ok(CategoryBudget {
                    id: row.get(0)?,
                    category_id: row.get(1)?,
                    amount: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(budgets)
    }

    /// Override a budget for one month (`YYYY-MM`), replacing any existing
    /// override for that month
    pub fn set_budget_override(&self, budget_id: i64, month: &str, amount: f64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO budget_overrides (budget_id, month, amount) VALUES (?, ?, ?)
            ON CONFLICT(budget_id, month) DO UPDATE SET amount = excluded.amount
            "#,
            params![budget_id, month, amount],
        )?;
        Ok(())
    }

    pub fn list_budget_overrides(&self) -> Result<Vec<BudgetOverride>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT budget_id, month, amount FROM budget_overrides ORDER BY budget_id, month")?;

        let overrides = stmt
            .query_map([], |row| {
                Ok(BudgetOverride {
                    budget_id: row.get(0)?,
                    month: row.get(1)?,
                    amount: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(overrides)
    }

    /// Create a spending target, returning its id
    pub fn create_spending_target(
        &self,
        name: &str,
        filter_id: i64,
        period: PeriodType,
        amount: f64,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO spending_targets (name, filter_id, period, amount) VALUES (?, ?, ?, ?)",
            params![name, filter_id, period.as_str(), amount],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_spending_targets(&self) -> Result<Vec<SpendingTarget>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, filter_id, period, amount FROM spending_targets ORDER BY name, id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, filter_id, period, amount)| -> Result<SpendingTarget> {
                let period: PeriodType = period.parse().map_err(Error::InvalidData)?;
                Ok(SpendingTarget {
                    id,
                    name,
                    filter_id,
                    period,
                    amount,
                })
            })
            .collect()
    }

    /// Override a target for one period key, replacing any existing override
    /// for that key
    pub fn set_target_override(&self, target_id: i64, period_key: &str, amount: f64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO target_overrides (target_id, period_key, amount) VALUES (?, ?, ?)
            ON CONFLICT(target_id, period_key) DO UPDATE SET amount = excluded.amount
            "#,
            params![target_id, period_key, amount],
        )?;
        Ok(())
    }

    pub fn list_target_overrides(&self) -> Result<Vec<TargetOverride>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT target_id, period_key, amount FROM target_overrides ORDER BY target_id, period_key",
        )?;

        let overrides = stmt
            .query_map([], |row| {
                Ok(TargetOverride {
                    target_id: row.get(0)?,
                    period_key: row.get(1)?,
                    amount: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(overrides)
    }

    /// Record that a credit offsets part of a debit, returning the offset id
    pub fn add_credit_offset(
        &self,
        credit_transaction_id: i64,
        debit_transaction_id: i64,
        amount: f64,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO credit_offsets (credit_transaction_id, debit_transaction_id, amount)
            VALUES (?, ?, ?)
            "#,
            params![credit_transaction_id, debit_transaction_id, amount],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_credit_offsets(&self) -> Result<Vec<CreditOffset>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, credit_transaction_id, debit_transaction_id, amount FROM credit_offsets ORDER BY id",
        )?;

        let offsets = stmt
            .query_map([], |row| {
                Ok(CreditOffset {
                    id: row.get(0)?,
                    credit_transaction_id: row.get(1)?,
                    debit_transaction_id: row.get(2)?,
                    amount: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(offsets)
    }
}
