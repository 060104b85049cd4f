//! Transaction operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_date, Database};
use crate::error::Result;
use crate::models::{NewTransaction, Transaction};

const TRANSACTION_COLUMNS: &str =
    "id, account_id, date, date_raw, description, amount, category_id";

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let date_str: String = row.get(2)?;
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        date: parse_date(&date_str)?,
        date_raw: row.get(3)?,
        description: row.get(4)?,
        amount: row.get(5)?,
        category_id: row.get(6)?,
    })
}

impl Database {
    /// Insert a transaction, returning its id
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO transactions (account_id, date, date_raw, description, amount, category_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.account_id,
                tx.date.format("%Y-%m-%d").to_string(),
                tx.date_raw,
                tx.description,
                tx.amount,
                tx.category_id,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List all transactions, newest first
    pub fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions ORDER BY date DESC, id DESC",
            TRANSACTION_COLUMNS
        ))?;

        let transactions = stmt
            .query_map([], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Get a transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS),
                params![id],
                row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// Set or clear a transaction's category
    pub fn set_transaction_category(&self, id: i64, category_id: Option<i64>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE transactions SET category_id = ? WHERE id = ?",
            params![category_id, id],
        )?;
        Ok(())
    }
}
