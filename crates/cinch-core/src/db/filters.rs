//! Saved filter operations
//!
//! Expressions are stored exactly as entered. Validation happens where they
//! are bound to a rule or target, so a filter that stops parsing is reported
//! there instead of being rejected or rewritten here.

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::SavedFilter;

fn row_to_saved_filter(row: &Row<'_>) -> rusqlite::Result<SavedFilter> {
    let created_at: String = row.get(3)?;
    Ok(SavedFilter {
        id: row.get(0)?,
        name: row.get(1)?,
        expression: row.get(2)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Save a named filter expression, returning its id
    pub fn create_saved_filter(&self, name: &str, expression: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO saved_filters (name, expression) VALUES (?, ?)",
            params![name, expression],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List saved filters by name
    pub fn list_saved_filters(&self) -> Result<Vec<SavedFilter>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, expression, created_at FROM saved_filters ORDER BY name",
        )?;

        let filters = stmt
            .query_map([], row_to_saved_filter)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(filters)
    }

    /// Get a saved filter by ID
    pub fn get_saved_filter(&self, id: i64) -> Result<Option<SavedFilter>> {
        let conn = self.conn()?;
        let filter = conn
            .query_row(
                "SELECT id, name, expression, created_at FROM saved_filters WHERE id = ?",
                params![id],
                row_to_saved_filter,
            )
            .optional()?;
        Ok(filter)
    }

    /// Delete a saved filter. Rules and targets referencing it are left in
    /// place. Returns whether a filter was deleted.
    pub fn delete_saved_filter(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM saved_filters WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }
}
