//! Tags and transaction-tag links

use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::Result;
use crate::models::{Tag, TagMap, TagSource};

impl Database {
    /// Create a tag, or return the id of the one with this name
    /// (case-insensitive)
    pub fn upsert_tag(&self, name: &str, color: Option<&str>) -> Result<i64> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row("SELECT id FROM tags WHERE name = ?", params![name], |row| {
                row.get(0)
            })
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO tags (name, color) VALUES (?, ?)",
            params![name, color],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List all tags
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, color FROM tags ORDER BY name")?;

        let tags = stmt
            .query_map([], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    color: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    /// Find a tag by name (case-insensitive)
    pub fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let conn = self.conn()?;
        let tag = conn
            .query_row(
                "SELECT id, name, color FROM tags WHERE name = ?",
                params![name],
                |row| {
                    Ok(Tag {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        color: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(tag)
    }

    /// Attach a tag to a transaction. Attaching an already attached tag is a
    /// no-op and keeps the original source.
    pub fn add_transaction_tag(
        &self,
        transaction_id: i64,
        tag_id: i64,
        source: TagSource,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO transaction_tags (transaction_id, tag_id, source) VALUES (?, ?, ?)",
            params![transaction_id, tag_id, source.as_str()],
        )?;
        Ok(())
    }

    /// Tags on one transaction, with how each was attached
    pub fn get_transaction_tags(&self, transaction_id: i64) -> Result<Vec<(Tag, TagSource)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.name, t.color, tt.source
            FROM transaction_tags tt
            JOIN tags t ON t.id = tt.tag_id
            WHERE tt.transaction_id = ?
            ORDER BY t.name
            "#,
        )?;

        let tags = stmt
            .query_map(params![transaction_id], |row| {
                let source: String = row.get(3)?;
                Ok((
                    Tag {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        color: row.get(2)?,
                    },
                    source.parse().unwrap_or(TagSource::Manual),
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    /// Tags of every tagged transaction
    pub fn load_tag_map(&self) -> Result<TagMap> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT tt.transaction_id, t.id, t.name, t.color
            FROM transaction_tags tt
            JOIN tags t ON t.id = tt.tag_id
            ORDER BY tt.transaction_id, t.name
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    Tag {
                        id: row.get(1)?,
                        name: row.get(2)?,
                        color: row.get(3)?,
                    },
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut map = TagMap::new();
        for (transaction_id, tag) in rows {
            map.entry(transaction_id).or_default().push(tag);
        }
        Ok(map)
    }
}
