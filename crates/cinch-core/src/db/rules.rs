//! Rule operations and rule mutation persistence

use std::collections::HashMap;

use rusqlite::params;
use tracing::debug;

use super::Database;
use crate::error::Result;
use crate::models::{NewRule, Rule, TagSource};
use crate::rules::{MutationSink, TransactionMutation};

impl Database {
    /// Create an enabled rule with its tags, returning its id
    pub fn create_rule(&self, rule: &NewRule) -> Result<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO rules (name, filter_id, set_category_id, sort_order) VALUES (?, ?, ?, ?)",
            params![rule.name, rule.filter_id, rule.set_category_id, rule.sort_order],
        )?;
        let rule_id = tx.last_insert_rowid();

        for tag_id in &rule.add_tag_ids {
            tx.execute(
                "INSERT OR IGNORE INTO rule_tags (rule_id, tag_id) VALUES (?, ?)",
                params![rule_id, tag_id],
            )?;
        }

        tx.commit()?;
        Ok(rule_id)
    }

    /// List all rules in application order, enabled or not
    pub fn list_rules(&self) -> Result<Vec<Rule>> {
        let conn = self.conn()?;

        let mut tag_stmt = conn.prepare("SELECT rule_id, tag_id FROM rule_tags ORDER BY tag_id")?;
        let mut tags_by_rule: HashMap<i64, Vec<i64>> = HashMap::new();
        for row in tag_stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))? {
            let (rule_id, tag_id) = row?;
            tags_by_rule.entry(rule_id).or_default().push(tag_id);
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, filter_id, set_category_id, enabled, sort_order
            FROM rules
            ORDER BY sort_order, id
            "#,
        )?;

        let rules = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                Ok(Rule {
                    id,
                    name: row.get(1)?,
                    filter_id: row.get(2)?,
                    set_category_id: row.get(3)?,
                    add_tag_ids: tags_by_rule.get(&id).cloned().unwrap_or_default(),
                    enabled: row.get(4)?,
                    sort_order: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rules)
    }

    /// Enable or disable a rule. Returns whether the rule exists.
    pub fn set_rule_enabled(&self, id: i64, enabled: bool) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE rules SET enabled = ? WHERE id = ?",
            params![enabled, id],
        )?;
        Ok(updated > 0)
    }

    /// Delete a rule. Returns whether a rule was deleted.
    pub fn delete_rule(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM rules WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }
}

impl MutationSink for Database {
    /// Write category changes and rule-added tags in one SQL transaction
    fn persist_rule_mutations(&self, mutations: &[TransactionMutation]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        {
            let mut set_category =
                tx.prepare("UPDATE transactions SET category_id = ? WHERE id = ?")?;
            let mut add_tag = tx.prepare(
                "INSERT OR IGNORE INTO transaction_tags (transaction_id, tag_id, source) VALUES (?, ?, ?)",
            )?;

            for mutation in mutations {
                if let Some(change) = mutation.category {
                    set_category.execute(params![change.to, mutation.transaction_id])?;
                }
                for tag_id in &mutation.added_tag_ids {
                    add_tag.execute(params![
                        mutation.transaction_id,
                        tag_id,
                        TagSource::Rule.as_str()
                    ])?;
                }
            }
        }

        tx.commit()?;
        debug!("Persisted {} rule mutations", mutations.len());
        Ok(())
    }
}
