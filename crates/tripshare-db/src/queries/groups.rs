use anyhow::Result;
use rusqlite::params;

use super::OptionalExt;
use crate::models::{GroupRow, UserSummaryRow};
use crate::{Database, timestamp};

#[derive(Debug)]
pub enum GroupInsert {
    Created,
    AlreadyExists,
}

impl Database {
    /// Open the (single) group for a post. The creator joins it immediately.
    pub fn create_group(&self, post_id: &str, creator_id: &str) -> Result<GroupInsert> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = timestamp();

            let changed = tx.execute(
                "INSERT INTO trip_groups (post_id, creator_id, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(post_id) DO NOTHING",
                params![post_id, creator_id, now],
            )?;
            if changed == 0 {
                return Ok(GroupInsert::AlreadyExists);
            }

            tx.execute(
                "INSERT INTO group_members (post_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
                params![post_id, creator_id, now],
            )?;
            tx.commit()?;

            Ok(GroupInsert::Created)
        })
    }

    pub fn get_group(&self, post_id: &str) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT g.post_id, g.creator_id, u.username, u.avatar, g.created_at
                     FROM trip_groups g
                     LEFT JOIN users u ON u.id = g.creator_id
                     WHERE g.post_id = ?1",
                    [post_id],
                    |row| {
                        Ok(GroupRow {
                            post_id: row.get(0)?,
                            creator_id: row.get(1)?,
                            creator_username: row
                                .get::<_, Option<String>>(2)?
                                .unwrap_or_else(|| "unknown".to_string()),
                            creator_avatar: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Members in join order.
    pub fn group_members(&self, post_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.avatar
                 FROM group_members m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.post_id = ?1
                 ORDER BY m.joined_at ASC, m.rowid ASC",
            )?;
            let rows = stmt
                .query_map([post_id], |row| {
                    Ok(UserSummaryRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        avatar: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false if the user was already a member.
    pub fn add_group_member(&self, post_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO group_members (post_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
                params![post_id, user_id, timestamp()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn remove_group_member(&self, post_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM group_members WHERE post_id = ?1 AND user_id = ?2",
                params![post_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_group(&self, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM trip_groups WHERE post_id = ?1", [post_id])?;
            Ok(changed > 0)
        })
    }
}
