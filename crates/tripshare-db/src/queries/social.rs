use anyhow::Result;
use rusqlite::{Connection, params};

use super::OptionalExt;
use super::users::exists;
use crate::models::{FollowRow, ReportRow, UserSummaryRow};
use crate::{Database, timestamp};

#[derive(Debug)]
pub enum FollowInsert {
    Created(FollowRow),
    Duplicate,
    UserNotFound,
}

#[derive(Debug)]
pub enum ReportInsert {
    Created(ReportRow),
    Duplicate,
    UserNotFound,
}

impl Database {
    // -- Follows --

    /// Add a directed follow edge. Self-follows are rejected by the caller
    /// and by the table's CHECK constraint.
    pub fn insert_follow(&self, id: &str, follower_id: &str, following_id: &str) -> Result<FollowInsert> {
        self.with_conn(|conn| {
            if !exists(conn, "SELECT 1 FROM users WHERE id = ?1 AND active = 1", following_id)? {
                return Ok(FollowInsert::UserNotFound);
            }

            let now = timestamp();
            let changed = conn.execute(
                "INSERT INTO follows (id, follower_id, following_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(follower_id, following_id) DO NOTHING",
                params![id, follower_id, following_id, now],
            )?;
            if changed == 0 {
                return Ok(FollowInsert::Duplicate);
            }

            Ok(FollowInsert::Created(FollowRow {
                id: id.to_string(),
                follower_id: follower_id.to_string(),
                following_id: following_id.to_string(),
                created_at: now,
            }))
        })
    }

    pub fn get_follow(&self, id: &str) -> Result<Option<FollowRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, follower_id, following_id, created_at FROM follows WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(FollowRow {
                            id: row.get(0)?,
                            follower_id: row.get(1)?,
                            following_id: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_follow(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM follows WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    pub fn count_followers(&self, user_id: &str) -> Result<u64> {
        self.with_conn(|conn| count_edges(conn, "following_id", user_id))
    }

    pub fn count_following(&self, user_id: &str) -> Result<u64> {
        self.with_conn(|conn| count_edges(conn, "follower_id", user_id))
    }

    /// Users following `user_id`, most recent first.
    pub fn list_followers(&self, user_id: &str, limit: u32, offset: u32) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| list_edges(conn, "follower_id", "following_id", user_id, limit, offset))
    }

    /// Users `user_id` follows, most recent first.
    pub fn list_following(&self, user_id: &str, limit: u32, offset: u32) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| list_edges(conn, "following_id", "follower_id", user_id, limit, offset))
    }

    // -- Reports --

    /// Record a report and bump the reported user's counter atomically.
    pub fn insert_report(
        &self,
        id: &str,
        reporter_id: &str,
        reported_user_id: &str,
        content: &str,
    ) -> Result<ReportInsert> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !exists(&tx, "SELECT 1 FROM users WHERE id = ?1", reported_user_id)? {
                return Ok(ReportInsert::UserNotFound);
            }

            let now = timestamp();
            let changed = tx.execute(
                "INSERT INTO reports (id, reporter_id, reported_user_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(reporter_id, reported_user_id) DO NOTHING",
                params![id, reporter_id, reported_user_id, content, now],
            )?;
            if changed == 0 {
                return Ok(ReportInsert::Duplicate);
            }

            tx.execute(
                "UPDATE users SET report_count = report_count + 1 WHERE id = ?1",
                [reported_user_id],
            )?;
            tx.commit()?;

            Ok(ReportInsert::Created(ReportRow {
                id: id.to_string(),
                reporter_id: reporter_id.to_string(),
                reported_user_id: reported_user_id.to_string(),
                content: content.to_string(),
                created_at: now,
            }))
        })
    }

    pub fn count_reports(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    pub fn list_reports(&self, limit: u32, offset: u32) -> Result<Vec<ReportRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, reporter_id, reported_user_id, content, created_at
                 FROM reports
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map(params![limit, offset], |row| {
                    Ok(ReportRow {
                        id: row.get(0)?,
                        reporter_id: row.get(1)?,
                        reported_user_id: row.get(2)?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Dismiss a report. The reported user's counter is left as is.
    pub fn delete_report(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM reports WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn count_edges(conn: &Connection, column: &str, user_id: &str) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM follows WHERE {} = ?1", column);
    let count: i64 = conn.query_row(&sql, [user_id], |row| row.get(0))?;
    Ok(count as u64)
}

fn list_edges(
    conn: &Connection,
    select_column: &str,
    match_column: &str,
    user_id: &str,
    limit: u32,
    offset: u32,
) -> Result<Vec<UserSummaryRow>> {
    let sql = format!(
        "SELECT u.id, u.username, u.avatar
         FROM follows f
         JOIN users u ON u.id = f.{}
         WHERE f.{} = ?1
         ORDER BY f.created_at DESC, f.rowid DESC
         LIMIT ?2 OFFSET ?3",
        select_column, match_column
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![user_id, limit, offset], |row| {
            Ok(UserSummaryRow {
                id: row.get(0)?,
                username: row.get(1)?,
                avatar: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
