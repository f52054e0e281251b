use anyhow::Result;
use rusqlite::params;

use super::placeholders;
use crate::models::{HashtagRow, PostHashtagRow};
use crate::{Database, timestamp};

impl Database {
    /// Return the hashtag with `label`, creating it under `id` if absent.
    pub fn get_or_create_hashtag(&self, id: &str, label: &str) -> Result<HashtagRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO hashtags (id, label, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(label) DO NOTHING",
                params![id, label, timestamp()],
            )?;
            let row = conn.query_row(
                "SELECT id, label, created_at FROM hashtags WHERE label = ?1",
                [label],
                |row| {
                    Ok(HashtagRow {
                        id: row.get(0)?,
                        label: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )?;
            Ok(row)
        })
    }

    /// Link a hashtag to a post. Returns false if it was already linked.
    pub fn attach_hashtag(&self, post_id: &str, hashtag_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO post_hashtags (post_id, hashtag_id) VALUES (?1, ?2)",
                params![post_id, hashtag_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn count_hashtags(&self, q: Option<&str>) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM hashtags WHERE ?1 IS NULL OR label LIKE '%' || ?1 || '%'",
                [q],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    pub fn list_hashtags(&self, q: Option<&str>, limit: u32, offset: u32) -> Result<Vec<HashtagRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, label, created_at FROM hashtags
                 WHERE ?1 IS NULL OR label LIKE '%' || ?1 || '%'
                 ORDER BY label ASC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![q, limit, offset], |row| {
                    Ok(HashtagRow {
                        id: row.get(0)?,
                        label: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch hashtags for a set of post IDs.
    pub fn hashtags_for_posts(&self, post_ids: &[String]) -> Result<Vec<PostHashtagRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT ph.post_id, h.id, h.label
                 FROM post_hashtags ph
                 JOIN hashtags h ON h.id = ph.hashtag_id
                 WHERE ph.post_id IN ({})
                 ORDER BY h.label ASC",
                placeholders(post_ids.len())
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(PostHashtagRow {
                        post_id: row.get(0)?,
                        hashtag_id: row.get(1)?,
                        label: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}
