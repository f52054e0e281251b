use anyhow::Result;
use rusqlite::{Connection, Row, params};

use super::OptionalExt;
use crate::Database;
use crate::models::{PostRow, PostStats};

const POST_COLUMNS: &str = "id, user_id, title, description, start_time, end_time, cost, \
     starting_point, end_point, status, active, created_at, updated_at";

impl Database {
    pub fn insert_post(&self, post: &PostRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, user_id, title, description, start_time, end_time, cost,
                                    starting_point, end_point, status, active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    post.id,
                    post.user_id,
                    post.title,
                    post.description,
                    post.start_time,
                    post.end_time,
                    post.cost,
                    post.starting_point,
                    post.end_point,
                    post.status,
                    post.active,
                    post.created_at,
                    post.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Fetch a post whether or not it is active.
    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    /// Active posts whose title or description contains `q` (ASCII case-insensitive).
    pub fn count_posts(&self, q: Option<&str>) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM posts
                 WHERE active = 1
                   AND (?1 IS NULL OR title LIKE '%' || ?1 || '%' OR description LIKE '%' || ?1 || '%')",
                [q],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Newest first; ties broken by insertion order.
    pub fn list_posts(&self, q: Option<&str>, limit: u32, offset: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM posts
                 WHERE active = 1
                   AND (?1 IS NULL OR title LIKE '%' || ?1 || '%' OR description LIKE '%' || ?1 || '%')
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3",
                POST_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![q, limit, offset], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_post(&self, post: &PostRow) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET title = ?2, description = ?3, start_time = ?4, end_time = ?5,
                                  cost = ?6, starting_point = ?7, end_point = ?8, status = ?9,
                                  active = ?10, updated_at = ?11
                 WHERE id = ?1",
                params![
                    post.id,
                    post.title,
                    post.description,
                    post.start_time,
                    post.end_time,
                    post.cost,
                    post.starting_point,
                    post.end_point,
                    post.status,
                    post.active,
                    post.updated_at,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Hard delete; comments, likes, ratings, images and the group cascade.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    pub fn post_stats(&self, id: &str) -> Result<PostStats> {
        self.with_conn(|conn| {
            let like_count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE post_id = ?1 AND active = 1",
                [id],
                |row| row.get(0),
            )?;
            let (rating_count, average_rating): (i64, Option<f64>) = conn.query_row(
                "SELECT COUNT(*), AVG(stars) FROM ratings WHERE post_id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(PostStats {
                like_count,
                rating_count,
                average_rating,
            })
        })
    }
}

pub(crate) fn query_post(conn: &Connection, id: &str) -> Result<Option<PostRow>> {
    let sql = format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_post).optional()?;
    Ok(row)
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        cost: row.get(6)?,
        starting_point: row.get(7)?,
        end_point: row.get(8)?,
        status: row.get(9)?,
        active: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    #[test]
    fn list_is_newest_first_and_filters_inactive() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner");
        let first = fixtures::post(&db, &owner, "Ha Long Bay cruise");
        let second = fixtures::post(&db, &owner, "Mekong delta ride");
        let hidden = fixtures::post(&db, &owner, "Cancelled");

        let mut row = db.get_post(&hidden).unwrap().unwrap();
        row.active = false;
        assert!(db.update_post(&row).unwrap());

        assert_eq!(db.count_posts(None).unwrap(), 2);
        let ids: Vec<String> = db.list_posts(None, 10, 0).unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn search_matches_title_case_insensitively() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner");
        fixtures::post(&db, &owner, "Ha Long Bay cruise");
        fixtures::post(&db, &owner, "Mekong delta ride");

        assert_eq!(db.count_posts(Some("mekong")).unwrap(), 1);
        let found = db.list_posts(Some("MEKONG"), 10, 0).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Mekong delta ride");
    }

    #[test]
    fn limit_and_offset_window_the_list() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner");
        for i in 0..7 {
            fixtures::post(&db, &owner, &format!("trip {}", i));
        }
        let page_two = db.list_posts(None, 5, 5).unwrap();
        let titles: Vec<&str> = page_two.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["trip 1", "trip 0"]);
    }

    #[test]
    fn stats_for_a_fresh_post_are_empty() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner");
        let post = fixtures::post(&db, &owner, "Da Lat");
        let stats = db.post_stats(&post).unwrap();
        assert_eq!(stats.like_count, 0);
        assert_eq!(stats.rating_count, 0);
        assert!(stats.average_rating.is_none());
    }

    #[test]
    fn delete_reports_whether_a_row_went_away() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner");
        let post = fixtures::post(&db, &owner, "Hue");
        assert!(db.delete_post(&post).unwrap());
        assert!(!db.delete_post(&post).unwrap());
        assert!(db.get_post(&post).unwrap().is_none());
    }
}
