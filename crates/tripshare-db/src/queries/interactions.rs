use anyhow::Result;
use rusqlite::{Connection, Row, params};

use super::OptionalExt;
use crate::models::RatingRow;
use crate::{Database, timestamp};

/// Whether a rating upsert created the row or updated an existing one.
#[derive(Debug)]
pub enum RatingUpsert {
    Created(RatingRow),
    Updated(RatingRow),
}

const RATING_COLUMNS: &str = "id, user_id, post_id, stars, created_at, updated_at";

impl Database {
    // -- Likes --

    /// Toggle a like: the first call creates an active row, later calls flip
    /// `active`. One statement, so concurrent toggles on the same pair are
    /// resolved by the unique constraint rather than erroring.
    /// Returns the resulting `active` state.
    pub fn toggle_like(&self, id: &str, user_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let active: bool = conn.query_row(
                "INSERT INTO likes (id, user_id, post_id, active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 1, ?4, ?4)
                 ON CONFLICT(user_id, post_id)
                 DO UPDATE SET active = NOT likes.active, updated_at = excluded.updated_at
                 RETURNING active",
                params![id, user_id, post_id, timestamp()],
                |row| row.get(0),
            )?;
            Ok(active)
        })
    }

    pub fn count_likes(&self, post_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE post_id = ?1 AND active = 1",
                [post_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    // -- Ratings --

    /// Create or overwrite the caller's rating of a post. `stars` must already
    /// be validated; the CHECK constraint rejects anything outside 1..=5.
    pub fn upsert_rating(
        &self,
        id: &str,
        user_id: &str,
        post_id: &str,
        stars: i64,
    ) -> Result<RatingUpsert> {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO ratings (id, user_id, post_id, stars, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(user_id, post_id)
                 DO UPDATE SET stars = excluded.stars, updated_at = excluded.updated_at
                 RETURNING {}",
                RATING_COLUMNS
            );
            let row = conn.query_row(
                &sql,
                params![id, user_id, post_id, stars, timestamp()],
                map_rating,
            )?;

            Ok(if row.id == id {
                RatingUpsert::Created(row)
            } else {
                RatingUpsert::Updated(row)
            })
        })
    }

    pub fn get_rating(&self, id: &str) -> Result<Option<RatingRow>> {
        self.with_conn(|conn| query_rating(conn, id))
    }

    pub fn update_rating_stars(&self, id: &str, stars: i64) -> Result<Option<RatingRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE ratings SET stars = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, stars, timestamp()],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_rating(conn, id)
        })
    }

    pub fn delete_rating(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM ratings WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn query_rating(conn: &Connection, id: &str) -> Result<Option<RatingRow>> {
    let sql = format!("SELECT {} FROM ratings WHERE id = ?1", RATING_COLUMNS);
    let row = conn.query_row(&sql, [id], map_rating).optional()?;
    Ok(row)
}

fn map_rating(row: &Row<'_>) -> rusqlite::Result<RatingRow> {
    Ok(RatingRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        post_id: row.get(2)?,
        stars: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    #[test]
    fn like_toggle_flips_and_flips_back() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "an");
        let post = fixtures::post(&db, &user, "trip");

        assert!(db.toggle_like(&fixtures::id(), &user, &post).unwrap());
        assert_eq!(db.count_likes(&post).unwrap(), 1);
        assert!(!db.toggle_like(&fixtures::id(), &user, &post).unwrap());
        assert_eq!(db.count_likes(&post).unwrap(), 0);
        assert!(db.toggle_like(&fixtures::id(), &user, &post).unwrap());

        let rows: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM likes", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn rating_twice_updates_the_same_row() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "an");
        let post = fixtures::post(&db, &user, "trip");

        let first = match db.upsert_rating(&fixtures::id(), &user, &post, 4).unwrap() {
            RatingUpsert::Created(row) => row,
            other => panic!("expected create, got {:?}", other),
        };
        let second = match db.upsert_rating(&fixtures::id(), &user, &post, 2).unwrap() {
            RatingUpsert::Updated(row) => row,
            other => panic!("expected update, got {:?}", other),
        };
        assert_eq!(first.id, second.id);
        assert_eq!(second.stars, 2);

        let stats = db.post_stats(&post).unwrap();
        assert_eq!(stats.rating_count, 1);
        assert_eq!(stats.average_rating, Some(2.0));
    }

    #[test]
    fn out_of_range_stars_hit_the_check_constraint() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "an");
        let post = fixtures::post(&db, &user, "trip");
        assert!(db.upsert_rating(&fixtures::id(), &user, &post, 6).is_err());
    }

    #[test]
    fn average_is_a_plain_mean() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner");
        let post = fixtures::post(&db, &owner, "trip");
        for (name, stars) in [("a", 5), ("b", 4), ("c", 3)] {
            let rater = fixtures::user(&db, name);
            db.upsert_rating(&fixtures::id(), &rater, &post, stars).unwrap();
        }
        let stats = db.post_stats(&post).unwrap();
        assert_eq!(stats.rating_count, 3);
        assert_eq!(stats.average_rating, Some(4.0));
    }

    #[test]
    fn rating_update_and_delete_by_id() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "an");
        let post = fixtures::post(&db, &user, "trip");
        let id = fixtures::id();
        db.upsert_rating(&id, &user, &post, 1).unwrap();

        let row = db.update_rating_stars(&id, 5).unwrap().unwrap();
        assert_eq!(row.stars, 5);
        assert!(db.delete_rating(&id).unwrap());
        assert!(db.get_rating(&id).unwrap().is_none());
        assert!(db.update_rating_stars(&id, 3).unwrap().is_none());
    }
}
