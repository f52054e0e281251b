use anyhow::Result;
use rusqlite::{Connection, Row, params};

use super::OptionalExt;
use crate::models::CommentRow;
use crate::{Database, timestamp};

/// Deepest reply allowed below a top-level comment. A top-level comment
/// sits at depth 0, its replies at 1, and so on.
pub const MAX_REPLY_DEPTH: usize = 64;

/// Outcome of inserting a comment into a thread.
#[derive(Debug)]
pub enum CommentInsert {
    Inserted(CommentRow),
    PostNotFound,
    ParentNotFound,
    /// The parent exists but hangs off a different post.
    ParentInOtherPost,
    /// The reply would sit below [`MAX_REPLY_DEPTH`].
    TooDeep,
}

// JOIN users so author name/avatar come back in one query
const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.user_id, u.username, u.avatar,
            c.parent_comment_id, c.content, c.created_at, c.updated_at
     FROM comments c
     LEFT JOIN users u ON c.user_id = u.id";

impl Database {
    /// Insert a comment, optionally as a reply.
    ///
    /// The parent must already exist in the same post, so the parent
    /// relation can only point backwards in time and never across posts.
    /// This keeps every post's comments a forest.
    pub fn insert_comment(
        &self,
        id: &str,
        post_id: &str,
        user_id: &str,
        parent_comment_id: Option<&str>,
        content: &str,
    ) -> Result<CommentInsert> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let post_active: Option<bool> = tx
                .query_row("SELECT active FROM posts WHERE id = ?1", [post_id], |row| row.get(0))
                .optional()?;
            if post_active != Some(true) {
                return Ok(CommentInsert::PostNotFound);
            }

            if let Some(parent_id) = parent_comment_id {
                let parent_post: Option<String> = tx
                    .query_row(
                        "SELECT post_id FROM comments WHERE id = ?1",
                        [parent_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                match parent_post {
                    None => return Ok(CommentInsert::ParentNotFound),
                    Some(pid) if pid != post_id => return Ok(CommentInsert::ParentInOtherPost),
                    Some(_) => {}
                }

                if parent_depth(&tx, parent_id)? >= MAX_REPLY_DEPTH {
                    return Ok(CommentInsert::TooDeep);
                }
            }

            let now = timestamp();
            tx.execute(
                "INSERT INTO comments (id, post_id, user_id, parent_comment_id, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![id, post_id, user_id, parent_comment_id, content, now],
            )?;

            let row = query_comment(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("Comment {} vanished after insert", id))?;
            tx.commit()?;

            Ok(CommentInsert::Inserted(row))
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| query_comment(conn, id))
    }

    pub fn count_top_level_comments(&self, post_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE post_id = ?1 AND parent_comment_id IS NULL",
                [post_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Top-level comments of a post, newest first.
    pub fn list_top_level_comments(
        &self,
        post_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{}
                 WHERE c.post_id = ?1 AND c.parent_comment_id IS NULL
                 ORDER BY c.created_at DESC, c.rowid DESC
                 LIMIT ?2 OFFSET ?3",
                COMMENT_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![post_id, limit, offset], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every comment of a post, oldest first. Used to build reply trees.
    pub fn comments_for_post(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{}
                 WHERE c.post_id = ?1
                 ORDER BY c.created_at ASC, c.rowid ASC",
                COMMENT_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([post_id], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_comment_content(&self, id: &str, content: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, content, timestamp()],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_comment(conn, id)
        })
    }

    /// Delete a comment and all of its transitive replies.
    /// Returns how many rows were removed (0 if the id is unknown).
    ///
    /// Rows go deepest first, so the self-referencing cascade never has
    /// anything left to chase.
    pub fn delete_comment(&self, id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let subtree: Vec<String> = {
                let mut stmt = tx.prepare(
                    "WITH RECURSIVE subtree(id, depth) AS (
                         SELECT id, 0 FROM comments WHERE id = ?1
                         UNION
                         SELECT c.id, s.depth + 1
                         FROM comments c JOIN subtree s ON c.parent_comment_id = s.id
                     )
                     SELECT id FROM subtree ORDER BY depth DESC",
                )?;
                let ids = stmt
                    .query_map([id], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                ids
            };

            {
                let mut delete = tx.prepare("DELETE FROM comments WHERE id = ?1")?;
                for comment_id in &subtree {
                    delete.execute([comment_id])?;
                }
            }
            tx.commit()?;

            Ok(subtree.len())
        })
    }
}

/// How many ancestors `id` has. Stops counting once it passes
/// [`MAX_REPLY_DEPTH`], which is all the caller needs to know.
fn parent_depth(conn: &Connection, id: &str) -> Result<usize> {
    let depth: i64 = conn.query_row(
        "WITH RECURSIVE chain(id, depth) AS (
             SELECT ?1, 0
             UNION ALL
             SELECT c.parent_comment_id, ch.depth + 1
             FROM chain ch JOIN comments c ON c.id = ch.id
             WHERE c.parent_comment_id IS NOT NULL AND ch.depth < ?2
         )
         SELECT MAX(depth) FROM chain",
        params![id, MAX_REPLY_DEPTH as i64],
        |row| row.get(0),
    )?;
    Ok(depth as usize)
}

fn query_comment(conn: &Connection, id: &str) -> Result<Option<CommentRow>> {
    let sql = format!("{} WHERE c.id = ?1", COMMENT_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_comment).optional()?;
    Ok(row)
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        user_id: row.get(2)?,
        author_username: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        author_avatar: row.get(4)?,
        parent_comment_id: row.get(5)?,
        content: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    fn inserted(outcome: CommentInsert) -> CommentRow {
        match outcome {
            CommentInsert::Inserted(row) => row,
            other => panic!("expected insert, got {:?}", other),
        }
    }

    #[test]
    fn reply_must_belong_to_the_same_post() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "an");
        let p1 = fixtures::post(&db, &user, "one");
        let p2 = fixtures::post(&db, &user, "two");

        let root = inserted(db.insert_comment(&fixtures::id(), &p1, &user, None, "root").unwrap());
        assert_eq!(root.author_username, "an");

        let outcome = db
            .insert_comment(&fixtures::id(), &p2, &user, Some(&root.id), "sneaky")
            .unwrap();
        assert!(matches!(outcome, CommentInsert::ParentInOtherPost));

        let outcome = db
            .insert_comment(&fixtures::id(), &p1, &user, Some("no-such-comment"), "orphan")
            .unwrap();
        assert!(matches!(outcome, CommentInsert::ParentNotFound));

        let outcome = db
            .insert_comment(&fixtures::id(), "no-such-post", &user, None, "lost")
            .unwrap();
        assert!(matches!(outcome, CommentInsert::PostNotFound));

        let reply = inserted(
            db.insert_comment(&fixtures::id(), &p1, &user, Some(&root.id), "reply")
                .unwrap(),
        );
        assert_eq!(reply.parent_comment_id.as_deref(), Some(root.id.as_str()));
    }

    #[test]
    fn top_level_listing_excludes_replies_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "an");
        let post = fixtures::post(&db, &user, "trip");

        let a = inserted(db.insert_comment(&fixtures::id(), &post, &user, None, "a").unwrap());
        let b = inserted(db.insert_comment(&fixtures::id(), &post, &user, None, "b").unwrap());
        db.insert_comment(&fixtures::id(), &post, &user, Some(&a.id), "a.1")
            .unwrap();

        assert_eq!(db.count_top_level_comments(&post).unwrap(), 2);
        let ids: Vec<String> = db
            .list_top_level_comments(&post, 5, 0)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![b.id, a.id]);
        assert_eq!(db.comments_for_post(&post).unwrap().len(), 3);
    }

    #[test]
    fn delete_cascades_through_the_whole_subtree() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "an");
        let post = fixtures::post(&db, &user, "trip");

        let root = inserted(db.insert_comment(&fixtures::id(), &post, &user, None, "root").unwrap());
        let child = inserted(
            db.insert_comment(&fixtures::id(), &post, &user, Some(&root.id), "child")
                .unwrap(),
        );
        let grandchild = inserted(
            db.insert_comment(&fixtures::id(), &post, &user, Some(&child.id), "grandchild")
                .unwrap(),
        );
        let other = inserted(db.insert_comment(&fixtures::id(), &post, &user, None, "other").unwrap());

        assert_eq!(db.delete_comment(&root.id).unwrap(), 3);
        assert!(db.get_comment(&child.id).unwrap().is_none());
        assert!(db.get_comment(&grandchild.id).unwrap().is_none());
        assert!(db.get_comment(&other.id).unwrap().is_some());
        assert_eq!(db.delete_comment(&root.id).unwrap(), 0);
    }

    /// Root plus a straight reply chain; returns ids from the root down.
    fn chain(db: &Database, post: &str, user: &str, replies: usize) -> Vec<String> {
        let root = inserted(db.insert_comment(&fixtures::id(), post, user, None, "root").unwrap());
        let mut ids = vec![root.id];
        for _ in 0..replies {
            let parent = ids.last().cloned();
            let reply = inserted(
                db.insert_comment(&fixtures::id(), post, user, parent.as_deref(), "reply")
                    .unwrap(),
            );
            ids.push(reply.id);
        }
        ids
    }

    #[test]
    fn replies_stop_at_max_depth() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "an");
        let post = fixtures::post(&db, &user, "trip");

        let ids = chain(&db, &post, &user, MAX_REPLY_DEPTH);
        let deepest = ids.last().unwrap();
        assert_eq!(
            db.with_conn(|conn| parent_depth(conn, deepest)).unwrap(),
            MAX_REPLY_DEPTH
        );

        let outcome = db
            .insert_comment(&fixtures::id(), &post, &user, Some(deepest), "too far")
            .unwrap();
        assert!(matches!(outcome, CommentInsert::TooDeep));
        assert_eq!(db.comments_for_post(&post).unwrap().len(), MAX_REPLY_DEPTH + 1);

        // Siblings higher up are still fine
        inserted(
            db.insert_comment(&fixtures::id(), &post, &user, Some(&ids[1]), "side")
                .unwrap(),
        );
    }

    #[test]
    fn delete_clears_a_chain_at_max_depth() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "an");
        let post = fixtures::post(&db, &user, "trip");

        let ids = chain(&db, &post, &user, MAX_REPLY_DEPTH);
        assert_eq!(db.delete_comment(&ids[0]).unwrap(), MAX_REPLY_DEPTH + 1);
        assert!(db.comments_for_post(&post).unwrap().is_empty());
    }

    #[test]
    fn update_touches_content_only() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "an");
        let post = fixtures::post(&db, &user, "trip");
        let c = inserted(db.insert_comment(&fixtures::id(), &post, &user, None, "old").unwrap());

        let updated = db.update_comment_content(&c.id, "new").unwrap().unwrap();
        assert_eq!(updated.content, "new");
        assert_eq!(updated.created_at, c.created_at);
        assert!(updated.updated_at >= c.updated_at);
        assert!(db.update_comment_content("missing", "x").unwrap().is_none());
    }
}
