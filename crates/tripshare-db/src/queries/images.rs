use anyhow::Result;
use rusqlite::{Row, params};

use super::OptionalExt;
use crate::Database;
use crate::models::ImageRow;

impl Database {
    pub fn insert_image(&self, image: &ImageRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO images (id, post_id, reference, name, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![image.id, image.post_id, image.reference, image.name, image.created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_image(&self, id: &str) -> Result<Option<ImageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, post_id, reference, name, created_at FROM images WHERE id = ?1",
                    [id],
                    map_image,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn count_images(&self, post_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM images WHERE post_id = ?1", [post_id], |row| {
                    row.get(0)
                })?;
            Ok(count as u64)
        })
    }

    /// Images of a post, newest first.
    pub fn list_images(&self, post_id: &str, limit: u32, offset: u32) -> Result<Vec<ImageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, post_id, reference, name, created_at FROM images
                 WHERE post_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![post_id, limit, offset], map_image)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_image(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM images WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn map_image(row: &Row<'_>) -> rusqlite::Result<ImageRow> {
    Ok(ImageRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        reference: row.get(2)?,
        name: row.get(3)?,
        created_at: row.get(4)?,
    })
}
