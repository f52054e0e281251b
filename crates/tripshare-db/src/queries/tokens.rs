use anyhow::Result;
use rusqlite::params;

use super::users::exists;
use crate::{Database, timestamp};

impl Database {
    /// Remember a logged-out token until it would have expired anyway.
    pub fn revoke_token(&self, jti: &str, expires_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO revoked_tokens (jti, expires_at) VALUES (?1, ?2)",
                params![jti, expires_at],
            )?;
            Ok(())
        })
    }

    pub fn is_token_revoked(&self, jti: &str) -> Result<bool> {
        self.with_conn(|conn| exists(conn, "SELECT 1 FROM revoked_tokens WHERE jti = ?1", jti))
    }

    /// Drop revocations whose tokens have expired. Returns how many went.
    pub fn purge_expired_tokens(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM revoked_tokens WHERE expires_at < ?1",
                [timestamp()],
            )?;
            Ok(removed)
        })
    }
}
