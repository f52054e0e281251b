use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id            TEXT PRIMARY KEY,
            username      TEXT NOT NULL UNIQUE,
            password      TEXT NOT NULL,
            first_name    TEXT NOT NULL DEFAULT '',
            last_name     TEXT NOT NULL DEFAULT '',
            email         TEXT NOT NULL DEFAULT '',
            phone_number  TEXT UNIQUE,
            gender        TEXT CHECK (gender IN ('men', 'women', 'others')),
            address       TEXT NOT NULL DEFAULT '',
            avatar        TEXT,
            role          TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
            active        INTEGER NOT NULL DEFAULT 1,
            report_count  INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS posts (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title           TEXT NOT NULL,
            description     TEXT NOT NULL DEFAULT '',
            start_time      TEXT NOT NULL,
            end_time        TEXT NOT NULL,
            cost            REAL,
            starting_point  TEXT NOT NULL,
            end_point       TEXT NOT NULL,
            status          INTEGER NOT NULL DEFAULT 1,
            active          INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_posts_created
            ON posts(active, created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id                 TEXT PRIMARY KEY,
            post_id            TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            user_id            TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            parent_comment_id  TEXT REFERENCES comments(id) ON DELETE CASCADE,
            content            TEXT NOT NULL,
            created_at         TEXT NOT NULL,
            updated_at         TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id, parent_comment_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_comments_parent
            ON comments(parent_comment_id);

        CREATE TABLE IF NOT EXISTS hashtags (
            id          TEXT PRIMARY KEY,
            label       TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS post_hashtags (
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            hashtag_id  TEXT NOT NULL REFERENCES hashtags(id) ON DELETE CASCADE,
            PRIMARY KEY (post_id, hashtag_id)
        );

        CREATE TABLE IF NOT EXISTS likes (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            active      INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            UNIQUE(user_id, post_id)
        );

        CREATE TABLE IF NOT EXISTS ratings (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            stars       INTEGER NOT NULL CHECK (stars BETWEEN 1 AND 5),
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            UNIQUE(user_id, post_id)
        );

        CREATE TABLE IF NOT EXISTS follows (
            id            TEXT PRIMARY KEY,
            follower_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            following_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at    TEXT NOT NULL,
            UNIQUE(follower_id, following_id),
            CHECK (follower_id <> following_id)
        );

        CREATE TABLE IF NOT EXISTS trip_groups (
            post_id     TEXT PRIMARY KEY REFERENCES posts(id) ON DELETE CASCADE,
            creator_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS group_members (
            post_id    TEXT NOT NULL REFERENCES trip_groups(post_id) ON DELETE CASCADE,
            user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            joined_at  TEXT NOT NULL,
            PRIMARY KEY (post_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS reports (
            id                TEXT PRIMARY KEY,
            reporter_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            reported_user_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            content           TEXT NOT NULL,
            created_at        TEXT NOT NULL,
            UNIQUE(reporter_id, reported_user_id)
        );

        CREATE TABLE IF NOT EXISTS images (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            reference   TEXT NOT NULL,
            name        TEXT,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_images_post
            ON images(post_id, created_at);

        CREATE TABLE IF NOT EXISTS revoked_tokens (
            jti         TEXT PRIMARY KEY,
            expires_at  TEXT NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
