use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const LATEST_VERSION: i64 = 2;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, social graph, messages)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                user_id         INTEGER PRIMARY KEY AUTOINCREMENT,
                username        TEXT NOT NULL UNIQUE,
                email           TEXT NOT NULL,
                password        TEXT NOT NULL,
                profile_image   TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE UNIQUE INDEX idx_users_email ON users(lower(email));

            -- user1 is the requester while pending; one row per unordered pair
            CREATE TABLE friendship (
                friendship_id   INTEGER PRIMARY KEY AUTOINCREMENT,
                user1_id        INTEGER NOT NULL REFERENCES users(user_id),
                user2_id        INTEGER NOT NULL REFERENCES users(user_id),
                status          TEXT NOT NULL CHECK (status IN ('pending', 'accepted')),
                created_at      TEXT NOT NULL,
                CHECK (user1_id <> user2_id)
            );

            CREATE UNIQUE INDEX idx_friendship_pair
                ON friendship(min(user1_id, user2_id), max(user1_id, user2_id));

            CREATE TABLE blockeduser (
                blocker_id      INTEGER NOT NULL REFERENCES users(user_id),
                blocked_id      INTEGER NOT NULL REFERENCES users(user_id),
                created_at      TEXT NOT NULL,
                PRIMARY KEY (blocker_id, blocked_id),
                CHECK (blocker_id <> blocked_id)
            );

            CREATE TABLE message (
                message_id      INTEGER PRIMARY KEY AUTOINCREMENT,
                sender_id       INTEGER NOT NULL REFERENCES users(user_id),
                receiver_id     INTEGER NOT NULL REFERENCES users(user_id),
                content         TEXT NOT NULL,
                is_media        INTEGER NOT NULL DEFAULT 0,
                message_time    TEXT NOT NULL
            );

            CREATE INDEX idx_message_pair
                ON message(sender_id, receiver_id, message_time);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (feed, notifications)");
        conn.execute_batch(
            "
            CREATE TABLE posts (
                post_id         INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         INTEGER NOT NULL REFERENCES users(user_id),
                caption         TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_posts_user ON posts(user_id, created_at);

            CREATE TABLE post_images (
                image_id        INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id         INTEGER NOT NULL REFERENCES posts(post_id) ON DELETE CASCADE,
                image_url       TEXT NOT NULL
            );

            CREATE INDEX idx_post_images_post ON post_images(post_id);

            CREATE TABLE post_reactions (
                reaction_id     INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id         INTEGER NOT NULL REFERENCES posts(post_id) ON DELETE CASCADE,
                user_id         INTEGER NOT NULL REFERENCES users(user_id),
                reaction_type   TEXT NOT NULL DEFAULT 'like',
                created_at      TEXT NOT NULL,
                UNIQUE (post_id, user_id)
            );

            CREATE TABLE notifications (
                notification_id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         INTEGER NOT NULL REFERENCES users(user_id),
                sender_id       INTEGER NOT NULL REFERENCES users(user_id),
                type            TEXT NOT NULL,
                post_id         INTEGER REFERENCES posts(post_id) ON DELETE CASCADE,
                message         TEXT NOT NULL,
                is_read         INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_user
                ON notifications(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
