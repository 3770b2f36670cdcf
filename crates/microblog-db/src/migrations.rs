use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const SCHEMA_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (accounts, posts)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE accounts (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                username        TEXT NOT NULL UNIQUE
                                CHECK (length(username) BETWEEN 1 AND 64),
                email           TEXT NOT NULL UNIQUE
                                CHECK (length(email) BETWEEN 3 AND 120),
                password_hash   TEXT
                                CHECK (password_hash IS NULL OR length(password_hash) <= 256)
            );

            CREATE TABLE posts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                body        TEXT NOT NULL CHECK (length(body) BETWEEN 1 AND 140),
                timestamp   TEXT NOT NULL,
                author_id   INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_posts_timestamp ON posts(timestamp);

            CREATE INDEX idx_posts_author ON posts(author_id, timestamp);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete (schema v{})", SCHEMA_VERSION);
    Ok(())
}
