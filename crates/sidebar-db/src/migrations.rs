use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (messages, users, descriptions)");
        conn.execute_batch(
            "
            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                path        TEXT NOT NULL,
                author      TEXT NOT NULL,
                message     TEXT NOT NULL,
                created_at  INTEGER NOT NULL
            );

            CREATE INDEX idx_messages_path
                ON messages(path, created_at);

            CREATE TABLE users (
                name        TEXT PRIMARY KEY COLLATE NOCASE,
                handle      TEXT NOT NULL,
                first_seen  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_users_handle
                ON users(handle COLLATE NOCASE);

            CREATE TABLE descriptions (
                path        TEXT PRIMARY KEY,
                text        TEXT NOT NULL,
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
