use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            name        TEXT NOT NULL,
            password    TEXT NOT NULL,
            image       BLOB,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS grievances (
            id              TEXT PRIMARY KEY,
            filed_by        TEXT NOT NULL REFERENCES users(id),
            filed_against   TEXT NOT NULL REFERENCES users(id),
            text            TEXT NOT NULL,
            images          BLOB,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_grievances_filed_by
            ON grievances(filed_by, created_at);

        CREATE INDEX IF NOT EXISTS idx_grievances_filed_against
            ON grievances(filed_against, created_at);

        CREATE TABLE IF NOT EXISTS push_subscriptions (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL REFERENCES users(id),
            user_agent      TEXT NOT NULL,
            endpoint        TEXT NOT NULL UNIQUE,
            expiration_time INTEGER,
            p256dh          TEXT NOT NULL,
            auth            TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, user_agent)
        );

        CREATE INDEX IF NOT EXISTS idx_push_subscriptions_user
            ON push_subscriptions(user_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
