//! Database schema migrations for the SQLite store.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if a migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )?;

    let current_version = schema_version(conn)?;
    if current_version < 1 {
        tracing::info!("initializing database schema v1");
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        tracing::info!("running migration to v2");
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Returns 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> SqliteResult<i32> {
    Ok(conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .optional()?
        .unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: users, groups, weeks, pledges and sleep entries.
///
/// Uniqueness lives in the schema: one pledge per (week, user), one entry
/// per (user, wake date), one active week per group.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL DEFAULT '',
            name        TEXT NOT NULL,
            avatar_url  TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS groups (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            owner_id    TEXT NOT NULL REFERENCES users(id),
            code        TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS group_members (
            group_id    TEXT NOT NULL REFERENCES groups(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            joined_at   TEXT NOT NULL,
            PRIMARY KEY (group_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS weeks (
            id          TEXT PRIMARY KEY,
            group_id    TEXT NOT NULL REFERENCES groups(id),
            week_number INTEGER NOT NULL,
            is_active   INTEGER NOT NULL DEFAULT 1,
            start_date  TEXT NOT NULL,
            end_date    TEXT,
            winner_id   TEXT,
            UNIQUE (group_id, week_number)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_weeks_one_active
            ON weeks(group_id) WHERE is_active = 1;

        CREATE TABLE IF NOT EXISTS weekly_pledges (
            id          TEXT PRIMARY KEY,
            week_id     TEXT NOT NULL REFERENCES weeks(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            amount      REAL NOT NULL,
            created_at  TEXT NOT NULL,
            UNIQUE (week_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS sleep_entries (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            week_id     TEXT NOT NULL,
            wake_date   TEXT NOT NULL,
            hours       REAL NOT NULL,
            logged_at   TEXT NOT NULL,
            UNIQUE (user_id, wake_date)
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: indexes for the leaderboard query patterns.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_entries_week ON sleep_entries(week_id);
         CREATE INDEX IF NOT EXISTS idx_entries_wake_date ON sleep_entries(wake_date);
         CREATE INDEX IF NOT EXISTS idx_members_joined ON group_members(group_id, joined_at);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}
