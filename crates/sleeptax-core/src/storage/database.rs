//! SQLite-backed store.
//!
//! Every uniqueness rule is a schema constraint. Conflicting inserts use
//! `ON CONFLICT DO NOTHING` and report [`InsertOutcome::Conflict`] when no
//! row changed; sleep logging uses a single `ON CONFLICT DO UPDATE` upsert.
//! Multi-row changes (group creation, joins, week rollover) run inside an
//! immediate transaction.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, ToSql, TransactionBehavior,
};

use super::migrations;
use super::{EntryFilter, InsertOutcome, JoinOutcome, PledgeFilter, RollOutcome, SleepStore};
use crate::error::StoreError;
use crate::model::{Group, SleepEntry, User, Week, WeeklyPledge};

const ENTRY_COLUMNS: &str = "id, user_id, week_id, wake_date, hours, logged_at";
const WEEK_COLUMNS: &str = "id, group_id, week_number, is_active, start_date, end_date, winner_id";
const GROUP_COLUMNS: &str = "id, name, owner_id, code, created_at";

/// SQLite database holding groups, weeks, pledges and sleep entries.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and migrate it.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        Ok(self.conn.lock()?)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        avatar_url: row.get(3)?,
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        code: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn week_from_row(row: &Row<'_>) -> rusqlite::Result<Week> {
    Ok(Week {
        id: row.get(0)?,
        group_id: row.get(1)?,
        week_number: row.get(2)?,
        is_active: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        winner_id: row.get(6)?,
    })
}

fn pledge_from_row(row: &Row<'_>) -> rusqlite::Result<WeeklyPledge> {
    Ok(WeeklyPledge {
        id: row.get(0)?,
        week_id: row.get(1)?,
        user_id: row.get(2)?,
        amount: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<SleepEntry> {
    Ok(SleepEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        week_id: row.get(2)?,
        wake_date: row.get(3)?,
        hours: row.get(4)?,
        logged_at: row.get(5)?,
    })
}

fn outcome(changed: usize) -> InsertOutcome {
    if changed == 0 {
        InsertOutcome::Conflict
    } else {
        InsertOutcome::Inserted
    }
}

fn insert_week(conn: &Connection, week: &Week) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO weeks (id, group_id, week_number, is_active, start_date, end_date, winner_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            week.id,
            week.group_id,
            week.week_number,
            week.is_active,
            week.start_date,
            week.end_date,
            week.winner_id,
        ],
    )
}

impl SleepStore for SqliteStore {
    fn user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, email, name, avatar_url FROM users WHERE id = ?1",
                [id],
                user_from_row,
            )
            .optional()?)
    }

    fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        self.lock()?.execute(
            "INSERT INTO users (id, email, name, avatar_url) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                avatar_url = excluded.avatar_url",
            params![user.id, user.email, user.name, user.avatar_url],
        )?;
        Ok(())
    }

    fn insert_group(&self, group: &Group, first_week: &Week) -> Result<InsertOutcome, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "INSERT INTO groups (id, name, owner_id, code, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT DO NOTHING",
            params![group.id, group.name, group.owner_id, group.code, group.created_at],
        )?;
        if changed == 0 {
            return Ok(InsertOutcome::Conflict);
        }
        tx.execute(
            "INSERT INTO group_members (group_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            params![group.id, group.owner_id, group.created_at],
        )?;
        insert_week(&tx, first_week)?;
        tx.commit()?;
        Ok(InsertOutcome::Inserted)
    }

    fn group(&self, id: &str) -> Result<Option<Group>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = ?1"),
                [id],
                group_from_row,
            )
            .optional()?)
    }

    fn group_by_code(&self, code: &str) -> Result<Option<Group>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {GROUP_COLUMNS} FROM groups WHERE code = ?1"),
                [code],
                group_from_row,
            )
            .optional()?)
    }

    fn add_member(
        &self,
        group_id: &str,
        user_id: &str,
        joined_at: DateTime<Utc>,
        max_members: u32,
    ) -> Result<JoinOutcome, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                [group_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Ok(JoinOutcome::AlreadyMember);
        }
        let count: u32 = tx.query_row(
            "SELECT COUNT(*) FROM group_members WHERE group_id = ?1",
            [group_id],
            |row| row.get(0),
        )?;
        if count >= max_members {
            return Ok(JoinOutcome::Full);
        }
        tx.execute(
            "INSERT INTO group_members (group_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            params![group_id, user_id, joined_at],
        )?;
        tx.commit()?;
        Ok(JoinOutcome::Joined)
    }

    fn members(&self, group_id: &str) -> Result<Vec<User>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.email, u.name, u.avatar_url
             FROM group_members m JOIN users u ON u.id = m.user_id
             WHERE m.group_id = ?1
             ORDER BY m.joined_at, m.rowid",
        )?;
        let users = stmt
            .query_map([group_id], user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    fn week(&self, id: &str) -> Result<Option<Week>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {WEEK_COLUMNS} FROM weeks WHERE id = ?1"),
                [id],
                week_from_row,
            )
            .optional()?)
    }

    fn active_week(&self, group_id: &str) -> Result<Option<Week>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {WEEK_COLUMNS} FROM weeks WHERE group_id = ?1 AND is_active = 1"),
                [group_id],
                week_from_row,
            )
            .optional()?)
    }

    fn weeks(&self, group_id: &str) -> Result<Vec<Week>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {WEEK_COLUMNS} FROM weeks WHERE group_id = ?1 ORDER BY week_number"
        ))?;
        let weeks = stmt
            .query_map([group_id], week_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(weeks)
    }

    fn roll_week(
        &self,
        week_id: &str,
        winner_id: Option<&str>,
        closed_at: DateTime<Utc>,
        next: &Week,
    ) -> Result<RollOutcome, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let closed = tx.execute(
            "UPDATE weeks SET is_active = 0, end_date = ?2, winner_id = ?3
             WHERE id = ?1 AND is_active = 1",
            params![week_id, closed_at, winner_id],
        )?;
        if closed == 0 {
            return Ok(RollOutcome::NotActive);
        }
        insert_week(&tx, next)?;
        tx.commit()?;
        Ok(RollOutcome::Rolled)
    }

    fn pledges(&self, filter: &PledgeFilter) -> Result<Vec<WeeklyPledge>, StoreError> {
        let mut sql = String::from(
            "SELECT id, week_id, user_id, amount, created_at FROM weekly_pledges WHERE 1 = 1",
        );
        let mut args: Vec<&dyn ToSql> = Vec::new();
        if let Some(week_id) = &filter.week_id {
            sql.push_str(" AND week_id = ?");
            args.push(week_id);
        }
        if let Some(user_id) = &filter.user_id {
            sql.push_str(" AND user_id = ?");
            args.push(user_id);
        }
        sql.push_str(" ORDER BY created_at");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let pledges = stmt
            .query_map(params_from_iter(args), pledge_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pledges)
    }

    fn insert_pledge(&self, pledge: &WeeklyPledge) -> Result<InsertOutcome, StoreError> {
        let changed = self.lock()?.execute(
            "INSERT INTO weekly_pledges (id, week_id, user_id, amount, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT DO NOTHING",
            params![
                pledge.id,
                pledge.week_id,
                pledge.user_id,
                pledge.amount,
                pledge.created_at,
            ],
        )?;
        Ok(outcome(changed))
    }

    fn entries(&self, filter: &EntryFilter) -> Result<Vec<SleepEntry>, StoreError> {
        let mut sql = format!("SELECT {ENTRY_COLUMNS} FROM sleep_entries WHERE 1 = 1");
        let mut args: Vec<&dyn ToSql> = Vec::new();
        if let Some(user_id) = &filter.user_id {
            sql.push_str(" AND user_id = ?");
            args.push(user_id);
        }
        if let Some(week_id) = &filter.week_id {
            sql.push_str(" AND week_id = ?");
            args.push(week_id);
        }
        if let Some(since) = &filter.since {
            sql.push_str(" AND wake_date >= ?");
            args.push(since);
        }
        sql.push_str(" ORDER BY wake_date, rowid");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_from_iter(args), entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn entry(&self, id: &str) -> Result<Option<SleepEntry>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM sleep_entries WHERE id = ?1"),
                [id],
                entry_from_row,
            )
            .optional()?)
    }

    fn insert_entry(&self, entry: &SleepEntry) -> Result<InsertOutcome, StoreError> {
        let changed = self.lock()?.execute(
            &format!(
                "INSERT INTO sleep_entries ({ENTRY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT DO NOTHING"
            ),
            params![
                entry.id,
                entry.user_id,
                entry.week_id,
                entry.wake_date,
                entry.hours,
                entry.logged_at,
            ],
        )?;
        Ok(outcome(changed))
    }

    fn upsert_entry(&self, entry: &SleepEntry) -> Result<Option<SleepEntry>, StoreError> {
        let conn = self.lock()?;
        let stored = conn
            .query_row(
                &format!(
                    "INSERT INTO sleep_entries ({ENTRY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(user_id, wake_date) DO UPDATE SET
                        hours = excluded.hours,
                        logged_at = excluded.logged_at
                     WHERE sleep_entries.week_id = excluded.week_id
                     RETURNING {ENTRY_COLUMNS}"
                ),
                params![
                    entry.id,
                    entry.user_id,
                    entry.week_id,
                    entry.wake_date,
                    entry.hours,
                    entry.logged_at,
                ],
                entry_from_row,
            )
            .optional()?;
        Ok(stored)
    }

    fn update_entry(
        &self,
        id: &str,
        hours: f64,
        logged_at: DateTime<Utc>,
    ) -> Result<Option<SleepEntry>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!(
                    "UPDATE sleep_entries SET hours = ?2, logged_at = ?3 WHERE id = ?1
                     RETURNING {ENTRY_COLUMNS}"
                ),
                params![id, hours, logged_at],
                entry_from_row,
            )
            .optional()?)
    }

    fn delete_entry(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self
            .lock()?
            .execute("DELETE FROM sleep_entries WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }
}
