//! Storage collaborator: the record store the engines read from and write to.
//!
//! [`SleepStore`] is the seam. [`MemoryStore`] backs the demo and tests;
//! [`SqliteStore`] is the persistent implementation. Uniqueness rules
//! (one pledge per user and week, one entry per user and wake date, one
//! active week per group) are enforced here, atomically, and reported
//! through [`InsertOutcome`] rather than by silent overwrite.

mod config;
pub mod database;
pub mod memory;
pub mod migrations;

pub use config::{Config, Rules, SessionConfig};
pub use database::SqliteStore;
pub use memory::MemoryStore;

use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;

use crate::error::{ConfigError, StoreError};
use crate::model::{Group, SleepEntry, User, Week, WeeklyPledge};

/// Result of an insert guarded by a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Conflict,
}

/// Result of adding a member to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
    Full,
}

/// Result of closing a week and opening its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollOutcome {
    Rolled,
    /// The week was not (or no longer) active; nothing changed.
    NotActive,
}

/// Sleep entry query. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub user_id: Option<String>,
    pub week_id: Option<String>,
    /// Inclusive lower bound on wake date.
    pub since: Option<NaiveDate>,
}

impl EntryFilter {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn week(week_id: impl Into<String>) -> Self {
        Self {
            week_id: Some(week_id.into()),
            ..Self::default()
        }
    }

    pub fn since(mut self, date: NaiveDate) -> Self {
        self.since = Some(date);
        self
    }

    pub fn matches(&self, entry: &SleepEntry) -> bool {
        self.user_id.as_deref().map_or(true, |u| entry.user_id == u)
            && self.week_id.as_deref().map_or(true, |w| entry.week_id == w)
            && self.since.map_or(true, |d| entry.wake_date >= d)
    }
}

/// Pledge query. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PledgeFilter {
    pub week_id: Option<String>,
    pub user_id: Option<String>,
}

impl PledgeFilter {
    pub fn week(week_id: impl Into<String>) -> Self {
        Self {
            week_id: Some(week_id.into()),
            user_id: None,
        }
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn matches(&self, pledge: &WeeklyPledge) -> bool {
        self.week_id.as_deref().map_or(true, |w| pledge.week_id == w)
            && self.user_id.as_deref().map_or(true, |u| pledge.user_id == u)
    }
}

/// The record store behind the engines.
///
/// Every method is a single atomic unit. Implementations never retry;
/// failures surface as [`StoreError`].
pub trait SleepStore: Send + Sync {
    fn user(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Insert or refresh a profile.
    fn upsert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Insert a group, its owner's membership and its first week together.
    /// Conflicts when the id or join code is taken.
    fn insert_group(&self, group: &Group, first_week: &Week) -> Result<InsertOutcome, StoreError>;

    fn group(&self, id: &str) -> Result<Option<Group>, StoreError>;

    fn group_by_code(&self, code: &str) -> Result<Option<Group>, StoreError>;

    /// Add a member unless the group already has `max_members`.
    fn add_member(
        &self,
        group_id: &str,
        user_id: &str,
        joined_at: DateTime<Utc>,
        max_members: u32,
    ) -> Result<JoinOutcome, StoreError>;

    /// Members in join order.
    fn members(&self, group_id: &str) -> Result<Vec<User>, StoreError>;

    fn week(&self, id: &str) -> Result<Option<Week>, StoreError>;

    fn active_week(&self, group_id: &str) -> Result<Option<Week>, StoreError>;

    /// All weeks of a group, oldest first.
    fn weeks(&self, group_id: &str) -> Result<Vec<Week>, StoreError>;

    /// Close `week_id` (still active) and activate `next` in one step.
    fn roll_week(
        &self,
        week_id: &str,
        winner_id: Option<&str>,
        closed_at: DateTime<Utc>,
        next: &Week,
    ) -> Result<RollOutcome, StoreError>;

    fn pledges(&self, filter: &PledgeFilter) -> Result<Vec<WeeklyPledge>, StoreError>;

    /// Conflicts when the user already pledged for the week.
    fn insert_pledge(&self, pledge: &WeeklyPledge) -> Result<InsertOutcome, StoreError>;

    /// Matching entries, oldest wake date first.
    fn entries(&self, filter: &EntryFilter) -> Result<Vec<SleepEntry>, StoreError>;

    fn entry(&self, id: &str) -> Result<Option<SleepEntry>, StoreError>;

    /// Conflicts when the user already has an entry for the wake date.
    fn insert_entry(&self, entry: &SleepEntry) -> Result<InsertOutcome, StoreError>;

    /// Insert, or on a (user, wake date) conflict update hours and
    /// logged-at of the existing row. Returns the stored row, or `None` when
    /// the existing row belongs to a different week and was left untouched.
    fn upsert_entry(&self, entry: &SleepEntry) -> Result<Option<SleepEntry>, StoreError>;

    fn update_entry(
        &self,
        id: &str,
        hours: f64,
        logged_at: DateTime<Utc>,
    ) -> Result<Option<SleepEntry>, StoreError>;

    /// Returns whether a row was removed.
    fn delete_entry(&self, id: &str) -> Result<bool, StoreError>;
}

/// Returns the data directory.
///
/// `SLEEPTAX_DATA_DIR` wins when set; otherwise `~/.config/sleeptax`, or
/// `~/.config/sleeptax-dev` with `SLEEPTAX_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("SLEEPTAX_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("SLEEPTAX_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("sleeptax-dev")
            } else {
                base_dir.join("sleeptax")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
