//! Pledge-gated sleep logging, leaderboards and weekly rollover.
//!
//! [`SleepTax`] is stateless between calls: every operation fetches the
//! group, week and pledge state it needs from the store right before use.
//! Validation errors are raised before any write; state conflicts are
//! checked against fresh reads or settled by the store's constraints.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::identity::{Clock, IdentityProvider, SystemClock};
use crate::leaderboard;
use crate::model::{Group, LeaderboardEntry, SleepEntry, User, UserStats, Week, WeeklyPledge};
use crate::storage::{
    EntryFilter, InsertOutcome, JoinOutcome, PledgeFilter, RollOutcome, Rules, SleepStore,
};
use crate::streak::compute_streak;

const CODE_ATTEMPTS: usize = 3;

/// Parse a `YYYY-MM-DD` wake date.
pub fn parse_wake_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| CoreError::InvalidDate(s.to_string()))
}

/// The weekly sleep-tax game over a [`SleepStore`].
pub struct SleepTax {
    store: Arc<dyn SleepStore>,
    identity: Box<dyn IdentityProvider>,
    clock: Box<dyn Clock>,
    rules: Rules,
}

impl SleepTax {
    pub fn new(store: Arc<dyn SleepStore>, identity: impl IdentityProvider + 'static) -> Self {
        Self {
            store,
            identity: Box::new(identity),
            clock: Box::new(SystemClock),
            rules: Rules::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }

    pub fn store(&self) -> &dyn SleepStore {
        self.store.as_ref()
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    fn caller(&self) -> Result<User> {
        self.identity.current_user()?.ok_or(CoreError::NotAuthenticated)
    }

    fn validate_amount(&self, amount: f64) -> Result<()> {
        if (0.0..=self.rules.max_pledge).contains(&amount) {
            Ok(())
        } else {
            Err(CoreError::InvalidAmount {
                amount,
                min: 0.0,
                max: self.rules.max_pledge,
            })
        }
    }

    fn validate_hours(&self, hours: f64) -> Result<()> {
        if (self.rules.min_sleep_hours..=self.rules.max_sleep_hours).contains(&hours) {
            Ok(())
        } else {
            Err(CoreError::InvalidHours {
                hours,
                min: self.rules.min_sleep_hours,
                max: self.rules.max_sleep_hours,
            })
        }
    }

    fn require_member(&self, group_id: &str, user_id: &str) -> Result<()> {
        if self.store.members(group_id)?.iter().any(|m| m.id == user_id) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "not a member of group {group_id}"
            )))
        }
    }

    /// Store the caller's profile, creating it on first use.
    pub fn ensure_profile(&self) -> Result<User> {
        let user = self.caller()?;
        if self.store.user(&user.id)?.as_ref() != Some(&user) {
            self.store.upsert_user(&user)?;
            debug!(user_id = %user.id, "profile stored");
        }
        Ok(user)
    }

    /// Create a group owned by the caller and open its first week.
    pub fn create_group(&self, name: &str) -> Result<(Group, Week)> {
        let owner = self.ensure_profile()?;
        let now = self.clock.now();
        for _ in 0..CODE_ATTEMPTS {
            let group = Group {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.trim().to_string(),
                owner_id: owner.id.clone(),
                code: join_code(),
                created_at: now,
            };
            let week = Week::open(&group.id, 1, now);
            if self.store.insert_group(&group, &week)? == InsertOutcome::Inserted {
                info!(group_id = %group.id, owner_id = %owner.id, "group created");
                return Ok((group, week));
            }
            debug!(code = %group.code, "join code taken, drawing another");
        }
        warn!(attempts = CODE_ATTEMPTS, "group creation failed: no free join code");
        Err(CoreError::Conflict("could not allocate a unique join code".into()))
    }

    /// Join the group with `code`. Joining a group twice is a no-op.
    pub fn join_group(&self, code: &str) -> Result<Group> {
        let user = self.ensure_profile()?;
        let group = self
            .store
            .group_by_code(code.trim())?
            .ok_or_else(|| CoreError::not_found("group", code))?;
        match self.store.add_member(
            &group.id,
            &user.id,
            self.clock.now(),
            self.rules.max_group_size,
        )? {
            JoinOutcome::Joined => info!(group_id = %group.id, user_id = %user.id, "member joined"),
            JoinOutcome::AlreadyMember => debug!(group_id = %group.id, "already a member"),
            JoinOutcome::Full => {
                warn!(group_id = %group.id, "join rejected: group full");
                return Err(CoreError::GroupFull {
                    max: self.rules.max_group_size,
                });
            }
        }
        Ok(group)
    }

    pub fn group(&self, group_id: &str) -> Result<Group> {
        self.store
            .group(group_id)?
            .ok_or_else(|| CoreError::not_found("group", group_id))
    }

    /// Members in join order.
    pub fn members(&self, group_id: &str) -> Result<Vec<User>> {
        Ok(self.store.members(group_id)?)
    }

    /// The group's active week, fetched fresh.
    pub fn current_week(&self, group_id: &str) -> Result<Week> {
        self.store
            .active_week(group_id)?
            .ok_or_else(|| CoreError::not_found("active week for group", group_id))
    }

    pub fn week_history(&self, group_id: &str) -> Result<Vec<Week>> {
        Ok(self.store.weeks(group_id)?)
    }

    fn week(&self, week_id: &str) -> Result<Week> {
        self.store
            .week(week_id)?
            .ok_or_else(|| CoreError::not_found("week", week_id))
    }

    pub fn my_pledge(&self, week_id: &str) -> Result<Option<WeeklyPledge>> {
        let user = self.caller()?;
        Ok(self
            .store
            .pledges(&PledgeFilter::week(week_id).user(&user.id))?
            .into_iter()
            .next())
    }

    /// Pledge `amount` dollars for `week_id`. Once per user and week.
    pub fn pledge_sleep_tax(&self, week_id: &str, amount: f64) -> Result<WeeklyPledge> {
        self.validate_amount(amount)?;
        let user = self.caller()?;
        let week = self.week(week_id)?;
        if !week.is_active {
            return Err(CoreError::WeekNotActive(week.id));
        }
        self.require_member(&week.group_id, &user.id)?;

        let pledge = WeeklyPledge {
            id: uuid::Uuid::new_v4().to_string(),
            week_id: week.id.clone(),
            user_id: user.id.clone(),
            amount,
            created_at: self.clock.now(),
        };
        match self.store.insert_pledge(&pledge)? {
            InsertOutcome::Inserted => {
                info!(week_id = %week.id, user_id = %user.id, amount, "pledge created");
                Ok(pledge)
            }
            InsertOutcome::Conflict => {
                warn!(week_id = %week.id, user_id = %user.id, "pledge rejected: already pledged");
                Err(CoreError::AlreadyPledged)
            }
        }
    }

    /// Log the caller's sleep for `wake_date` in the group's active week.
    ///
    /// Requires a pledge for that week. Logging the same wake date again
    /// replaces the hours of the existing entry, unless that entry belongs to
    /// a closed week.
    pub fn log_sleep(
        &self,
        group_id: &str,
        wake_date: NaiveDate,
        hours: f64,
    ) -> Result<SleepEntry> {
        self.validate_hours(hours)?;
        let user = self.caller()?;
        let week = self.current_week(group_id)?;
        let pledged = !self
            .store
            .pledges(&PledgeFilter::week(&week.id).user(&user.id))?
            .is_empty();
        if !pledged {
            warn!(week_id = %week.id, user_id = %user.id, "sleep log rejected: no pledge");
            return Err(CoreError::PledgeRequired);
        }

        let entry = SleepEntry {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            week_id: week.id.clone(),
            wake_date,
            hours,
            logged_at: self.clock.now(),
        };
        let Some(stored) = self.store.upsert_entry(&entry)? else {
            let closed = self
                .store
                .entries(&EntryFilter::user(&user.id))?
                .into_iter()
                .find(|e| e.wake_date == wake_date)
                .map_or(week.id, |e| e.week_id);
            warn!(
                user_id = %user.id,
                %wake_date,
                week_id = %closed,
                "sleep log rejected: week closed"
            );
            return Err(CoreError::WeekNotActive(closed));
        };
        info!(
            entry_id = %stored.id,
            user_id = %user.id,
            %wake_date,
            hours,
            updated = stored.id != entry.id,
            "sleep logged"
        );
        Ok(stored)
    }

    pub fn entries_for_week(&self, week_id: &str) -> Result<Vec<SleepEntry>> {
        Ok(self.store.entries(&EntryFilter::week(week_id))?)
    }

    /// The caller's entries waking on or after `since`.
    pub fn my_entries_since(&self, since: NaiveDate) -> Result<Vec<SleepEntry>> {
        let user = self.caller()?;
        Ok(self.store.entries(&EntryFilter::user(&user.id).since(since))?)
    }

    /// One of the caller's entries in a still-active week.
    fn own_entry(&self, entry_id: &str) -> Result<SleepEntry> {
        let user = self.caller()?;
        let entry = self
            .store
            .entry(entry_id)?
            .ok_or_else(|| CoreError::not_found("entry", entry_id))?;
        if entry.user_id != user.id {
            warn!(entry_id, user_id = %user.id, "entry change rejected: not the owner");
            return Err(CoreError::Forbidden("entry belongs to another user".into()));
        }
        let active = self.store.week(&entry.week_id)?.is_some_and(|w| w.is_active);
        if !active {
            warn!(entry_id, week_id = %entry.week_id, "entry change rejected: week closed");
            return Err(CoreError::WeekNotActive(entry.week_id));
        }
        Ok(entry)
    }

    /// Replace the hours of one of the caller's entries.
    pub fn amend_entry(&self, entry_id: &str, hours: f64) -> Result<SleepEntry> {
        self.validate_hours(hours)?;
        self.own_entry(entry_id)?;
        let updated = self
            .store
            .update_entry(entry_id, hours, self.clock.now())?
            .ok_or_else(|| CoreError::not_found("entry", entry_id))?;
        info!(entry_id, hours, "entry amended");
        Ok(updated)
    }

    /// Remove one of the caller's entries.
    pub fn delete_entry(&self, entry_id: &str) -> Result<()> {
        self.own_entry(entry_id)?;
        if !self.store.delete_entry(entry_id)? {
            return Err(CoreError::not_found("entry", entry_id));
        }
        info!(entry_id, "entry deleted");
        Ok(())
    }

    /// Rank every member of the week's group. Recomputed on each call.
    pub fn get_leaderboard(&self, week_id: &str) -> Result<Vec<LeaderboardEntry>> {
        let week = self.week(week_id)?;
        let members = self.store.members(&week.group_id)?;
        let mut history = Vec::new();
        for member in &members {
            history.extend(self.store.entries(&EntryFilter::user(&member.id))?);
        }
        let pledges = self.store.pledges(&PledgeFilter::week(week_id))?;

        let board = leaderboard::rank(
            week_id,
            &members,
            &history,
            &pledges,
            self.clock.today(),
            self.rules.min_streak_hours,
        );
        debug!(week_id, rows = board.len(), "leaderboard computed");
        Ok(board)
    }

    /// One user's entries for a week plus their cross-week streak.
    pub fn user_stats(&self, user_id: &str, week_id: &str) -> Result<UserStats> {
        let history = self.store.entries(&EntryFilter::user(user_id))?;
        let streak = compute_streak(
            user_id,
            &history,
            self.clock.today(),
            self.rules.min_streak_hours,
        );
        let entries = history.into_iter().filter(|e| e.week_id == week_id).collect();
        Ok(UserStats {
            user_id: user_id.to_string(),
            week_id: week_id.to_string(),
            entries,
            streak,
        })
    }

    /// Close the group's active week and open the next one. Owner only.
    ///
    /// The winner is the leaderboard's rank-1 member at closing time, if
    /// they logged at least one night.
    pub fn end_week(&self, group_id: &str) -> Result<Week> {
        let user = self.caller()?;
        let group = self.group(group_id)?;
        if group.owner_id != user.id {
            warn!(group_id, user_id = %user.id, "end of week rejected: not the owner");
            return Err(CoreError::Forbidden("only the owner can end the week".into()));
        }

        let week = self.current_week(group_id)?;
        let board = self.get_leaderboard(&week.id)?;
        let winner_id = leaderboard::winner(&board).map(|row| row.user_id.as_str());

        let now = self.clock.now();
        let next = Week::open(group_id, week.week_number + 1, now);
        match self.store.roll_week(&week.id, winner_id, now, &next)? {
            RollOutcome::Rolled => {
                info!(
                    group_id,
                    closed_week = week.week_number,
                    winner_id = winner_id.unwrap_or("-"),
                    "week rolled over"
                );
                Ok(next)
            }
            RollOutcome::NotActive => Err(CoreError::WeekNotActive(week.id)),
        }
    }
}

fn join_code() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    format!("SLEEP-{}", &raw[..6])
}
