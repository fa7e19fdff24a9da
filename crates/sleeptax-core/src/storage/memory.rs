//! In-process store.
//!
//! One mutex guards all tables, so every trait method runs as a single
//! writer and observes a consistent snapshot.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{EntryFilter, InsertOutcome, JoinOutcome, PledgeFilter, RollOutcome, SleepStore};
use crate::error::StoreError;
use crate::model::{Group, SleepEntry, User, Week, WeeklyPledge};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<Group>,
    /// (group_id, user_id, joined_at) in join order.
    members: Vec<(String, String, DateTime<Utc>)>,
    weeks: Vec<Week>,
    pledges: Vec<WeeklyPledge>,
    entries: Vec<SleepEntry>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        Ok(self.tables.lock()?)
    }
}

impl SleepStore for MemoryStore {
    fn user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        match t.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user.clone(),
            None => t.users.push(user.clone()),
        }
        Ok(())
    }

    fn insert_group(&self, group: &Group, first_week: &Week) -> Result<InsertOutcome, StoreError> {
        let mut t = self.lock()?;
        if t.groups
            .iter()
            .any(|g| g.id == group.id || g.code == group.code)
        {
            return Ok(InsertOutcome::Conflict);
        }
        t.groups.push(group.clone());
        t.members
            .push((group.id.clone(), group.owner_id.clone(), group.created_at));
        t.weeks.push(first_week.clone());
        Ok(InsertOutcome::Inserted)
    }

    fn group(&self, id: &str) -> Result<Option<Group>, StoreError> {
        Ok(self.lock()?.groups.iter().find(|g| g.id == id).cloned())
    }

    fn group_by_code(&self, code: &str) -> Result<Option<Group>, StoreError> {
        Ok(self.lock()?.groups.iter().find(|g| g.code == code).cloned())
    }

    fn add_member(
        &self,
        group_id: &str,
        user_id: &str,
        joined_at: DateTime<Utc>,
        max_members: u32,
    ) -> Result<JoinOutcome, StoreError> {
        let mut t = self.lock()?;
        let mut count = 0u32;
        for (g, u, _) in &t.members {
            if g == group_id {
                if u == user_id {
                    return Ok(JoinOutcome::AlreadyMember);
                }
                count += 1;
            }
        }
        if count >= max_members {
            return Ok(JoinOutcome::Full);
        }
        t.members
            .push((group_id.to_string(), user_id.to_string(), joined_at));
        Ok(JoinOutcome::Joined)
    }

    fn members(&self, group_id: &str) -> Result<Vec<User>, StoreError> {
        let t = self.lock()?;
        Ok(t.members
            .iter()
            .filter(|(g, _, _)| g == group_id)
            .filter_map(|(_, u, _)| t.users.iter().find(|user| &user.id == u).cloned())
            .collect())
    }

    fn week(&self, id: &str) -> Result<Option<Week>, StoreError> {
        Ok(self.lock()?.weeks.iter().find(|w| w.id == id).cloned())
    }

    fn active_week(&self, group_id: &str) -> Result<Option<Week>, StoreError> {
        Ok(self
            .lock()?
            .weeks
            .iter()
            .find(|w| w.group_id == group_id && w.is_active)
            .cloned())
    }

    fn weeks(&self, group_id: &str) -> Result<Vec<Week>, StoreError> {
        let mut weeks: Vec<Week> = self
            .lock()?
            .weeks
            .iter()
            .filter(|w| w.group_id == group_id)
            .cloned()
            .collect();
        weeks.sort_by_key(|w| w.week_number);
        Ok(weeks)
    }

    fn roll_week(
        &self,
        week_id: &str,
        winner_id: Option<&str>,
        closed_at: DateTime<Utc>,
        next: &Week,
    ) -> Result<RollOutcome, StoreError> {
        let mut t = self.lock()?;
        let Some(week) = t.weeks.iter_mut().find(|w| w.id == week_id && w.is_active) else {
            return Ok(RollOutcome::NotActive);
        };
        week.is_active = false;
        week.end_date = Some(closed_at);
        week.winner_id = winner_id.map(str::to_string);
        t.weeks.push(next.clone());
        Ok(RollOutcome::Rolled)
    }

    fn pledges(&self, filter: &PledgeFilter) -> Result<Vec<WeeklyPledge>, StoreError> {
        Ok(self
            .lock()?
            .pledges
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    fn insert_pledge(&self, pledge: &WeeklyPledge) -> Result<InsertOutcome, StoreError> {
        let mut t = self.lock()?;
        if t.pledges
            .iter()
            .any(|p| p.week_id == pledge.week_id && p.user_id == pledge.user_id)
        {
            return Ok(InsertOutcome::Conflict);
        }
        t.pledges.push(pledge.clone());
        Ok(InsertOutcome::Inserted)
    }

    fn entries(&self, filter: &EntryFilter) -> Result<Vec<SleepEntry>, StoreError> {
        let mut entries: Vec<SleepEntry> = self
            .lock()?
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.wake_date);
        Ok(entries)
    }

    fn entry(&self, id: &str) -> Result<Option<SleepEntry>, StoreError> {
        Ok(self.lock()?.entries.iter().find(|e| e.id == id).cloned())
    }

    fn insert_entry(&self, entry: &SleepEntry) -> Result<InsertOutcome, StoreError> {
        let mut t = self.lock()?;
        if t.entries.iter().any(|e| {
            e.id == entry.id || (e.user_id == entry.user_id && e.wake_date == entry.wake_date)
        }) {
            return Ok(InsertOutcome::Conflict);
        }
        t.entries.push(entry.clone());
        Ok(InsertOutcome::Inserted)
    }

    fn upsert_entry(&self, entry: &SleepEntry) -> Result<Option<SleepEntry>, StoreError> {
        let mut t = self.lock()?;
        if let Some(existing) = t
            .entries
            .iter_mut()
            .find(|e| e.user_id == entry.user_id && e.wake_date == entry.wake_date)
        {
            if existing.week_id != entry.week_id {
                return Ok(None);
            }
            existing.hours = entry.hours;
            existing.logged_at = entry.logged_at;
            return Ok(Some(existing.clone()));
        }
        t.entries.push(entry.clone());
        Ok(Some(entry.clone()))
    }

    fn update_entry(
        &self,
        id: &str,
        hours: f64,
        logged_at: DateTime<Utc>,
    ) -> Result<Option<SleepEntry>, StoreError> {
        let mut t = self.lock()?;
        Ok(t.entries.iter_mut().find(|e| e.id == id).map(|e| {
            e.hours = hours;
            e.logged_at = logged_at;
            e.clone()
        }))
    }

    fn delete_entry(&self, id: &str) -> Result<bool, StoreError> {
        let mut t = self.lock()?;
        let before = t.entries.len();
        t.entries.retain(|e| e.id != id);
        Ok(t.entries.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(id: &str, wake: NaiveDate, hours: f64) -> SleepEntry {
        SleepEntry {
            id: id.into(),
            user_id: "u1".into(),
            week_id: "w1".into(),
            wake_date: wake,
            hours,
            logged_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_keeps_original_row() {
        let store = MemoryStore::new();
        let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        store.upsert_entry(&entry("a", d, 6.0)).unwrap();
        let stored = store.upsert_entry(&entry("b", d, 8.0)).unwrap().unwrap();
        assert_eq!(stored.id, "a");
        assert_eq!(stored.hours, 8.0);
        assert_eq!(store.entries(&EntryFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn upsert_leaves_other_weeks_row_alone() {
        let store = MemoryStore::new();
        let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        store.upsert_entry(&entry("a", d, 9.0)).unwrap();
        let later = SleepEntry {
            week_id: "w2".into(),
            ..entry("b", d, 1.0)
        };
        assert!(store.upsert_entry(&later).unwrap().is_none());
        assert_eq!(store.entry("a").unwrap().unwrap().hours, 9.0);
    }

    #[test]
    fn insert_entry_signals_conflict() {
        let store = MemoryStore::new();
        let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(
            store.insert_entry(&entry("a", d, 6.0)).unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_entry(&entry("b", d, 7.0)).unwrap(),
            InsertOutcome::Conflict
        );
    }

    #[test]
    fn roll_week_only_once() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let owner = User::new("u1", "", "Owner", None);
        store.upsert_user(&owner).unwrap();
        let group = Group {
            id: "g1".into(),
            name: "G".into(),
            owner_id: "u1".into(),
            code: "CODE".into(),
            created_at: now,
        };
        let first = Week::open("g1", 1, now);
        store.insert_group(&group, &first).unwrap();

        let second = Week::open("g1", 2, now);
        assert_eq!(
            store.roll_week(&first.id, Some("u1"), now, &second).unwrap(),
            RollOutcome::Rolled
        );
        let third = Week::open("g1", 3, now);
        assert_eq!(
            store.roll_week(&first.id, None, now, &third).unwrap(),
            RollOutcome::NotActive
        );
        assert_eq!(store.active_week("g1").unwrap().unwrap().id, second.id);
        assert_eq!(store.weeks("g1").unwrap().len(), 2);
    }
}
