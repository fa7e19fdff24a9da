//! Reference dataset for demos: four friends in week 12.
//!
//! `user-1` owns the group and has not pledged yet, so the first log
//! attempt demonstrates the pledge gate. Their five-night history spans
//! weeks 11 and 12.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::error::{CoreError, Result};
use crate::model::{Group, SleepEntry, User, Week, WeeklyPledge};
use crate::storage::{InsertOutcome, SleepStore};

pub const DEMO_GROUP_ID: &str = "group-1";
pub const DEMO_WEEK_ID: &str = "week-12";
pub const DEMO_OWNER_ID: &str = "user-1";

/// The demo's signed-in user.
pub fn demo_owner() -> User {
    User::new(
        DEMO_OWNER_ID,
        "demo@sleeptax.app",
        "Alex (You)",
        Some("https://picsum.photos/200".into()),
    )
}

fn demo_users() -> Vec<User> {
    vec![
        demo_owner(),
        User::new(
            "user-2",
            "sarah@sleeptax.app",
            "Sarah",
            Some("https://picsum.photos/201".into()),
        ),
        User::new(
            "user-3",
            "mike@sleeptax.app",
            "Mike",
            Some("https://picsum.photos/202".into()),
        ),
        User::new(
            "user-4",
            "jess@sleeptax.app",
            "Jess",
            Some("https://picsum.photos/203".into()),
        ),
    ]
}

/// Load the reference dataset into `store`, relative to `today`.
///
/// # Errors
/// Fails with [`CoreError::Conflict`] if the demo group exists,
/// [`CoreError::AlreadyPledged`] if a seeded pledge exists and
/// [`CoreError::DuplicateEntry`] if a seeded night exists. Store failures
/// propagate.
pub fn seed_demo(store: &dyn SleepStore, today: NaiveDate, now: DateTime<Utc>) -> Result<()> {
    let users = demo_users();
    for user in &users {
        store.upsert_user(user)?;
    }

    let created_at = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    let group = Group {
        id: DEMO_GROUP_ID.into(),
        name: "Sleepy Heads".into(),
        owner_id: DEMO_OWNER_ID.into(),
        code: "SLEEP-2024".into(),
        created_at,
    };
    let week = Week {
        id: DEMO_WEEK_ID.into(),
        group_id: DEMO_GROUP_ID.into(),
        week_number: 12,
        is_active: true,
        start_date: now - Duration::days(3),
        end_date: None,
        winner_id: None,
    };
    if store.insert_group(&group, &week)? == InsertOutcome::Conflict {
        return Err(CoreError::Conflict(format!("group {DEMO_GROUP_ID} already exists")));
    }
    for user in users.iter().skip(1) {
        store.add_member(DEMO_GROUP_ID, &user.id, created_at, u32::MAX)?;
    }

    let pledges = [("p2", "user-2", 10.0), ("p3", "user-3", 25.0), ("p4", "user-4", 0.0)];
    for (id, user_id, amount) in pledges {
        let pledge = WeeklyPledge {
            id: id.into(),
            week_id: DEMO_WEEK_ID.into(),
            user_id: user_id.into(),
            amount,
            created_at: now,
        };
        if store.insert_pledge(&pledge)? == InsertOutcome::Conflict {
            return Err(CoreError::AlreadyPledged);
        }
    }

    let mut nights = vec![
        ("e1", DEMO_OWNER_ID, DEMO_WEEK_ID, 2, 7.5),
        ("e2", DEMO_OWNER_ID, DEMO_WEEK_ID, 1, 8.0),
        ("e3", "user-2", DEMO_WEEK_ID, 2, 6.5),
        ("e4", "user-2", DEMO_WEEK_ID, 1, 9.0),
        ("e5", "user-3", DEMO_WEEK_ID, 1, 5.5),
    ];
    nights.extend([
        ("hist-3", DEMO_OWNER_ID, "week-11", 3, 8.0),
        ("hist-4", DEMO_OWNER_ID, "week-11", 4, 8.0),
        ("hist-5", DEMO_OWNER_ID, "week-11", 5, 8.0),
    ]);
    for (id, user_id, week_id, days_ago, hours) in nights {
        let wake_date = today - Duration::days(days_ago);
        let entry = SleepEntry {
            id: id.into(),
            user_id: user_id.into(),
            week_id: week_id.into(),
            wake_date,
            hours,
            logged_at: now,
        };
        if store.insert_entry(&entry)? == InsertOutcome::Conflict {
            return Err(CoreError::DuplicateEntry { wake_date });
        }
    }
    Ok(())
}
